// src/services/clinic_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::ClinicRepository,
    models::{
        auth::Principal,
        clinic::{Clinic, CreateClinicPayload, UpdateClinicProfilePayload},
    },
};

#[derive(Clone)]
pub struct ClinicService {
    clinic_repo: ClinicRepository,
    pool: PgPool,
}

impl ClinicService {
    pub fn new(clinic_repo: ClinicRepository, pool: PgPool) -> Self {
        Self { clinic_repo, pool }
    }

    pub async fn list(&self) -> Result<Vec<Clinic>, AppError> {
        self.clinic_repo.list().await
    }

    pub async fn get(&self, id: Uuid) -> Result<Clinic, AppError> {
        self.clinic_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Clínica no encontrada".into()))
    }

    /// Só o admin da plataforma cria clínicas. O plano é atribuído depois.
    pub async fn create(&self, payload: &CreateClinicPayload) -> Result<Clinic, AppError> {
        let clinic = self
            .clinic_repo
            .create(
                &self.pool,
                payload.nombre.trim(),
                payload.direccion.as_deref(),
                payload.telefono_contacto.as_deref(),
            )
            .await?;

        tracing::info!(clinic_id = %clinic.id, "Clínica criada");
        Ok(clinic)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        if self.clinic_repo.delete(id).await? == 0 {
            return Err(AppError::NotFound("Clínica no encontrada".into()));
        }
        tracing::info!(clinic_id = %id, "Clínica removida");
        Ok(())
    }

    pub async fn update_profile(
        &self,
        principal: &Principal,
        id: Uuid,
        payload: &UpdateClinicProfilePayload,
    ) -> Result<Clinic, AppError> {
        if !principal.can_manage_clinic(id) {
            return Err(AppError::Forbidden("Acceso no permitido".into()));
        }
        if payload.is_empty() {
            return Err(AppError::BadRequest("No hay campos para actualizar".into()));
        }

        self.clinic_repo
            .update_profile(id, payload)
            .await?
            .ok_or_else(|| AppError::NotFound("Clínica no encontrada".into()))
    }
}
