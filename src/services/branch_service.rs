// src/services/branch_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{BranchRepository, ClinicRepository, PlanRepository},
    models::{
        auth::Principal,
        branch::{ensure_branch_capacity, BranchCreated, LinkBranchPayload},
        clinic::Clinic,
    },
};

#[derive(Clone)]
pub struct BranchService {
    branch_repo: BranchRepository,
    clinic_repo: ClinicRepository,
    plan_repo: PlanRepository,
    pool: PgPool,
}

impl BranchService {
    pub fn new(
        branch_repo: BranchRepository,
        clinic_repo: ClinicRepository,
        plan_repo: PlanRepository,
        pool: PgPool,
    ) -> Self {
        Self {
            branch_repo,
            clinic_repo,
            plan_repo,
            pool,
        }
    }

    /// Vincula uma sucursal dentro da cota de `sucursales_incluidas` do plano ativo da principal.
    pub async fn link(&self, payload: &LinkBranchPayload) -> Result<BranchCreated, AppError> {
        if payload.clinica_principal_id == payload.clinica_vinculada_id {
            return Err(AppError::BadRequest(
                "Una clínica no puede ser sucursal de sí misma".into(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        // A linha da principal serializa vinculações concorrentes contra a mesma cota
        if !self.clinic_repo.lock_for_update(&mut *tx, payload.clinica_principal_id).await? {
            return Err(AppError::NotFound("Clínica no encontrada".into()));
        }
        if !self.clinic_repo.exists(&mut *tx, payload.clinica_vinculada_id).await? {
            return Err(AppError::NotFound("Clínica no encontrada".into()));
        }

        let plan = self
            .plan_repo
            .active_for_clinic(&mut *tx, payload.clinica_principal_id)
            .await?;
        let total = self
            .branch_repo
            .count_for_principal(&mut *tx, payload.clinica_principal_id)
            .await?;
        ensure_branch_capacity(plan.as_ref(), total).map_err(AppError::LimitReached)?;

        let branch = self
            .branch_repo
            .create(&mut *tx, payload.clinica_principal_id, payload.clinica_vinculada_id)
            .await?;
        tx.commit().await?;

        tracing::info!(
            principal = %branch.clinica_principal_id,
            sucursal = %branch.clinica_vinculada_id,
            "Sucursal vinculada"
        );
        Ok(BranchCreated { id: branch.id })
    }

    pub async fn list(&self, principal: &Principal, clinica_principal_id: Uuid) -> Result<Vec<Clinic>, AppError> {
        if !principal.belongs_to_clinic(clinica_principal_id) {
            return Err(AppError::Forbidden("Acceso no permitido".into()));
        }
        self.branch_repo.list_branches(clinica_principal_id).await
    }
}
