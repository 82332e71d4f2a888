// src/services/plan_service.rs

use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::PlanRepository,
    models::plan::{AssignPlanPayload, ClinicPlan, CreatePlanPayload, Plan, PlanTier},
};

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db_err| db_err.is_unique_violation())
        .unwrap_or(false)
}

#[derive(Clone)]
pub struct PlanService {
    plan_repo: PlanRepository,
    pool: PgPool,
}

impl PlanService {
    pub fn new(plan_repo: PlanRepository, pool: PgPool) -> Self {
        Self { plan_repo, pool }
    }

    pub async fn list_plans(&self) -> Result<Vec<Plan>, AppError> {
        self.plan_repo.list().await
    }

    /// Sem tier explícito, classifica pelo nome (regra legada).
    pub async fn create_plan(&self, payload: &CreatePlanPayload) -> Result<Plan, AppError> {
        let tier = payload
            .tier
            .unwrap_or_else(|| PlanTier::classify_name(&payload.nombre));

        self.plan_repo
            .create(
                &payload.nombre,
                tier,
                payload.precio,
                payload.pacientes_max,
                payload.doctores_max,
                payload.sucursales_incluidas,
                payload.descripcion.as_deref(),
            )
            .await
    }

    pub async fn active_plan(&self, clinica_id: Uuid) -> Result<Option<Plan>, AppError> {
        self.plan_repo.active_for_clinic(&self.pool, clinica_id).await
    }

    pub async fn assignments(&self, clinica_id: Uuid) -> Result<Vec<ClinicPlan>, AppError> {
        self.plan_repo.assignments_for_clinic(clinica_id).await
    }

    /// Atribuição simples. Não desativa o plano anterior: com um plano ativo, falha.
    pub async fn assign_plan(&self, payload: &AssignPlanPayload) -> Result<ClinicPlan, AppError> {
        self.plan_repo
            .find_by_id(&self.pool, payload.plan_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Plan no encontrado".into()))?;

        self.plan_repo
            .assign(
                &self.pool,
                payload.clinica_id,
                payload.plan_id,
                payload.fecha_inicio,
                payload.fecha_fin,
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::DuplicateEntity("La clínica ya tiene un plan activo".into())
                } else {
                    AppError::from_constraint_violation(e, "Clínica no encontrada")
                }
            })
    }

    /// Troca de plano: desativa o atual e atribui o novo na mesma transação.
    pub async fn change_plan(
        &self,
        clinica_id: Uuid,
        plan_id: Uuid,
        fecha_fin: Option<NaiveDate>,
    ) -> Result<ClinicPlan, AppError> {
        let mut tx = self.pool.begin().await?;

        self.plan_repo
            .find_by_id(&mut *tx, plan_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Plan no encontrado".into()))?;

        self.plan_repo.deactivate_active(&mut *tx, clinica_id).await?;
        let assignment = self
            .plan_repo
            .assign(&mut *tx, clinica_id, plan_id, None, fecha_fin)
            .await
            .map_err(|e| AppError::from_unique_violation(e, "La clínica ya tiene un plan activo"))?;

        tx.commit().await?;

        tracing::info!(clinic_id = %clinica_id, plan_id = %plan_id, "Plano da clínica alterado");
        Ok(assignment)
    }

    /// Migra a clínica para o plano VIP, atomicamente.
    ///
    /// Se outra requisição ganhou a corrida (índice de plano ativo único), devolve
    /// o plano que ficou ativo em vez de falhar.
    pub async fn switch_to_vip(&self, clinica_id: Uuid) -> Result<Plan, AppError> {
        let mut tx = self.pool.begin().await?;

        if let Some(current) = self.plan_repo.active_for_clinic(&mut *tx, clinica_id).await? {
            if current.tier == PlanTier::Vip {
                return Ok(current);
            }
        }

        let vip = self
            .plan_repo
            .find_vip(&mut *tx)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Plan VIP no configurado en el catálogo"))?;

        self.plan_repo.deactivate_active(&mut *tx, clinica_id).await?;

        match self.plan_repo.assign(&mut *tx, clinica_id, vip.id, None, None).await {
            Ok(_) => {
                tx.commit().await?;
                tracing::info!(clinic_id = %clinica_id, plan = %vip.nombre, "Clínica migrada para o plano VIP");
                Ok(vip)
            }
            Err(e) if is_unique_violation(&e) => {
                tx.rollback().await?;
                tracing::warn!(clinic_id = %clinica_id, "Upgrade VIP concorrente, usando o plano já ativo");
                self.plan_repo
                    .active_for_clinic(&self.pool, clinica_id)
                    .await?
                    .ok_or_else(|| AppError::InternalServerError(anyhow::anyhow!("Clínica sin plan activo tras upgrade")))
            }
            Err(e) => Err(e.into()),
        }
    }
}
