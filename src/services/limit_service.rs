// src/services/limit_service.rs
//
// Avaliador de limites: busca contagens/planos pelo `CapacityLedger` e decide
// com as funções puras de `models::limits`.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::PgPool;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{PatientRepository, PurchaseRepository, UserRepository},
    models::{
        limits::{AdmissionPolicy, AdmissionStep, IndividualLimitCheck, LimitCheck, LimitResource},
        plan::Plan,
        purchase::ExtrasLedger,
        tenancy::TenantScope,
    },
    services::plan_service::PlanService,
};

// ---
// CapacityLedger: de onde vêm os números
// ---
#[async_trait]
pub trait CapacityLedger: Send + Sync {
    async fn active_plan(&self, clinica_id: Uuid) -> Result<Option<Plan>, AppError>;
    async fn count_doctors(&self, clinica_id: Uuid) -> Result<i64, AppError>;
    async fn count_clinic_patients(&self, clinica_id: Uuid) -> Result<i64, AppError>;
    async fn count_individual_patients(&self, doctor_id: Uuid) -> Result<i64, AppError>;
    async fn count_extras(&self, ledger: ExtrasLedger, scope_id: Uuid) -> Result<i64, AppError>;
    /// Desativa o plano atual e ativa o VIP. Devolve o plano que ficou ativo.
    async fn switch_to_vip(&self, clinica_id: Uuid) -> Result<Plan, AppError>;
}

pub struct PgCapacityLedger {
    pool: PgPool,
    plan_service: PlanService,
    user_repo: UserRepository,
    patient_repo: PatientRepository,
    purchase_repo: PurchaseRepository,
}

impl PgCapacityLedger {
    pub fn new(
        pool: PgPool,
        plan_service: PlanService,
        user_repo: UserRepository,
        patient_repo: PatientRepository,
        purchase_repo: PurchaseRepository,
    ) -> Self {
        Self {
            pool,
            plan_service,
            user_repo,
            patient_repo,
            purchase_repo,
        }
    }
}

#[async_trait]
impl CapacityLedger for PgCapacityLedger {
    async fn active_plan(&self, clinica_id: Uuid) -> Result<Option<Plan>, AppError> {
        self.plan_service.active_plan(clinica_id).await
    }

    async fn count_doctors(&self, clinica_id: Uuid) -> Result<i64, AppError> {
        self.user_repo.count_doctors(&self.pool, clinica_id).await
    }

    async fn count_clinic_patients(&self, clinica_id: Uuid) -> Result<i64, AppError> {
        self.patient_repo.count_for_clinic(&self.pool, clinica_id).await
    }

    async fn count_individual_patients(&self, doctor_id: Uuid) -> Result<i64, AppError> {
        self.patient_repo.count_individual(&self.pool, doctor_id).await
    }

    async fn count_extras(&self, ledger: ExtrasLedger, scope_id: Uuid) -> Result<i64, AppError> {
        self.purchase_repo.count(&self.pool, ledger, scope_id).await
    }

    async fn switch_to_vip(&self, clinica_id: Uuid) -> Result<Plan, AppError> {
        self.plan_service.switch_to_vip(clinica_id).await
    }
}

// ---
// Locks por escopo (modo serializado)
// ---
// A entrada só sai do mapa quando ninguém mais segura ou espera o mutex,
// então dois chamadores do mesmo escopo sempre disputam o mesmo lock.
#[derive(Clone, Default)]
pub struct ScopeLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

/// Guarda do lock de um escopo; ao cair, libera o mutex e limpa a entrada ociosa.
pub struct ScopeGuard {
    guard: Option<OwnedMutexGuard<()>>,
    key: String,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        self.guard.take();
        // O clone em `acquire` acontece com o shard travado, então a contagem é confiável aqui
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl ScopeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, scope: &TenantScope) -> ScopeGuard {
        let key = scope.key();
        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        ScopeGuard {
            guard: Some(lock.lock_owned().await),
            key,
            locks: Arc::clone(&self.locks),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.len()
    }
}

// ---
// LimitService
// ---
#[derive(Clone)]
pub struct LimitService {
    ledger: Arc<dyn CapacityLedger>,
    locks: Option<ScopeLocks>,
}

impl LimitService {
    /// `serialized = true` liga o lock por escopo entre avaliar e inserir.
    pub fn new(ledger: Arc<dyn CapacityLedger>, serialized: bool) -> Self {
        Self {
            ledger,
            locks: serialized.then(ScopeLocks::new),
        }
    }

    /// Guarda que o chamador segura até terminar o INSERT. `None` fora do modo serializado.
    pub async fn serialize(&self, scope: &TenantScope) -> Option<ScopeGuard> {
        match &self.locks {
            Some(locks) => Some(locks.acquire(scope).await),
            None => None,
        }
    }

    pub async fn evaluate_doctors(&self, clinica_id: Uuid) -> Result<LimitCheck, AppError> {
        self.evaluate(LimitResource::Doctors, clinica_id).await
    }

    pub async fn evaluate_patients(&self, clinica_id: Uuid) -> Result<LimitCheck, AppError> {
        self.evaluate(LimitResource::Patients, clinica_id).await
    }

    async fn evaluate(&self, resource: LimitResource, clinica_id: Uuid) -> Result<LimitCheck, AppError> {
        let plan = self.ledger.active_plan(clinica_id).await?;
        let (total, extras) = match resource {
            LimitResource::Doctors => (
                self.ledger.count_doctors(clinica_id).await?,
                self.ledger.count_extras(ExtrasLedger::ClinicDoctors, clinica_id).await?,
            ),
            LimitResource::Patients => (
                self.ledger.count_clinic_patients(clinica_id).await?,
                self.ledger.count_extras(ExtrasLedger::ClinicPatients, clinica_id).await?,
            ),
        };

        Ok(LimitCheck::compute(
            resource,
            plan.as_ref().map(Plan::effective),
            total,
            extras,
        ))
    }

    pub async fn evaluate_individual(&self, doctor_id: Uuid) -> Result<IndividualLimitCheck, AppError> {
        let count = self.ledger.count_individual_patients(doctor_id).await?;
        let extras = self
            .ledger
            .count_extras(ExtrasLedger::IndividualPatients, doctor_id)
            .await?;
        Ok(IndividualLimitCheck::compute(count, extras))
    }

    /// Admissão de doctor/paciente de clínica, com upgrade automático para VIP.
    /// Devolve a avaliação final (com o plano VIP, se houve troca).
    pub async fn admit_clinic(&self, resource: LimitResource, clinica_id: Uuid) -> Result<LimitCheck, AppError> {
        let check = self.evaluate(resource, clinica_id).await?;

        match AdmissionPolicy::decide(&check) {
            AdmissionStep::Admit => Ok(check),
            AdmissionStep::Reject(rejection) => {
                tracing::info!(clinic_id = %clinica_id, total = check.total, limit = check.limit, "Limite atingido");
                Err(AppError::LimitReached(rejection))
            }
            AdmissionStep::UpgradeToVip => {
                tracing::info!(
                    clinic_id = %clinica_id,
                    total = check.total,
                    base_cap = check.base_cap,
                    "Sem vaga no plano atual, tentando upgrade para VIP"
                );
                self.ledger.switch_to_vip(clinica_id).await?;

                let retry = self.evaluate(resource, clinica_id).await?;
                AdmissionPolicy::after_upgrade(&retry).map_err(AppError::LimitReached)?;
                Ok(retry)
            }
        }
    }

    /// Pacientes de doctor individual: nunca há upgrade.
    pub async fn admit_individual(&self, doctor_id: Uuid) -> Result<IndividualLimitCheck, AppError> {
        let check = self.evaluate_individual(doctor_id).await?;
        check.ensure_allowed().map_err(|rejection| {
            tracing::info!(doctor_id = %doctor_id, count = check.count, limit = check.limit, "Limite individual atingido");
            AppError::LimitReached(rejection)
        })?;
        Ok(check)
    }

    /// Vinculação de doctor: aceita ou recusa, sem upgrade.
    pub async fn check_link(&self, clinica_id: Uuid) -> Result<LimitCheck, AppError> {
        let check = self.evaluate_doctors(clinica_id).await?;
        AdmissionPolicy::for_linking(&check).map_err(AppError::LimitReached)?;
        Ok(check)
    }
}
