// src/services/purchase_service.rs
//
// Compras de slots (extras). Registrar uma compra nunca dispara upgrade de plano.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::PurchaseRepository,
    models::{
        auth::{Principal, Role},
        limits::{doctor_slot_price, patient_slot_price},
        purchase::{
            ClinicLimitValidation, ExtrasLedger, IndividualLimitValidation, PurchaseCreated,
            PurchasePatientSlotPayload, PurchaseSlotPayload,
        },
    },
    services::limit_service::LimitService,
};

fn amount_or(monto: Option<Decimal>, default: Decimal) -> Result<Decimal, AppError> {
    match monto {
        Some(m) if m.is_sign_negative() => Err(AppError::BadRequest("El monto no puede ser negativo".into())),
        Some(m) => Ok(m),
        None => Ok(default),
    }
}

#[derive(Clone)]
pub struct PurchaseService {
    purchase_repo: PurchaseRepository,
    limit_service: LimitService,
    pool: PgPool,
}

impl PurchaseService {
    pub fn new(purchase_repo: PurchaseRepository, limit_service: LimitService, pool: PgPool) -> Self {
        Self {
            purchase_repo,
            limit_service,
            pool,
        }
    }

    /// Slot de doctor para a clínica indicada (ou a do chamador).
    pub async fn buy_doctor_slot(&self, principal: &Principal, payload: &PurchaseSlotPayload) -> Result<PurchaseCreated, AppError> {
        let clinica_id = self.target_clinic(principal, payload.clinica_id)?;
        let monto = amount_or(payload.monto, doctor_slot_price())?;

        // Sem `usuario_id`: só a taxa de vinculação marca um doctor como comprado
        let id = self
            .purchase_repo
            .record_doctor_slot(&self.pool, clinica_id, None, monto)
            .await?;

        tracing::info!(clinic_id = %clinica_id, buyer = %principal.id, %monto, "Slot de doctor comprado");
        Ok(PurchaseCreated { id })
    }

    /// Slot de paciente. Com `doctor_id` (ou chamador individual) vai para o livro individual.
    pub async fn buy_patient_slot(
        &self,
        principal: &Principal,
        payload: &PurchasePatientSlotPayload,
    ) -> Result<PurchaseCreated, AppError> {
        let monto = amount_or(payload.monto, patient_slot_price())?;

        let doctor_id = payload
            .doctor_id
            .or_else(|| principal.is_individual_doctor().then_some(principal.id));

        if let Some(doctor_id) = doctor_id {
            if doctor_id != principal.id && !principal.is_platform_admin() {
                return Err(AppError::Forbidden("Acceso no permitido".into()));
            }
            let id = self
                .purchase_repo
                .record_individual_slot(&self.pool, doctor_id, monto)
                .await?;
            tracing::info!(doctor_id = %doctor_id, %monto, "Slot de paciente individual comprado");
            return Ok(PurchaseCreated { id });
        }

        let clinica_id = self.target_clinic(principal, payload.clinica_id)?;
        let id = self
            .purchase_repo
            .record_patient_slot(&self.pool, clinica_id, monto)
            .await?;

        tracing::info!(clinic_id = %clinica_id, buyer = %principal.id, %monto, "Slot de paciente comprado");
        Ok(PurchaseCreated { id })
    }

    pub async fn total(&self, ledger: ExtrasLedger, scope_id: Uuid) -> Result<i64, AppError> {
        self.purchase_repo.count(&self.pool, ledger, scope_id).await
    }

    /// Doctores que chegaram à clínica por compra (vinculação).
    pub async fn purchasers(&self, clinica_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        self.purchase_repo.purchaser_ids(clinica_id).await
    }

    pub async fn validate_doctors(&self, principal: &Principal, clinica_id: Uuid) -> Result<ClinicLimitValidation, AppError> {
        self.ensure_member(principal, clinica_id)?;
        let check = self.limit_service.evaluate_doctors(clinica_id).await?;
        Ok(ClinicLimitValidation {
            check,
            precio_slot: doctor_slot_price(),
        })
    }

    pub async fn validate_patients(&self, principal: &Principal, clinica_id: Uuid) -> Result<ClinicLimitValidation, AppError> {
        self.ensure_member(principal, clinica_id)?;
        let check = self.limit_service.evaluate_patients(clinica_id).await?;
        Ok(ClinicLimitValidation {
            check,
            precio_slot: patient_slot_price(),
        })
    }

    /// Limite individual do próprio chamador.
    pub async fn validate_individual(&self, principal: &Principal) -> Result<IndividualLimitValidation, AppError> {
        if principal.rol != Role::Doctor {
            return Err(AppError::Forbidden("Solo doctores tienen límite individual".into()));
        }
        let check = self.limit_service.evaluate_individual(principal.id).await?;
        Ok(IndividualLimitValidation {
            check,
            precio_slot: patient_slot_price(),
        })
    }

    fn target_clinic(&self, principal: &Principal, requested: Option<Uuid>) -> Result<Uuid, AppError> {
        let clinica_id = requested.or(principal.clinica_id).ok_or_else(|| {
            AppError::BadRequest(
                "Falta clinica_id en la solicitud y el usuario no está asociado a una clínica.".into(),
            )
        })?;
        self.ensure_member(principal, clinica_id)?;
        Ok(clinica_id)
    }

    fn ensure_member(&self, principal: &Principal, clinica_id: Uuid) -> Result<(), AppError> {
        if principal.belongs_to_clinic(clinica_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden("Acceso no permitido".into()))
        }
    }
}
