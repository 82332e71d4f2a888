// src/models/purchase.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::limits::{IndividualLimitCheck, LimitCheck};

/// Os três livros de compras (append-only). Cada linha = um slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtrasLedger {
    ClinicDoctors,
    ClinicPatients,
    IndividualPatients,
}

impl ExtrasLedger {
    pub fn table(self) -> &'static str {
        match self {
            ExtrasLedger::ClinicDoctors => "compras_doctores",
            ExtrasLedger::ClinicPatients => "compras_pacientes",
            ExtrasLedger::IndividualPatients => "compras_pacientes_individual",
        }
    }

    /// Coluna que identifica o escopo dono da compra.
    pub fn scope_column(self) -> &'static str {
        match self {
            ExtrasLedger::ClinicDoctors | ExtrasLedger::ClinicPatients => "clinica_id",
            ExtrasLedger::IndividualPatients => "doctor_id",
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PurchaseSlotPayload {
    /// Clínica alvo; padrão = clínica do usuário autenticado.
    pub clinica_id: Option<Uuid>,
    #[schema(value_type = Option<f64>)]
    pub monto: Option<Decimal>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PurchasePatientSlotPayload {
    pub clinica_id: Option<Uuid>,
    /// Compra para doctor individual; padrão = o próprio doctor individual autenticado.
    pub doctor_id: Option<Uuid>,
    #[schema(value_type = Option<f64>)]
    pub monto: Option<Decimal>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseCreated {
    pub id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseTotal {
    pub total: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClinicLimitValidation {
    #[serde(flatten)]
    pub check: LimitCheck,
    #[schema(value_type = f64)]
    pub precio_slot: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IndividualLimitValidation {
    #[serde(flatten)]
    pub check: IndividualLimitCheck,
    #[schema(value_type = f64)]
    pub precio_slot: Decimal,
}

/// Doctores que entraram na clínica via compra (taxa de vinculação).
#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaserList {
    pub usuarios: Vec<Uuid>,
}
