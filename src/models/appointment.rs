// src/models/appointment.rs

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub const DEFAULT_APPOINTMENT_STATE: &str = "programada";

// Cita. Só as da clínica gravam `clinica_id`; as de doctor individual
// dependem do dono do paciente (join) para autorização.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Appointment {
    pub id: Uuid,
    pub paciente_id: Uuid,
    pub clinica_id: Option<Uuid>,
    pub fecha: NaiveDate,
    #[schema(value_type = String, example = "09:30:00")]
    pub hora: NaiveTime,
    pub motivo: Option<String>,
    pub estado: String,
    pub created_at: DateTime<Utc>,

    // Dados do paciente (join)
    pub nombres: String,
    pub apellidos: String,
    pub doctor_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AppointmentPayload {
    pub paciente_id: Uuid,
    pub fecha: NaiveDate,
    #[schema(value_type = String, example = "09:30:00")]
    pub hora: NaiveTime,
    pub motivo: Option<String>,
    #[validate(length(min = 1, message = "El estado no puede estar vacío"))]
    pub estado: Option<String>,
}

impl AppointmentPayload {
    pub fn estado_or_default(&self) -> &str {
        self.estado.as_deref().unwrap_or(DEFAULT_APPOINTMENT_STATE)
    }
}
