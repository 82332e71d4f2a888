// src/models/patient.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// ---
// Patient
// ---
// Na criação, exatamente um entre `clinica_id` e `doctor_id` vem preenchido.
// Depois de uma vinculação os dois ficam preenchidos: a clínica passa a ser a
// dona e o `doctor_id` fica só como rastro de origem.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Patient {
    pub id: Uuid,
    #[schema(example = "María José")]
    pub nombres: String,
    #[schema(example = "Pérez Gómez")]
    pub apellidos: String,
    pub cedula: Option<String>,
    pub telefono: Option<String>,
    pub direccion: Option<String>,
    pub fecha_nacimiento: Option<NaiveDate>,
    pub clinica_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PatientPayload {
    #[validate(length(min = 1, message = "Los nombres son obligatorios"))]
    pub nombres: String,
    #[validate(length(min = 1, message = "Los apellidos son obligatorios"))]
    pub apellidos: String,
    pub cedula: Option<String>,
    pub telefono: Option<String>,
    pub direccion: Option<String>,
    pub fecha_nacimiento: Option<NaiveDate>,
    /// Doctor vinculado a uma clínica manda o próprio id para criar um paciente individual.
    pub doctor_id: Option<Uuid>,
}

/// O que a busca pública por cédula devolve: sem contato nem endereço.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicPatient {
    pub id: Uuid,
    pub nombres: String,
    pub apellidos: String,
    pub cedula: Option<String>,
    pub clinica_id: Option<Uuid>,
}

impl From<Patient> for PublicPatient {
    fn from(p: Patient) -> Self {
        Self {
            id: p.id,
            nombres: p.nombres,
            apellidos: p.apellidos,
            cedula: p.cedula,
            clinica_id: p.clinica_id,
        }
    }
}

/// Dono de um paciente novo: um, e só um.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatientOwner {
    Clinic(Uuid),
    Doctor(Uuid),
}

impl PatientOwner {
    pub fn columns(self) -> (Option<Uuid>, Option<Uuid>) {
        match self {
            PatientOwner::Clinic(id) => (Some(id), None),
            PatientOwner::Doctor(id) => (None, Some(id)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PatientView {
    /// Padrão: pacientes da clínica (ou do doctor, se individual).
    #[default]
    Default,
    Individual,
    Clinica,
    Both,
}

#[derive(Debug, Deserialize)]
pub struct PatientListQuery {
    #[serde(default)]
    pub view: PatientView,
}
