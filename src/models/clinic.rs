// src/models/clinic.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// A clínica: o tenant que possui doctores e pacientes
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Clinic {
    pub id: Uuid,
    #[schema(example = "Clínica San Rafael")]
    pub nombre: String,
    pub direccion: String,
    pub telefono_contacto: Option<String>,
    /// URL relativa devolvida pelo armazenamento de arquivos.
    pub imagen_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateClinicPayload {
    #[validate(length(min = 1, message = "El nombre es obligatorio"))]
    pub nombre: String,
    pub direccion: Option<String>,
    pub telefono_contacto: Option<String>,
}

/// Perfil público. Campo ausente = não mexe; `imagen_url` vazio = remove a imagem.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateClinicProfilePayload {
    pub direccion: Option<String>,
    pub telefono_contacto: Option<String>,
    pub imagen_url: Option<String>,
}

impl UpdateClinicProfilePayload {
    pub fn is_empty(&self) -> bool {
        self.direccion.is_none() && self.telefono_contacto.is_none() && self.imagen_url.is_none()
    }
}
