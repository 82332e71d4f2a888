// src/models/doctor_profile.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidateEmail, ValidationError};

use crate::models::auth::Role;

// Perfil estendido de um doctor: um por usuário, criado no primeiro PUT
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct DoctorProfile {
    pub user_id: Uuid,
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    pub direccion: Option<String>,
    pub telefono: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    #[schema(example = "Pediatría")]
    pub especialidad: Option<String>,
    pub updated_at: DateTime<Utc>,
}

// Vazio apaga o campo, então só valida quando há texto
fn email_or_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() || value.validate_email() {
        Ok(())
    } else {
        Err(ValidationError::new("email").with_message("El email no es válido.".into()))
    }
}

/// Campo ausente = não mexe; string vazia = limpa o campo.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct DoctorProfilePayload {
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    pub direccion: Option<String>,
    pub telefono: Option<String>,
    #[validate(custom(function = "email_or_blank"))]
    pub email: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(alias = "specialty", alias = "profesion")]
    pub especialidad: Option<String>,
}

impl DoctorProfilePayload {
    pub fn is_empty(&self) -> bool {
        self.nombre.is_none()
            && self.apellido.is_none()
            && self.direccion.is_none()
            && self.telefono.is_none()
            && self.email.is_none()
            && self.bio.is_none()
            && self.avatar_url.is_none()
            && self.especialidad.is_none()
    }

    /// Apara espaços; o que sobra vazio vira `Some("")` e limpa a coluna.
    pub fn normalized(&self) -> Self {
        let trim = |v: &Option<String>| v.as_ref().map(|s| s.trim().to_string());
        Self {
            nombre: trim(&self.nombre),
            apellido: trim(&self.apellido),
            direccion: trim(&self.direccion),
            telefono: trim(&self.telefono),
            email: trim(&self.email),
            bio: trim(&self.bio),
            avatar_url: trim(&self.avatar_url),
            especialidad: trim(&self.especialidad),
        }
    }
}

/// Perfil gravado e se a linha acabou de nascer.
#[derive(Debug, FromRow)]
pub struct SavedProfile {
    #[sqlx(flatten)]
    pub profile: DoctorProfile,
    pub inserted: bool,
}

/// Cartão público: usuário, perfil, clínica e pacientes atendidos.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct DoctorPublicCard {
    pub id: Uuid,
    pub usuario: String,
    pub rol: Role,
    pub clinica_id: Option<Uuid>,
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    pub direccion: Option<String>,
    pub telefono: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub especialidad: Option<String>,
    pub clinica_nombre: Option<String>,
    /// Pacientes do doctor; sem nenhum, os da clínica dele.
    pub total_pacientes: Option<i64>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct DoctorDocument {
    pub id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "titulo.pdf")]
    pub filename: String,
    /// URL relativa devolvida pelo armazenamento de arquivos.
    pub url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct DocumentPayload {
    #[validate(length(min = 1, message = "El nombre del archivo es obligatorio"))]
    pub filename: String,
    #[validate(length(min = 1, message = "La URL es obligatoria"))]
    pub url: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DocumentsPayload {
    #[validate(
        length(min = 1, max = 20, message = "Envíe entre 1 y 20 documentos"),
        nested
    )]
    pub documentos: Vec<DocumentPayload>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentsSaved {
    pub ok: bool,
    pub saved: Vec<DoctorDocument>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specialty_aliases_land_in_especialidad() {
        for key in ["especialidad", "specialty", "profesion"] {
            let payload: DoctorProfilePayload =
                serde_json::from_str(&format!(r#"{{"{key}": "Cardiología"}}"#)).unwrap();
            assert_eq!(payload.especialidad.as_deref(), Some("Cardiología"), "{key}");
        }
    }

    #[test]
    fn blank_email_clears_but_bad_email_is_rejected() {
        let clear = DoctorProfilePayload {
            email: Some("  ".into()),
            ..Default::default()
        };
        assert!(clear.validate().is_ok());
        assert_eq!(clear.normalized().email.as_deref(), Some(""));

        let bad = DoctorProfilePayload {
            email: Some("no-es-email".into()),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn empty_payload_is_detected() {
        assert!(DoctorProfilePayload::default().is_empty());
        let bio_only = DoctorProfilePayload {
            bio: Some(String::new()),
            ..Default::default()
        };
        assert!(!bio_only.is_empty());
    }

    #[test]
    fn document_batch_must_have_between_one_and_twenty() {
        let none = DocumentsPayload { documentos: vec![] };
        assert!(none.validate().is_err());

        let too_many = DocumentsPayload {
            documentos: (0..21)
                .map(|i| DocumentPayload {
                    filename: format!("doc{i}.pdf"),
                    url: format!("/uploads/documents/doc{i}.pdf"),
                })
                .collect(),
        };
        assert!(too_many.validate().is_err());

        let one = DocumentsPayload {
            documentos: vec![DocumentPayload {
                filename: "titulo.pdf".into(),
                url: "/uploads/documents/titulo.pdf".into(),
            }],
        };
        assert!(one.validate().is_ok());
    }
}
