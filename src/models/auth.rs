// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    limits::IndividualLimitCheck,
    plan::{EffectivePlan, Plan},
};

// Mapeia o CREATE TYPE user_role do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Doctor,
}

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub usuario: String,
    pub email: Option<String>,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    #[schema(ignore)]
    pub password_hash: String,

    pub rol: Role,
    /// Nulo para doctor individual.
    pub clinica_id: Option<Uuid>,
    pub dueno: bool,
    pub created_at: DateTime<Utc>,
}

/// Quem está fazendo a requisição (o que o `auth_guard` coloca nas extensions).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Principal {
    pub id: Uuid,
    pub rol: Role,
    pub clinica_id: Option<Uuid>,
    pub dueno: bool,
}

impl Principal {
    /// Admin da plataforma: rol admin sem clínica. Admin com clínica fica preso a ela.
    pub fn is_platform_admin(&self) -> bool {
        self.rol == Role::Admin && self.clinica_id.is_none()
    }

    pub fn is_individual_doctor(&self) -> bool {
        self.rol == Role::Doctor && self.clinica_id.is_none()
    }

    /// Membro da clínica (qualquer rol) ou admin da plataforma.
    pub fn belongs_to_clinic(&self, clinica_id: Uuid) -> bool {
        self.is_platform_admin() || self.clinica_id == Some(clinica_id)
    }

    /// Dono ou admin daquela clínica, ou admin da plataforma.
    pub fn can_manage_clinic(&self, clinica_id: Uuid) -> bool {
        self.is_platform_admin()
            || (self.clinica_id == Some(clinica_id) && (self.dueno || self.rol == Role::Admin))
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            rol: user.rol,
            clinica_id: user.clinica_id,
            dueno: user.dueno,
        }
    }
}

// Dados para registro de um doctor individual (rota pública)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterDoctorPayload {
    #[validate(length(min = 3, message = "El usuario debe tener al menos 3 caracteres."))]
    pub usuario: String,
    #[validate(length(min = 6, message = "La clave debe tener al menos 6 caracteres."))]
    pub clave: String,
    #[validate(email(message = "El email no es válido."))]
    pub email: Option<String>,
}

// Criação de usuário dentro de uma clínica (doctor ou admin). Nunca cria dono.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserPayload {
    #[validate(length(min = 3, message = "El usuario debe tener al menos 3 caracteres."))]
    pub usuario: String,
    #[validate(length(min = 6, message = "La clave debe tener al menos 6 caracteres."))]
    pub clave: String,
    #[validate(email(message = "El email no es válido."))]
    pub email: Option<String>,
    pub rol: Role,
    /// Só é considerado para o admin da plataforma (sem clínica).
    pub clinica_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserPayload {
    #[validate(length(min = 3, message = "El usuario debe tener al menos 3 caracteres."))]
    pub usuario: Option<String>,
    #[validate(email(message = "El email no es válido."))]
    pub email: Option<String>,
    pub rol: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct UsernameQuery {
    pub usuario: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UsernameAvailability {
    pub disponible: bool,
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginPayload {
    #[validate(length(min = 1, message = "Usuario y clave requeridos"))]
    pub usuario: String,
    #[validate(length(min = 1, message = "Usuario y clave requeridos"))]
    pub clave: String,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub id: Uuid,
    pub usuario: String,
    pub rol: Role,
    #[serde(rename = "clinicaId")]
    pub clinica_id: Option<Uuid>,
    pub dueno: bool,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do usuário)
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PasswordResetRequestPayload {
    pub usuario: Option<String>,
    #[validate(email(message = "El email no es válido."))]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetPayload {
    #[validate(length(min = 1, message = "Faltan datos"))]
    pub token: String,
    pub uid: Uuid,
    #[validate(length(min = 6, message = "La clave debe tener al menos 6 caracteres."))]
    pub new_password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetIssued {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_url: Option<String>,
}

// ---
// "mis-datos": resumo da conta
// ---
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct ClinicDoctorSummary {
    pub id: Uuid,
    pub usuario: String,
    pub dueno: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: Uuid,
    pub usuario: String,
    pub rol: Role,
    pub clinica_id: Option<Uuid>,
    pub clinica: Option<String>,
    pub dueno: bool,
    pub is_app_admin: bool,
    pub total_pacientes: i64,
    pub limite: i64,
    pub extra: i64,
    pub plan: Option<Plan>,
    pub doctores: Vec<ClinicDoctorSummary>,
    /// O doctor chegou à clínica por uma compra de vinculação.
    pub es_vinculado: bool,
}

impl AccountSummary {
    pub fn individual(user: &User, check: &IndividualLimitCheck, es_vinculado: bool, is_app_admin: bool) -> Self {
        Self {
            id: user.id,
            usuario: user.usuario.clone(),
            rol: user.rol,
            clinica_id: None,
            clinica: None,
            dueno: user.dueno,
            is_app_admin,
            total_pacientes: check.count,
            limite: check.limit,
            extra: check.extras,
            plan: None,
            doctores: Vec::new(),
            es_vinculado,
        }
    }
}

/// Usuário criado + o plano que ficou ativo (muda quando houve upgrade para VIP).
#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedUser {
    #[serde(flatten)]
    pub user: User,
    pub plan: Option<EffectivePlan>,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct PublicDoctor {
    pub id: Uuid,
    pub usuario: String,
    pub rol: Role,
    pub clinica_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(rol: Role, clinica_id: Option<Uuid>, dueno: bool) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            rol,
            clinica_id,
            dueno,
        }
    }

    #[test]
    fn platform_admin_is_admin_without_clinic() {
        assert!(principal(Role::Admin, None, false).is_platform_admin());
        assert!(!principal(Role::Admin, Some(Uuid::new_v4()), false).is_platform_admin());
        assert!(!principal(Role::Admin, Some(Uuid::new_v4()), true).is_platform_admin());
        assert!(!principal(Role::Doctor, None, false).is_platform_admin());
    }

    #[test]
    fn clinic_admin_is_confined_to_its_clinic() {
        let own = Uuid::new_v4();
        let other = Uuid::new_v4();
        let admin = principal(Role::Admin, Some(own), false);

        assert!(admin.can_manage_clinic(own));
        assert!(admin.belongs_to_clinic(own));
        assert!(!admin.can_manage_clinic(other));
        assert!(!admin.belongs_to_clinic(other));
    }

    #[test]
    fn clinic_management_requires_owner_or_admin_of_that_clinic() {
        let clinic = Uuid::new_v4();
        assert!(principal(Role::Doctor, Some(clinic), true).can_manage_clinic(clinic));
        assert!(principal(Role::Admin, Some(clinic), false).can_manage_clinic(clinic));
        assert!(principal(Role::Admin, None, false).can_manage_clinic(clinic));
        assert!(!principal(Role::Doctor, Some(clinic), false).can_manage_clinic(clinic));
        assert!(!principal(Role::Doctor, Some(Uuid::new_v4()), true).can_manage_clinic(clinic));

        assert!(principal(Role::Doctor, Some(clinic), false).belongs_to_clinic(clinic));
        assert!(!principal(Role::Doctor, None, false).belongs_to_clinic(clinic));
    }

    #[test]
    fn individual_doctor_has_no_clinic() {
        assert!(principal(Role::Doctor, None, false).is_individual_doctor());
        assert!(!principal(Role::Doctor, Some(Uuid::new_v4()), false).is_individual_doctor());
    }
}
