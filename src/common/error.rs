use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::models::limits::LimitRejection;

// Nosso tipo de erro, agora com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Requisição inválida: {0}")]
    BadRequest(String),

    #[error("Registro duplicado: {0}")]
    DuplicateEntity(String),

    #[error("Faltan credenciales")]
    Unauthenticated,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Acesso negado: {0}")]
    Forbidden(String),

    // Não encontrado e sem permissão são o mesmo resultado (sem vazar existência entre tenants)
    #[error("Não encontrado: {0}")]
    NotFound(String),

    #[error("Limite atingido: {}", .0.message())]
    LimitReached(LimitRejection),

    #[error("Muitas requisições")]
    RateLimited,

    // Variante para erros de banco de dados (exemplo com sqlx)
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    // `anyhow::Error` é ótimo para capturar o contexto do erro.
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// Converte o erro de domínio no formato de resposta da API.
    pub fn to_api_error(&self) -> ApiError {
        match self {
            // Retorna todos os detalhes da validação.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                ApiError {
                    status: StatusCode::BAD_REQUEST,
                    error: "Uno o más campos son inválidos.".into(),
                    details: Some(json!(details)),
                }
            }
            AppError::BadRequest(msg) => ApiError::new(StatusCode::BAD_REQUEST, msg.clone()),
            AppError::DuplicateEntity(msg) => ApiError::new(StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthenticated => {
                ApiError::new(StatusCode::UNAUTHORIZED, "Faltan credenciales")
            }
            AppError::InvalidCredentials => {
                ApiError::new(StatusCode::UNAUTHORIZED, "Usuario o clave incorrecta")
            }
            AppError::InvalidToken => ApiError::new(
                StatusCode::UNAUTHORIZED,
                "Token de autenticación inválido o ausente.",
            ),
            AppError::Forbidden(msg) => ApiError::new(StatusCode::FORBIDDEN, msg.clone()),
            AppError::NotFound(msg) => ApiError::new(StatusCode::NOT_FOUND, msg.clone()),
            AppError::LimitReached(rejection) => ApiError {
                status: StatusCode::FORBIDDEN,
                error: rejection.message(),
                details: Some(json!(rejection)),
            },
            AppError::RateLimited => ApiError::new(
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests, try again later",
            ),

            // Todos os outros erros (DatabaseError, InternalServerError...) viram 500.
            // O detalhe fica no log, nunca na resposta.
            e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocurrió un error inesperado.",
                )
            }
        }
    }

    /// Traduz violação de chave única em `DuplicateEntity`, o resto segue como erro de banco.
    pub fn from_unique_violation(e: sqlx::Error, message: &str) -> Self {
        if let Some(db_err) = e.as_database_error() {
            if db_err.is_unique_violation() {
                return AppError::DuplicateEntity(message.to_string());
            }
        }
        AppError::DatabaseError(e)
    }

    /// CHECK ou FK violados viram `BadRequest` com a mensagem dada.
    pub fn from_constraint_violation(e: sqlx::Error, message: &str) -> Self {
        if let Some(db_err) = e.as_database_error() {
            if db_err.is_check_violation() || db_err.is_foreign_key_violation() {
                return AppError::BadRequest(message.to_string());
            }
        }
        AppError::DatabaseError(e)
    }
}

// ---
// ApiError: o formato que o cliente recebe
// ---
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            details: None,
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        err.to_api_error()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::limits::{LimitRejection, LimitResource};

    #[test]
    fn limit_rejection_is_forbidden_not_server_error() {
        let err = AppError::LimitReached(LimitRejection::EvenOnVip {
            resource: LimitResource::Doctors,
            total: 50,
            limit: 50,
            plan: Some("Combo VIP".into()),
        });
        let api = err.to_api_error();
        assert_eq!(api.status, StatusCode::FORBIDDEN);
        assert!(api.error.contains("incluso en VIP"));
        assert!(api.details.is_some());
    }

    #[test]
    fn duplicate_entity_is_bad_request() {
        let api = AppError::DuplicateEntity("El usuario ya existe".into()).to_api_error();
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.error, "El usuario ya existe");
    }

    #[test]
    fn internal_errors_hide_details() {
        let api = AppError::InternalServerError(anyhow::anyhow!("conexão caiu em 10.0.0.3"))
            .to_api_error();
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.error.contains("10.0.0.3"));
    }

    #[test]
    fn not_found_and_forbidden_statuses() {
        assert_eq!(
            AppError::NotFound("Paciente no encontrado".into()).to_api_error().status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Forbidden("Acceso no permitido".into()).to_api_error().status,
            StatusCode::FORBIDDEN
        );
    }
}
