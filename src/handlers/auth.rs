// src/handlers/auth.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    models::auth::{
        AuthResponse, LoginPayload, PasswordResetIssued, PasswordResetPayload,
        PasswordResetRequestPayload, RegisterDoctorPayload, UsernameAvailability, UsernameQuery,
    },
};

#[utoipa::path(
    post,
    path = "/api/usuarios",
    tag = "Auth",
    request_body = RegisterDoctorPayload,
    responses(
        (status = 201, description = "Doctor individual registrado", body = AuthResponse),
        (status = 400, description = "Usuario duplicado o datos inválidos")
    )
)]
pub async fn register(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterDoctorPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let response = app_state.auth_service.register_doctor(&payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/usuarios/check",
    tag = "Auth",
    params(("usuario" = String, Query, description = "Nombre de usuario")),
    responses((status = 200, body = UsernameAvailability))
)]
pub async fn check_username(
    State(app_state): State<AppState>,
    Query(query): Query<UsernameQuery>,
) -> Result<Json<UsernameAvailability>, ApiError> {
    Ok(Json(app_state.user_service.check_username(&query.usuario).await?))
}

#[utoipa::path(
    post,
    path = "/api/usuarios/login",
    tag = "Auth",
    request_body = LoginPayload,
    responses(
        (status = 200, body = AuthResponse),
        (status = 401, description = "Usuario o clave incorrecta")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let response = app_state
        .auth_service
        .login(&payload.usuario, &payload.clave)
        .await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/usuarios/reset-request",
    tag = "Auth",
    request_body = PasswordResetRequestPayload,
    responses((status = 200, description = "Siempre OK, exista o no el usuario", body = PasswordResetIssued))
)]
pub async fn request_password_reset(
    State(app_state): State<AppState>,
    Json(payload): Json<PasswordResetRequestPayload>,
) -> Result<Json<PasswordResetIssued>, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;
    Ok(Json(app_state.auth_service.request_password_reset(&payload).await?))
}

#[utoipa::path(
    post,
    path = "/api/usuarios/reset",
    tag = "Auth",
    request_body = PasswordResetPayload,
    responses(
        (status = 200, description = "Contraseña actualizada"),
        (status = 400, description = "Token inválido o expirado")
    )
)]
pub async fn reset_password(
    State(app_state): State<AppState>,
    Json(payload): Json<PasswordResetPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;
    app_state.auth_service.reset_password(&payload).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
