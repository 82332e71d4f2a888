// src/handlers/users.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{OwnerOrAdmin, RequireRole},
    },
    models::auth::{AccountSummary, CreateUserPayload, CreatedUser, PublicDoctor, UpdateUserPayload, User},
};

#[utoipa::path(
    get,
    path = "/api/usuarios/public",
    tag = "Users",
    responses((status = 200, body = [PublicDoctor]))
)]
pub async fn public_doctors(State(app_state): State<AppState>) -> Result<Json<Vec<PublicDoctor>>, ApiError> {
    Ok(Json(app_state.user_service.public_doctors().await?))
}

#[utoipa::path(
    get,
    path = "/api/usuarios",
    tag = "Users",
    responses((status = 200, description = "Usuarios de la clínica del usuario autenticado", body = [User])),
    security(("api_jwt" = []))
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(app_state.user_service.list(&principal).await?))
}

#[utoipa::path(
    get,
    path = "/api/usuarios/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "ID del usuario")),
    responses(
        (status = 200, body = User),
        (status = 404, description = "Usuario no encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_user(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(app_state.user_service.get(&principal, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/usuarios_admin",
    tag = "Users",
    request_body = CreateUserPayload,
    responses(
        (status = 201, description = "Usuario creado (con el plan vigente tras la admisión)", body = CreatedUser),
        (status = 403, description = "Límite de doctores alcanzado o sin permiso")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_user(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Json(payload): Json<CreateUserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let created = app_state.user_service.create(&principal, &payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put,
    path = "/api/usuarios/{id}",
    tag = "Users",
    request_body = UpdateUserPayload,
    params(("id" = Uuid, Path, description = "ID del usuario")),
    responses((status = 200, body = User)),
    security(("api_jwt" = []))
)]
pub async fn update_user(
    State(app_state): State<AppState>,
    RequireRole(principal, _): RequireRole<OwnerOrAdmin>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<Json<User>, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;
    Ok(Json(app_state.user_service.update(&principal, id, &payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/usuarios/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "ID del usuario")),
    responses(
        (status = 204, description = "Usuario eliminado"),
        (status = 404, description = "Usuario no encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_user(
    State(app_state): State<AppState>,
    RequireRole(principal, _): RequireRole<OwnerOrAdmin>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app_state.user_service.delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/usuarios/mis-datos",
    tag = "Users",
    responses((status = 200, body = AccountSummary)),
    security(("api_jwt" = []))
)]
pub async fn account_summary(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
) -> Result<Json<AccountSummary>, ApiError> {
    Ok(Json(app_state.user_service.account_summary(&principal).await?))
}
