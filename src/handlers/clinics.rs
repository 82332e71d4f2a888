// src/handlers/clinics.rs

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
        rbac::{PlatformAdmin, RequireRole},
    },
    models::clinic::{Clinic, CreateClinicPayload, UpdateClinicProfilePayload},
};

#[utoipa::path(
    get,
    path = "/api/clinicas",
    tag = "Clinics",
    responses((status = 200, body = [Clinic]))
)]
pub async fn list_clinics(State(app_state): State<AppState>) -> Result<Json<Vec<Clinic>>, ApiError> {
    Ok(Json(app_state.clinic_service.list().await?))
}

#[utoipa::path(
    get,
    path = "/api/clinicas/{id}",
    tag = "Clinics",
    params(("id" = Uuid, Path, description = "ID de la clínica")),
    responses(
        (status = 200, body = Clinic),
        (status = 404, description = "Clínica no encontrada")
    )
)]
pub async fn get_clinic(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Clinic>, ApiError> {
    Ok(Json(app_state.clinic_service.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/clinicas",
    tag = "Clinics",
    request_body = CreateClinicPayload,
    responses((status = 201, body = Clinic)),
    security(("api_jwt" = []))
)]
pub async fn create_clinic(
    State(app_state): State<AppState>,
    _admin: RequireRole<PlatformAdmin>,
    Json(payload): Json<CreateClinicPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let clinic = app_state.clinic_service.create(&payload).await?;
    Ok((StatusCode::CREATED, Json(clinic)))
}

#[utoipa::path(
    delete,
    path = "/api/clinicas/{id}",
    tag = "Clinics",
    params(("id" = Uuid, Path, description = "ID de la clínica")),
    responses((status = 204, description = "Clínica eliminada")),
    security(("api_jwt" = []))
)]
pub async fn delete_clinic(
    State(app_state): State<AppState>,
    _admin: RequireRole<PlatformAdmin>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app_state.clinic_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/api/clinicas/{id}/perfil",
    tag = "Clinics",
    request_body = UpdateClinicProfilePayload,
    params(("id" = Uuid, Path, description = "ID de la clínica")),
    responses((status = 200, body = Clinic)),
    security(("api_jwt" = []))
)]
pub async fn update_clinic_profile(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateClinicProfilePayload>,
) -> Result<Json<Clinic>, ApiError> {
    Ok(Json(
        app_state
            .clinic_service
            .update_profile(&principal, id, &payload)
            .await?,
    ))
}
