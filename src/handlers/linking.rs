// src/handlers/linking.rs

use axum::{extract::State, Json};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::linking::{LinkDoctorPayload, LinkOutcome, LinkOwnerPayload},
};

#[utoipa::path(
    post,
    path = "/api/vinculacion_doctor/vincular-doctor",
    tag = "Linking",
    request_body = LinkDoctorPayload,
    responses(
        (status = 200, body = LinkOutcome),
        (status = 400, description = "El doctor no puede ser vinculado"),
        (status = 403, description = "Límite alcanzado o sin permiso")
    ),
    security(("api_jwt" = []))
)]
pub async fn link_doctor(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Json(payload): Json<LinkDoctorPayload>,
) -> Result<Json<LinkOutcome>, ApiError> {
    let outcome = app_state
        .linking_service
        .link_doctor(&principal, payload.doctor_id, payload.clinica_id)
        .await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    post,
    path = "/api/vinculacion_doctor/desvincular-doctor",
    tag = "Linking",
    responses(
        (status = 200, body = LinkOutcome),
        (status = 403, description = "Doctor creado por la clínica")
    ),
    security(("api_jwt" = []))
)]
pub async fn unlink_doctor(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
) -> Result<Json<LinkOutcome>, ApiError> {
    Ok(Json(app_state.linking_service.unlink_doctor(&principal).await?))
}

#[utoipa::path(
    post,
    path = "/api/usuarios/vincular-dueno",
    tag = "Linking",
    request_body = LinkOwnerPayload,
    responses((status = 200, body = LinkOutcome)),
    security(("api_jwt" = []))
)]
pub async fn link_owner(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Json(payload): Json<LinkOwnerPayload>,
) -> Result<Json<LinkOutcome>, ApiError> {
    let outcome = app_state
        .linking_service
        .link_owner(&principal, payload.doctor_id, payload.clinica_id)
        .await?;
    Ok(Json(outcome))
}
