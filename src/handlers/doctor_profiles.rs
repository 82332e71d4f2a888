// src/handlers/doctor_profiles.rs

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
    middleware::auth::AuthenticatedUser,
    models::doctor_profile::{
        DoctorDocument, DoctorProfile, DoctorProfilePayload, DoctorPublicCard, DocumentsPayload, DocumentsSaved,
    },
};

#[utoipa::path(
    get,
    path = "/api/doctor_profiles/{user_id}/public",
    tag = "Profiles",
    params(("user_id" = Uuid, Path, description = "ID del doctor")),
    responses(
        (status = 200, body = DoctorProfile),
        (status = 404, description = "Perfil no encontrado")
    )
)]
pub async fn public_profile(
    State(app_state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<DoctorProfile>, ApiError> {
    Ok(Json(app_state.doctor_profile_service.public_profile(user_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/usuarios/public/{id}",
    tag = "Profiles",
    params(("id" = Uuid, Path, description = "ID del doctor")),
    responses(
        (status = 200, body = DoctorPublicCard),
        (status = 404, description = "Doctor no encontrado")
    )
)]
pub async fn public_card(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DoctorPublicCard>, ApiError> {
    Ok(Json(app_state.doctor_profile_service.public_card(id).await?))
}

#[utoipa::path(
    get,
    path = "/api/doctor_profiles/{user_id}",
    tag = "Profiles",
    params(("user_id" = Uuid, Path, description = "ID del doctor")),
    responses((status = 200, body = DoctorProfile)),
    security(("api_jwt" = []))
)]
pub async fn get_profile(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<DoctorProfile>, ApiError> {
    Ok(Json(app_state.doctor_profile_service.get(&principal, user_id).await?))
}

#[utoipa::path(
    put,
    path = "/api/doctor_profiles/{user_id}",
    tag = "Profiles",
    request_body = DoctorProfilePayload,
    params(("user_id" = Uuid, Path, description = "ID del doctor")),
    responses(
        (status = 201, description = "Perfil creado", body = DoctorProfile),
        (status = 200, description = "Perfil actualizado", body = DoctorProfile)
    ),
    security(("api_jwt" = []))
)]
pub async fn upsert_profile(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<DoctorProfilePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let (profile, created) = app_state
        .doctor_profile_service
        .upsert(&principal, user_id, &payload)
        .await?;
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(profile)))
}

#[utoipa::path(
    post,
    path = "/api/doctor_profiles/{user_id}/documentos",
    tag = "Profiles",
    request_body = DocumentsPayload,
    params(("user_id" = Uuid, Path, description = "ID del doctor")),
    responses((status = 201, body = DocumentsSaved)),
    security(("api_jwt" = []))
)]
pub async fn add_documents(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<DocumentsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let saved = app_state
        .doctor_profile_service
        .add_documents(&principal, user_id, &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(DocumentsSaved { ok: true, saved })))
}

#[utoipa::path(
    get,
    path = "/api/doctor_profiles/{user_id}/documentos",
    tag = "Profiles",
    params(("user_id" = Uuid, Path, description = "ID del doctor")),
    responses((status = 200, body = [DoctorDocument])),
    security(("api_jwt" = []))
)]
pub async fn list_documents(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<DoctorDocument>>, ApiError> {
    Ok(Json(app_state.doctor_profile_service.documents(&principal, user_id).await?))
}
