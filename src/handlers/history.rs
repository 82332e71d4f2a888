// src/handlers/history.rs

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
    models::{
        history::{HistoryPayload, HistoryRecord},
        tenancy::TenantContext,
    },
};

#[utoipa::path(
    get,
    path = "/api/historial",
    tag = "History",
    responses((status = 200, body = [HistoryRecord])),
    security(("api_jwt" = []))
)]
pub async fn list_history(
    State(app_state): State<AppState>,
    tenant: TenantContext,
) -> Result<Json<Vec<HistoryRecord>>, ApiError> {
    Ok(Json(app_state.history_service.list(&tenant, None).await?))
}

#[utoipa::path(
    get,
    path = "/api/historial/paciente/{id}",
    tag = "History",
    params(("id" = Uuid, Path, description = "ID del paciente")),
    responses((status = 200, body = [HistoryRecord])),
    security(("api_jwt" = []))
)]
pub async fn list_history_by_patient(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(paciente_id): Path<Uuid>,
) -> Result<Json<Vec<HistoryRecord>>, ApiError> {
    Ok(Json(app_state.history_service.list(&tenant, Some(paciente_id)).await?))
}

#[utoipa::path(
    get,
    path = "/api/historial/{id}",
    tag = "History",
    params(("id" = Uuid, Path, description = "ID del registro")),
    responses(
        (status = 200, body = HistoryRecord),
        (status = 404, description = "Historial no encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_history(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<Json<HistoryRecord>, ApiError> {
    Ok(Json(app_state.history_service.get(&tenant, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/historial",
    tag = "History",
    request_body = HistoryPayload,
    responses((status = 201, body = HistoryRecord)),
    security(("api_jwt" = []))
)]
pub async fn create_history(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<HistoryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let record = app_state.history_service.create(&tenant, &payload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    put,
    path = "/api/historial/{id}",
    tag = "History",
    request_body = HistoryPayload,
    params(("id" = Uuid, Path, description = "ID del registro")),
    responses((status = 200, body = HistoryRecord)),
    security(("api_jwt" = []))
)]
pub async fn update_history(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<HistoryPayload>,
) -> Result<Json<HistoryRecord>, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;
    Ok(Json(app_state.history_service.update(&tenant, id, &payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/historial/{id}",
    tag = "History",
    params(("id" = Uuid, Path, description = "ID del registro")),
    responses((status = 204, description = "Registro eliminado")),
    security(("api_jwt" = []))
)]
pub async fn delete_history(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app_state.history_service.delete(&tenant, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
