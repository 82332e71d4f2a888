// src/handlers/appointments.rs

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
        appointment::{Appointment, AppointmentPayload},
        tenancy::TenantContext,
    },
};

#[utoipa::path(
    get,
    path = "/api/citas",
    tag = "Appointments",
    responses((status = 200, body = [Appointment])),
    security(("api_jwt" = []))
)]
pub async fn list_appointments(
    State(app_state): State<AppState>,
    tenant: TenantContext,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    Ok(Json(app_state.appointment_service.list(&tenant).await?))
}

#[utoipa::path(
    get,
    path = "/api/citas/{id}",
    tag = "Appointments",
    params(("id" = Uuid, Path, description = "ID de la cita")),
    responses(
        (status = 200, body = Appointment),
        (status = 404, description = "Cita no encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_appointment(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>, ApiError> {
    Ok(Json(app_state.appointment_service.get(&tenant, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/citas",
    tag = "Appointments",
    request_body = AppointmentPayload,
    responses(
        (status = 201, body = Appointment),
        (status = 404, description = "Paciente no encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_appointment(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<AppointmentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let cita = app_state.appointment_service.create(&tenant, &payload).await?;
    Ok((StatusCode::CREATED, Json(cita)))
}

#[utoipa::path(
    put,
    path = "/api/citas/{id}",
    tag = "Appointments",
    request_body = AppointmentPayload,
    params(("id" = Uuid, Path, description = "ID de la cita")),
    responses((status = 200, body = Appointment)),
    security(("api_jwt" = []))
)]
pub async fn update_appointment(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<AppointmentPayload>,
) -> Result<Json<Appointment>, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;
    Ok(Json(app_state.appointment_service.update(&tenant, id, &payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/citas/{id}",
    tag = "Appointments",
    params(("id" = Uuid, Path, description = "ID de la cita")),
    responses((status = 204, description = "Cita eliminada")),
    security(("api_jwt" = []))
)]
pub async fn delete_appointment(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app_state.appointment_service.delete(&tenant, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
