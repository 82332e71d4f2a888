// src/handlers/patients.rs

use axum::{
    extract::{Path, Query, State},
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
    models::{
        patient::{Patient, PatientListQuery, PatientPayload, PublicPatient},
        tenancy::TenantContext,
    },
};

#[utoipa::path(
    get,
    path = "/api/pacientes/cedula/{cedula}",
    tag = "Patients",
    params(("cedula" = String, Path, description = "Cédula del paciente")),
    responses(
        (status = 200, body = PublicPatient),
        (status = 404, description = "Paciente no encontrado"),
        (status = 429, description = "Demasiadas consultas")
    )
)]
pub async fn lookup_by_cedula(
    State(app_state): State<AppState>,
    Path(cedula): Path<String>,
) -> Result<Json<PublicPatient>, ApiError> {
    Ok(Json(app_state.patient_service.lookup_by_cedula(&cedula).await?))
}

#[utoipa::path(
    get,
    path = "/api/pacientes",
    tag = "Patients",
    params(("view" = Option<String>, Query, description = "individual | clinica | both")),
    responses((status = 200, body = [Patient])),
    security(("api_jwt" = []))
)]
pub async fn list_patients(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<PatientListQuery>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    Ok(Json(app_state.patient_service.list(&tenant, query.view).await?))
}

#[utoipa::path(
    get,
    path = "/api/pacientes/{id}",
    tag = "Patients",
    params(("id" = Uuid, Path, description = "ID del paciente")),
    responses(
        (status = 200, body = Patient),
        (status = 404, description = "Paciente no encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_patient(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Patient>, ApiError> {
    Ok(Json(app_state.patient_service.get(&tenant, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/pacientes",
    tag = "Patients",
    request_body = PatientPayload,
    responses(
        (status = 201, body = Patient),
        (status = 403, description = "Límite de pacientes alcanzado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_patient(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Json(payload): Json<PatientPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let patient = app_state.patient_service.create(&principal, &payload).await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

#[utoipa::path(
    put,
    path = "/api/pacientes/{id}",
    tag = "Patients",
    request_body = PatientPayload,
    params(("id" = Uuid, Path, description = "ID del paciente")),
    responses((status = 200, body = Patient)),
    security(("api_jwt" = []))
)]
pub async fn update_patient(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<PatientPayload>,
) -> Result<Json<Patient>, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;
    Ok(Json(app_state.patient_service.update(&tenant, id, &payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/pacientes/{id}",
    tag = "Patients",
    params(("id" = Uuid, Path, description = "ID del paciente")),
    responses(
        (status = 204, description = "Paciente, historial y citas eliminados"),
        (status = 404, description = "Paciente no encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_patient(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app_state.patient_service.delete(&tenant, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
