// src/handlers/purchases.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        auth::Principal,
        purchase::{
            ClinicLimitValidation, ExtrasLedger, IndividualLimitValidation, PurchaseCreated,
            PurchasePatientSlotPayload, PurchaseSlotPayload, PurchaseTotal, PurchaserList,
        },
    },
};

fn ensure_member(principal: &Principal, clinica_id: Uuid) -> Result<(), AppError> {
    if principal.belongs_to_clinic(clinica_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Acceso no permitido".into()))
    }
}

// ---
// Slots de doctor
// ---

#[utoipa::path(
    post,
    path = "/api/compras_doctores/comprar-slot",
    tag = "Purchases",
    request_body = PurchaseSlotPayload,
    responses(
        (status = 201, body = PurchaseCreated),
        (status = 400, description = "Falta clinica_id")
    ),
    security(("api_jwt" = []))
)]
pub async fn buy_doctor_slot(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Json(payload): Json<PurchaseSlotPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let created = app_state
        .purchase_service
        .buy_doctor_slot(&principal, &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/compras_doctores/validar/{clinica_id}",
    tag = "Purchases",
    params(("clinica_id" = Uuid, Path, description = "ID de la clínica")),
    responses((status = 200, body = ClinicLimitValidation)),
    security(("api_jwt" = []))
)]
pub async fn validate_doctor_limit(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(clinica_id): Path<Uuid>,
) -> Result<Json<ClinicLimitValidation>, ApiError> {
    Ok(Json(
        app_state
            .purchase_service
            .validate_doctors(&principal, clinica_id)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/compras_doctores/{clinica_id}",
    tag = "Purchases",
    params(("clinica_id" = Uuid, Path, description = "ID de la clínica")),
    responses((status = 200, body = PurchaseTotal)),
    security(("api_jwt" = []))
)]
pub async fn doctor_slot_total(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(clinica_id): Path<Uuid>,
) -> Result<Json<PurchaseTotal>, ApiError> {
    ensure_member(&principal, clinica_id)?;
    let total = app_state
        .purchase_service
        .total(ExtrasLedger::ClinicDoctors, clinica_id)
        .await?;
    Ok(Json(PurchaseTotal { total }))
}

#[utoipa::path(
    get,
    path = "/api/compras_doctores/usuarios/{clinica_id}",
    tag = "Purchases",
    params(("clinica_id" = Uuid, Path, description = "ID de la clínica")),
    responses((status = 200, body = PurchaserList)),
    security(("api_jwt" = []))
)]
pub async fn doctor_slot_purchasers(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(clinica_id): Path<Uuid>,
) -> Result<Json<PurchaserList>, ApiError> {
    ensure_member(&principal, clinica_id)?;
    let usuarios = app_state.purchase_service.purchasers(clinica_id).await?;
    Ok(Json(PurchaserList { usuarios }))
}

// ---
// Slots de paciente
// ---

#[utoipa::path(
    post,
    path = "/api/compras_pacientes/comprar",
    tag = "Purchases",
    request_body = PurchasePatientSlotPayload,
    responses((status = 201, body = PurchaseCreated)),
    security(("api_jwt" = []))
)]
pub async fn buy_patient_slot(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Json(payload): Json<PurchasePatientSlotPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let created = app_state
        .purchase_service
        .buy_patient_slot(&principal, &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/compras_pacientes/validar/{clinica_id}",
    tag = "Purchases",
    params(("clinica_id" = Uuid, Path, description = "ID de la clínica")),
    responses((status = 200, body = ClinicLimitValidation)),
    security(("api_jwt" = []))
)]
pub async fn validate_patient_limit(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(clinica_id): Path<Uuid>,
) -> Result<Json<ClinicLimitValidation>, ApiError> {
    Ok(Json(
        app_state
            .purchase_service
            .validate_patients(&principal, clinica_id)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/compras_pacientes/validar-individual",
    tag = "Purchases",
    responses(
        (status = 200, body = IndividualLimitValidation),
        (status = 403, description = "Solo doctores")
    ),
    security(("api_jwt" = []))
)]
pub async fn validate_individual_limit(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
) -> Result<Json<IndividualLimitValidation>, ApiError> {
    Ok(Json(app_state.purchase_service.validate_individual(&principal).await?))
}

#[utoipa::path(
    get,
    path = "/api/compras_pacientes/{clinica_id}",
    tag = "Purchases",
    params(("clinica_id" = Uuid, Path, description = "ID de la clínica")),
    responses((status = 200, body = PurchaseTotal)),
    security(("api_jwt" = []))
)]
pub async fn patient_slot_total(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(clinica_id): Path<Uuid>,
) -> Result<Json<PurchaseTotal>, ApiError> {
    ensure_member(&principal, clinica_id)?;
    let total = app_state
        .purchase_service
        .total(ExtrasLedger::ClinicPatients, clinica_id)
        .await?;
    Ok(Json(PurchaseTotal { total }))
}
