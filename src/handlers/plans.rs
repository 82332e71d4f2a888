// src/handlers/plans.rs

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
        rbac::{OwnerOrAdmin, PlatformAdmin, RequireRole},
    },
    models::plan::{AssignPlanPayload, ChangePlanPayload, ClinicPlan, CreatePlanPayload, Plan},
};

#[utoipa::path(
    get,
    path = "/api/planes",
    tag = "Plans",
    responses((status = 200, body = [Plan]))
)]
pub async fn list_plans(State(app_state): State<AppState>) -> Result<Json<Vec<Plan>>, ApiError> {
    Ok(Json(app_state.plan_service.list_plans().await?))
}

#[utoipa::path(
    post,
    path = "/api/planes",
    tag = "Plans",
    request_body = CreatePlanPayload,
    responses((status = 201, body = Plan)),
    security(("api_jwt" = []))
)]
pub async fn create_plan(
    State(app_state): State<AppState>,
    _admin: RequireRole<PlatformAdmin>,
    Json(payload): Json<CreatePlanPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let plan = app_state.plan_service.create_plan(&payload).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

#[utoipa::path(
    post,
    path = "/api/clinica_planes/asignar",
    tag = "Plans",
    request_body = AssignPlanPayload,
    responses(
        (status = 201, body = ClinicPlan),
        (status = 400, description = "La clínica ya tiene un plan activo")
    ),
    security(("api_jwt" = []))
)]
pub async fn assign_plan(
    State(app_state): State<AppState>,
    _admin: RequireRole<PlatformAdmin>,
    Json(payload): Json<AssignPlanPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let assignment = app_state.plan_service.assign_plan(&payload).await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

#[utoipa::path(
    post,
    path = "/api/clinica_planes/{clinica_id}/cambiar",
    tag = "Plans",
    request_body = ChangePlanPayload,
    params(("clinica_id" = Uuid, Path, description = "ID de la clínica")),
    responses((status = 200, body = ClinicPlan)),
    security(("api_jwt" = []))
)]
pub async fn change_plan(
    State(app_state): State<AppState>,
    RequireRole(principal, _): RequireRole<OwnerOrAdmin>,
    Path(clinica_id): Path<Uuid>,
    Json(payload): Json<ChangePlanPayload>,
) -> Result<Json<ClinicPlan>, ApiError> {
    if !principal.can_manage_clinic(clinica_id) {
        return Err(AppError::Forbidden("Acceso no permitido".into()).into());
    }
    let assignment = app_state
        .plan_service
        .change_plan(clinica_id, payload.plan_id, payload.fecha_fin)
        .await?;
    Ok(Json(assignment))
}

#[utoipa::path(
    get,
    path = "/api/clinica_planes/{clinica_id}",
    tag = "Plans",
    params(("clinica_id" = Uuid, Path, description = "ID de la clínica")),
    responses(
        (status = 200, description = "Plan activo de la clínica", body = Plan),
        (status = 404, description = "La clínica no tiene plan activo")
    ),
    security(("api_jwt" = []))
)]
pub async fn active_plan(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(clinica_id): Path<Uuid>,
) -> Result<Json<Plan>, ApiError> {
    if !principal.belongs_to_clinic(clinica_id) {
        return Err(AppError::Forbidden("Acceso no permitido".into()).into());
    }
    let plan = app_state
        .plan_service
        .active_plan(clinica_id)
        .await?
        .ok_or_else(|| AppError::NotFound("La clínica no tiene plan activo".into()))?;
    Ok(Json(plan))
}

#[utoipa::path(
    get,
    path = "/api/clinica_planes/{clinica_id}/historial",
    tag = "Plans",
    params(("clinica_id" = Uuid, Path, description = "ID de la clínica")),
    responses((status = 200, body = [ClinicPlan])),
    security(("api_jwt" = []))
)]
pub async fn plan_history(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(clinica_id): Path<Uuid>,
) -> Result<Json<Vec<ClinicPlan>>, ApiError> {
    if !principal.belongs_to_clinic(clinica_id) {
        return Err(AppError::Forbidden("Acceso no permitido".into()).into());
    }
    Ok(Json(app_state.plan_service.assignments(clinica_id).await?))
}
