// src/handlers/branches.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{PlatformAdmin, RequireRole},
    },
    models::{
        branch::{BranchCreated, LinkBranchPayload},
        clinic::Clinic,
    },
};

#[utoipa::path(
    post,
    path = "/api/sucursales/vincular",
    tag = "Branches",
    request_body = LinkBranchPayload,
    responses(
        (status = 201, body = BranchCreated),
        (status = 403, description = "El plan de la clínica principal no admite más sucursales")
    ),
    security(("api_jwt" = []))
)]
pub async fn link_branch(
    State(app_state): State<AppState>,
    _admin: RequireRole<PlatformAdmin>,
    Json(payload): Json<LinkBranchPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let created = app_state.branch_service.link(&payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/sucursales/{clinica_principal_id}",
    tag = "Branches",
    params(("clinica_principal_id" = Uuid, Path, description = "ID de la clínica principal")),
    responses((status = 200, body = [Clinic])),
    security(("api_jwt" = []))
)]
pub async fn list_branches(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(clinica_principal_id): Path<Uuid>,
) -> Result<Json<Vec<Clinic>>, ApiError> {
    Ok(Json(app_state.branch_service.list(&principal, clinica_principal_id).await?))
}
