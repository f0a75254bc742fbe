//! Role-permission handlers and the caller's own permissions

use crate::api::SuccessResponse;
use crate::domain::RolePermissionInput;
use crate::error::Result;
use crate::middleware::auth::RequestContext;
use crate::state::HasServices;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RoleQuery {
    pub role: String,
}

/// Catalog grouped by category, flagged with what the role holds
pub async fn list_for_role<S: HasServices>(
    State(state): State<S>,
    Query(query): Query<RoleQuery>,
) -> Result<impl IntoResponse> {
    let categories = state
        .rbac_service()
        .permissions_for_role(&query.role)
        .await?;
    Ok(Json(SuccessResponse::new(categories)))
}

pub async fn add<S: HasServices>(
    State(state): State<S>,
    Json(input): Json<RolePermissionInput>,
) -> Result<impl IntoResponse> {
    state.rbac_service().add_role_permission(input).await?;
    Ok(StatusCode::OK)
}

pub async fn remove<S: HasServices>(
    State(state): State<S>,
    Json(input): Json<RolePermissionInput>,
) -> Result<impl IntoResponse> {
    state.rbac_service().remove_role_permission(input).await?;
    Ok(StatusCode::OK)
}

/// Every grant reachable by the caller, for frontend gating
pub async fn mine<S: HasServices>(
    State(state): State<S>,
    ctx: RequestContext,
) -> Result<impl IntoResponse> {
    state.enforcer().reload().await?;
    let grants = state
        .rbac_service()
        .implicit_permissions(&ctx.subject_id)
        .await;
    Ok(Json(SuccessResponse::new(grants)))
}
