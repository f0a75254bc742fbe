//! Role handlers

use crate::api::SuccessResponse;
use crate::domain::{AssignRoleInput, CreateRoleInput};
use crate::error::Result;
use crate::state::HasServices;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

pub async fn list<S: HasServices>(State(state): State<S>) -> Result<impl IntoResponse> {
    let roles = state.rbac_service().list_roles().await?;
    Ok(Json(SuccessResponse::new(roles)))
}

pub async fn create<S: HasServices>(
    State(state): State<S>,
    Json(input): Json<CreateRoleInput>,
) -> Result<impl IntoResponse> {
    let role = state.rbac_service().create_role(input).await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(role))))
}

/// PUT /roles assigns a role to a user, replacing the current one
pub async fn assign<S: HasServices>(
    State(state): State<S>,
    Json(input): Json<AssignRoleInput>,
) -> Result<impl IntoResponse> {
    state.rbac_service().assign_role(input).await?;
    Ok(StatusCode::OK)
}

pub async fn delete<S: HasServices>(
    State(state): State<S>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse> {
    state.rbac_service().delete_role(&name).await?;
    Ok(StatusCode::OK)
}
