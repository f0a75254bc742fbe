//! Employee handlers, including user↔employee associations

use crate::api::SuccessResponse;
use crate::domain::{
    CreateEmployeeInput, LinkEmployeeUserInput, UnlinkEmployeeUserInput, UpdateEmployeeInput,
};
use crate::error::Result;
use crate::state::HasServices;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

pub async fn list<S: HasServices>(State(state): State<S>) -> Result<impl IntoResponse> {
    let employees = state.employee_service().list().await?;
    Ok(Json(SuccessResponse::new(employees)))
}

pub async fn create<S: HasServices>(
    State(state): State<S>,
    Json(input): Json<CreateEmployeeInput>,
) -> Result<impl IntoResponse> {
    let employee = state.employee_service().create(input).await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(employee))))
}

pub async fn update<S: HasServices>(
    State(state): State<S>,
    Json(input): Json<UpdateEmployeeInput>,
) -> Result<impl IntoResponse> {
    let employee = state.employee_service().update(input).await?;
    Ok(Json(SuccessResponse::new(employee)))
}

pub async fn delete<S: HasServices>(
    State(state): State<S>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.association_service().delete_employee(id).await?;
    Ok(StatusCode::OK)
}

/// Emails of the users linked to the employee
pub async fn list_users<S: HasServices>(
    State(state): State<S>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let emails = state.employee_service().list_users(id).await?;
    Ok(Json(SuccessResponse::new(emails)))
}

pub async fn link_user<S: HasServices>(
    State(state): State<S>,
    Json(input): Json<LinkEmployeeUserInput>,
) -> Result<impl IntoResponse> {
    state.association_service().link_employee_user(input).await?;
    Ok(StatusCode::OK)
}

pub async fn unlink_user<S: HasServices>(
    State(state): State<S>,
    Json(input): Json<UnlinkEmployeeUserInput>,
) -> Result<impl IntoResponse> {
    state.association_service().unlink_employee_user(input).await?;
    Ok(StatusCode::OK)
}
