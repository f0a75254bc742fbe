//! Account handlers: identity-provider registration plus local record

use crate::api::SuccessResponse;
use crate::domain::CreateAccountInput;
use crate::error::Result;
use crate::state::HasServices;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

pub async fn list<S: HasServices>(State(state): State<S>) -> Result<impl IntoResponse> {
    let users = state.user_service().list_all().await?;
    Ok(Json(SuccessResponse::new(users)))
}

pub async fn create<S: HasServices>(
    State(state): State<S>,
    Json(input): Json<CreateAccountInput>,
) -> Result<impl IntoResponse> {
    let user = state.association_service().create_account(input).await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(user))))
}

/// Full teardown of the subject, repeatable
pub async fn delete<S: HasServices>(
    State(state): State<S>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    state.association_service().delete_account(&id).await?;
    Ok(StatusCode::OK)
}
