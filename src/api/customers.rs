//! Customer handlers, including user↔customer associations

use crate::api::{KeywordQuery, SuccessResponse};
use crate::domain::{
    CreateCustomerInput, LinkCustomerUserInput, ToggleAccessInput, UnlinkCustomerUserInput,
    UpdateCustomerInput,
};
use crate::error::Result;
use crate::state::HasServices;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

pub async fn list<S: HasServices>(
    State(state): State<S>,
    Query(query): Query<KeywordQuery>,
) -> Result<impl IntoResponse> {
    let customers = state.customer_service().list(&query.keyword).await?;
    Ok(Json(SuccessResponse::new(customers)))
}

pub async fn create<S: HasServices>(
    State(state): State<S>,
    Json(input): Json<CreateCustomerInput>,
) -> Result<impl IntoResponse> {
    let customer = state.customer_service().create(input).await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(customer))))
}

pub async fn update<S: HasServices>(
    State(state): State<S>,
    Json(input): Json<UpdateCustomerInput>,
) -> Result<impl IntoResponse> {
    let customer = state.customer_service().update(input).await?;
    Ok(Json(SuccessResponse::new(customer)))
}

/// Cascades through every linked user before the row goes
pub async fn delete<S: HasServices>(
    State(state): State<S>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.association_service().delete_customer(id).await?;
    Ok(StatusCode::OK)
}

pub async fn list_users<S: HasServices>(
    State(state): State<S>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let users = state.customer_service().list_users(id).await?;
    Ok(Json(SuccessResponse::new(users)))
}

pub async fn link_user<S: HasServices>(
    State(state): State<S>,
    Json(input): Json<LinkCustomerUserInput>,
) -> Result<impl IntoResponse> {
    state.association_service().link_customer_user(input).await?;
    Ok(StatusCode::OK)
}

/// PUT toggles one attribute of the user's access to the customer
pub async fn toggle_access<S: HasServices>(
    State(state): State<S>,
    Json(input): Json<ToggleAccessInput>,
) -> Result<impl IntoResponse> {
    state
        .association_service()
        .toggle_customer_access(input)
        .await?;
    Ok(StatusCode::OK)
}

pub async fn unlink_user<S: HasServices>(
    State(state): State<S>,
    Json(input): Json<UnlinkCustomerUserInput>,
) -> Result<impl IntoResponse> {
    state.association_service().unlink_customer_user(input).await?;
    Ok(StatusCode::OK)
}
