//! User listing and identity sync handlers

use crate::api::{KeywordQuery, SuccessResponse};
use crate::error::Result;
use crate::state::HasServices;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;

/// Employee-backed users with their role
pub async fn list<S: HasServices>(
    State(state): State<S>,
    Query(query): Query<KeywordQuery>,
) -> Result<impl IntoResponse> {
    let users = state.user_service().list_with_roles(&query.keyword).await?;
    Ok(Json(SuccessResponse::new(users)))
}

/// Emails of users linked to neither an employee nor a customer
pub async fn list_unassigned<S: HasServices>(State(state): State<S>) -> Result<impl IntoResponse> {
    let emails = state.user_service().list_unassigned_emails().await?;
    Ok(Json(SuccessResponse::new(emails)))
}

/// Emails that may be linked to a customer
pub async fn list_emails<S: HasServices>(State(state): State<S>) -> Result<impl IntoResponse> {
    let emails = state.user_service().list_customer_candidate_emails().await?;
    Ok(Json(SuccessResponse::new(emails)))
}

pub async fn list_all<S: HasServices>(State(state): State<S>) -> Result<impl IntoResponse> {
    let users = state.user_service().list_all().await?;
    Ok(Json(SuccessResponse::new(users)))
}

#[derive(Debug, Serialize)]
pub struct SyncResult {
    pub synced: u64,
}

/// Pull every identity-provider user into the local table
pub async fn sync<S: HasServices>(State(state): State<S>) -> Result<impl IntoResponse> {
    let synced = state.identity_sync_service().sync_users().await?;
    Ok(Json(SuccessResponse::new(SyncResult { synced })))
}
