//! Request authentication and route-level authorization
//!
//! `authenticate` resolves the bearer token through the identity provider and
//! attaches a [`RequestContext`]. `require_permission` then checks the
//! subject against the configured admin resource after reloading the policy.

use crate::error::AppError;
use crate::keycloak::IdentityProvider;
use crate::state::HasServices;
use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Authenticated caller, available to handlers as an extractor
#[derive(Clone)]
pub struct RequestContext {
    pub subject_id: String,
    pub identity: Arc<dyn IdentityProvider>,
    /// Set once a route-level permission check has passed
    pub authorization: Option<Authorization>,
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("subject_id", &self.subject_id)
            .field("authorization", &self.authorization)
            .finish()
    }
}

/// The `(object, action)` pair the request was authorized for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub object: String,
    pub action: String,
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))
    }
}

/// Bearer token from the Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Missing authorization token".to_string()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            AppError::Unauthorized("Authorization header must use Bearer scheme".to_string())
        })
}

pub async fn authenticate<S: HasServices>(
    State(state): State<S>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = match extract_bearer_token(request.headers()) {
        Ok(token) => token.to_string(),
        Err(e) => return e.into_response(),
    };

    let identity = state.identity().clone();
    let subject_id = match identity.verify_token(&token).await {
        Ok(subject_id) => subject_id,
        Err(e) => {
            debug!(error = %e, "Token rejected");
            return e.into_response();
        }
    };

    request.extensions_mut().insert(RequestContext {
        subject_id,
        identity,
        authorization: None,
    });
    next.run(request).await
}

/// State for [`require_permission`]: the app state plus the action a route needs
#[derive(Clone)]
pub struct PermissionGate<S> {
    state: S,
    action: &'static str,
}

impl<S: HasServices> PermissionGate<S> {
    pub fn new(state: S, action: &'static str) -> Self {
        Self { state, action }
    }
}

pub async fn require_permission<S: HasServices>(
    State(gate): State<PermissionGate<S>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(mut context) = request.extensions().get::<RequestContext>().cloned() else {
        return AppError::Unauthorized("Not authenticated".to_string()).into_response();
    };

    // another process may have changed the policy since the last request
    let enforcer = gate.state.enforcer();
    if let Err(e) = enforcer.reload().await {
        return e.into_response();
    }

    let object = gate.state.policy_config().admin_resource.clone();
    if !enforcer
        .enforce(&context.subject_id, &object, gate.action)
        .await
    {
        warn!(
            subject = %context.subject_id,
            object = %object,
            action = gate.action,
            "Request denied"
        );
        return AppError::Unauthorized("You are not authorized".to_string()).into_response();
    }

    context.authorization = Some(Authorization {
        object,
        action: gate.action.to_string(),
    });
    request.extensions_mut().insert(context);
    next.run(request).await
}
