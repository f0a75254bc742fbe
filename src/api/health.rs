//! Liveness and readiness probes

use crate::state::HasServices;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Readiness report; `policy_grants` is the size of the published index
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub database: bool,
    pub policy_grants: usize,
}

pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// 503 until the backing stores answer
pub async fn ready<S: HasServices>(State(state): State<S>) -> impl IntoResponse {
    let database = state.check_ready().await;
    let policy_grants = state.enforcer().snapshot().await.grant_count();

    let (code, status) = if database {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };

    (
        code,
        Json(ReadinessResponse {
            status: status.to_string(),
            database,
            policy_grants,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readiness_response_fields() {
        let json = serde_json::to_value(ReadinessResponse {
            status: "not_ready".to_string(),
            database: false,
            policy_grants: 0,
        })
        .unwrap();
        assert_eq!(json["status"], "not_ready");
        assert_eq!(json["database"], false);
    }
}
