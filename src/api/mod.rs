//! REST API handlers and shared response types

pub mod accounts;
pub mod customers;
pub mod employees;
pub mod health;
pub mod metrics;
pub mod permissions;
pub mod roles;
pub mod users;

use serde::{Deserialize, Serialize};

/// Success response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse<T> {
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// `?keyword=` filter shared by the list endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeywordQuery {
    #[serde(default)]
    pub keyword: String,
}
