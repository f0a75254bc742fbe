//! Employee domain models

use super::common::validate_not_blank;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Employee {
    pub id: i64,
    pub full_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateEmployeeInput {
    #[validate(length(min = 1, max = 255), custom(function = "validate_not_blank"))]
    pub full_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct UpdateEmployeeInput {
    #[validate(range(min = 1))]
    pub id: i64,
    #[validate(length(min = 1, max = 255), custom(function = "validate_not_blank"))]
    pub full_name: String,
}
