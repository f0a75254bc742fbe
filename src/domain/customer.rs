//! Customer domain models

use super::common::validate_not_blank;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;
use validator::Validate;

/// Customer (tenant-side entity)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Customer {
    pub id: i64,
    pub full_name: String,
}

/// Input for creating a customer
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateCustomerInput {
    #[validate(length(min = 1, max = 255), custom(function = "validate_not_blank"))]
    pub full_name: String,
}

/// Input for renaming a customer
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct UpdateCustomerInput {
    #[validate(range(min = 1))]
    pub id: i64,
    #[validate(length(min = 1, max = 255), custom(function = "validate_not_blank"))]
    pub full_name: String,
}

/// A customer's user as shown in the customer detail screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerUserView {
    pub id: String,
    pub email: String,
    /// Every configured scoped attribute, true when the user holds its
    /// per-customer grant
    pub access: BTreeMap<String, bool>,
    /// `access["performance"]`, false when the attribute is not configured
    pub has_performance_access: bool,
    /// `access["finance"]`, false when the attribute is not configured
    pub has_financial_access: bool,
}

impl CustomerUserView {
    pub fn new(id: String, email: String, access: BTreeMap<String, bool>) -> Self {
        let holds = |attribute: &str| access.get(attribute).copied().unwrap_or(false);
        Self {
            has_performance_access: holds("performance"),
            has_financial_access: holds("finance"),
            id,
            email,
            access,
        }
    }
}
