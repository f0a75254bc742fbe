//! Association inputs (user↔customer, user↔employee)

use super::common::validate_not_blank;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Enable or disable a user's access to one attribute of one customer
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ToggleAccessInput {
    #[validate(range(min = 1))]
    pub customer_id: i64,
    #[validate(custom(function = "validate_not_blank"))]
    pub user_id: String,
    /// Attribute name, e.g. "finance"
    #[serde(alias = "access_object")]
    #[validate(custom(function = "validate_not_blank"))]
    pub attribute: String,
    pub has_access: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct LinkCustomerUserInput {
    #[validate(range(min = 1))]
    pub customer_id: i64,
    #[validate(custom(function = "validate_not_blank"))]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct UnlinkCustomerUserInput {
    #[validate(custom(function = "validate_not_blank"))]
    pub user_id: String,
    #[validate(range(min = 1))]
    pub customer_id: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct LinkEmployeeUserInput {
    #[validate(range(min = 1))]
    pub employee_id: i64,
    #[validate(custom(function = "validate_not_blank"))]
    pub user_email: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct UnlinkEmployeeUserInput {
    #[validate(custom(function = "validate_not_blank"))]
    pub user_id: String,
    #[validate(range(min = 1))]
    pub employee_id: i64,
}
