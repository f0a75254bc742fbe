//! User domain models

use super::common::validate_not_blank;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Local record of an identity-provider user.
///
/// `id` is the identity provider's user id and doubles as the policy subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    /// Milliseconds since epoch, as reported by the identity provider
    pub creation_timestamp: i64,
    pub last_login_timestamp: Option<i64>,
    pub employee_id: Option<i64>,
}

/// User record as listed by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityUser {
    pub subject_id: String,
    pub email: String,
    pub creation_timestamp: i64,
    pub last_login_timestamp: Option<i64>,
}

/// Employee-backed user with the role held in the policy store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserWithRole {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub role: Option<String>,
}

/// Input for registering a new account with the identity provider
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateAccountInput {
    #[validate(email, length(max = 255))]
    pub email: String,
    #[validate(length(min = 6, max = 128), custom(function = "validate_not_blank"))]
    pub password: String,
}
