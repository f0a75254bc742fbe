//! RBAC (Role-Based Access Control) domain models

use super::common::validate_not_blank;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Role entity. Roles are identified by name everywhere in the policy store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Role {
    #[sqlx(rename = "role")]
    #[serde(rename = "role")]
    pub name: String,
}

/// Globally defined capability in the permission catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PermissionCatalogEntry {
    pub id: i64,
    pub action: String,
    /// Resource template, e.g. "rbac::data" or "portal::data::customer"
    pub resource: String,
    pub description: String,
    pub category: String,
    pub category_no: i32,
}

/// Catalog entry annotated with whether a role holds it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPermissionView {
    pub id: i64,
    pub description: String,
    pub action: String,
    pub resource: String,
    pub has_permission: bool,
}

/// One category of the catalog, in catalog order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCategory {
    pub category: String,
    pub permissions: Vec<CatalogPermissionView>,
}

/// Input for creating a role
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateRoleInput {
    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub role: String,
}

/// Input for assigning a role to a user
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct AssignRoleInput {
    #[serde(rename = "id")]
    #[validate(custom(function = "validate_not_blank"))]
    pub user_id: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub role: String,
}

/// Grant or revoke a catalog permission on a role
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct RolePermissionInput {
    #[validate(custom(function = "validate_not_blank"))]
    pub role: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub object: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub action: String,
}
