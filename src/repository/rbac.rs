//! RBAC repository: assignable roles and the permission catalog

use crate::domain::{CreateRoleInput, PermissionCatalogEntry, Role};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RbacRepository: Send + Sync {
    // Roles
    async fn create_role(&self, input: &CreateRoleInput) -> Result<Role>;
    async fn find_role(&self, name: &str) -> Result<Option<Role>>;
    async fn list_roles(&self) -> Result<Vec<Role>>;
    async fn delete_role(&self, name: &str) -> Result<bool>;

    // Catalog
    /// Ordered by category, then insertion order
    async fn list_catalog(&self) -> Result<Vec<PermissionCatalogEntry>>;
    async fn catalog_contains(&self, resource: &str, action: &str) -> Result<bool>;
}

pub struct RbacRepositoryImpl {
    pool: MySqlPool,
}

impl RbacRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RbacRepository for RbacRepositoryImpl {
    async fn create_role(&self, input: &CreateRoleInput) -> Result<Role> {
        let name = input.role.trim();
        let result = sqlx::query("INSERT IGNORE INTO roles (role) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!("Role '{}' already exists", name)));
        }

        Ok(Role {
            name: name.to_string(),
        })
    }

    async fn find_role(&self, name: &str) -> Result<Option<Role>> {
        let role = sqlx::query_as::<_, Role>("SELECT role FROM roles WHERE role = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(role)
    }

    async fn list_roles(&self) -> Result<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>("SELECT role FROM roles ORDER BY role")
            .fetch_all(&self.pool)
            .await?;

        Ok(roles)
    }

    async fn delete_role(&self, name: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM roles WHERE role = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_catalog(&self) -> Result<Vec<PermissionCatalogEntry>> {
        let entries = sqlx::query_as::<_, PermissionCatalogEntry>(
            r#"
            SELECT id, action, resource, description, category, category_no
            FROM permissions
            ORDER BY category_no, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn catalog_contains(&self, resource: &str, action: &str) -> Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM permissions WHERE resource = ? AND action = ?")
                .bind(resource)
                .bind(action)
                .fetch_one(&self.pool)
                .await?;

        Ok(count > 0)
    }
}
