//! Role and role-permission administration

use crate::domain::{
    AssignRoleInput, CatalogCategory, CreateRoleInput, PolicyGrant, Role, RolePermissionInput,
};
use crate::enforcer::Enforcer;
use crate::error::{AppError, Result};
use crate::repository::{PolicyRepository, RbacRepository};
use crate::service::catalog::PermissionCatalog;
use crate::service::role::RoleManager;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

pub struct RbacService<P: PolicyRepository, R: RbacRepository> {
    repo: Arc<R>,
    enforcer: Arc<Enforcer<P>>,
    roles: RoleManager<P>,
    catalog: PermissionCatalog<R>,
}

impl<P: PolicyRepository, R: RbacRepository> RbacService<P, R> {
    pub fn new(repo: Arc<R>, enforcer: Arc<Enforcer<P>>) -> Self {
        Self {
            roles: RoleManager::new(enforcer.clone()),
            catalog: PermissionCatalog::new(repo.clone()),
            repo,
            enforcer,
        }
    }

    // ==================== Roles ====================

    pub async fn list_roles(&self) -> Result<Vec<Role>> {
        self.repo.list_roles().await
    }

    pub async fn create_role(&self, input: CreateRoleInput) -> Result<Role> {
        input.validate()?;
        let role = self.repo.create_role(&input).await?;
        info!(role = %role.name, "Role created");
        Ok(role)
    }

    pub async fn get_role(&self, name: &str) -> Result<Role> {
        self.repo
            .find_role(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Role '{}' not found", name)))
    }

    /// Give a user exactly one role, replacing any previous one
    pub async fn assign_role(&self, input: AssignRoleInput) -> Result<()> {
        input.validate()?;
        let role = self.get_role(&input.role).await?;
        self.roles.set_role(&input.user_id, &role.name).await
    }

    /// Delete a role nobody holds.
    ///
    /// Order:
    /// 1. Refuse while any grouping references the role
    /// 2. Strip the role's grants from the policy store
    /// 3. Delete the role row
    ///
    /// The row goes last so a failed call can be re-issued.
    pub async fn delete_role(&self, name: &str) -> Result<()> {
        let role = self.get_role(name).await?;

        let holders = self.enforcer.count_groupings_for_role(&role.name).await?;
        if holders > 0 {
            return Err(AppError::Conflict(format!(
                "Role '{}' is still assigned to {} user(s); remove it from them first",
                role.name, holders
            )));
        }

        let removed = self.enforcer.remove_role_grants(&role.name).await?;
        self.repo.delete_role(&role.name).await?;
        info!(role = %role.name, grants = removed, "Role deleted");
        Ok(())
    }

    // ==================== Role permissions ====================

    /// Catalog view annotated with the grants the role holds directly
    pub async fn permissions_for_role(&self, role: &str) -> Result<Vec<CatalogCategory>> {
        let role = self.get_role(role).await?;
        let granted = self.enforcer.grants_for_subject(&role.name).await?;
        self.catalog.categorized_for(&granted).await
    }

    pub async fn add_role_permission(&self, input: RolePermissionInput) -> Result<()> {
        let grant = self.catalog_grant(input).await?;
        self.enforcer.add_grant(&grant).await?;
        Ok(())
    }

    pub async fn remove_role_permission(&self, input: RolePermissionInput) -> Result<()> {
        let grant = self.catalog_grant(input).await?;
        self.enforcer.remove_grant(&grant).await?;
        Ok(())
    }

    async fn catalog_grant(&self, input: RolePermissionInput) -> Result<PolicyGrant> {
        input.validate()?;
        let role = self.get_role(&input.role).await?;

        if !self.catalog.contains(&input.object, &input.action).await? {
            return Err(AppError::Validation(format!(
                "'{} {}' is not a catalog permission",
                input.action, input.object
            )));
        }

        Ok(PolicyGrant::new(role.name, input.object, input.action))
    }

    // ==================== Current subject ====================

    /// Everything the subject may do, directly or through roles
    pub async fn implicit_permissions(&self, subject: &str) -> Vec<PolicyGrant> {
        self.enforcer.implicit_permissions(subject).await
    }
}
