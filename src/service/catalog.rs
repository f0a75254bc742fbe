//! Read-only permission catalog

use crate::domain::{CatalogCategory, CatalogPermissionView, PermissionCatalogEntry, PolicyGrant};
use crate::error::Result;
use crate::repository::RbacRepository;
use std::sync::Arc;

pub struct PermissionCatalog<R: RbacRepository> {
    repo: Arc<R>,
}

impl<R: RbacRepository> PermissionCatalog<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Every catalog entry, ordered by category then insertion
    pub async fn list_all(&self) -> Result<Vec<PermissionCatalogEntry>> {
        self.repo.list_catalog().await
    }

    pub async fn contains(&self, resource: &str, action: &str) -> Result<bool> {
        self.repo.catalog_contains(resource, action).await
    }

    /// Catalog grouped by category, each entry flagged when `granted` holds it
    pub async fn categorized_for(&self, granted: &[PolicyGrant]) -> Result<Vec<CatalogCategory>> {
        let entries = self.list_all().await?;
        Ok(categorize(entries, granted))
    }
}

fn categorize(entries: Vec<PermissionCatalogEntry>, granted: &[PolicyGrant]) -> Vec<CatalogCategory> {
    let mut categories: Vec<CatalogCategory> = Vec::new();

    for entry in entries {
        let has_permission = granted
            .iter()
            .any(|g| g.object == entry.resource && g.action == entry.action);
        let view = CatalogPermissionView {
            id: entry.id,
            description: entry.description,
            action: entry.action,
            resource: entry.resource,
            has_permission,
        };

        match categories.iter_mut().find(|c| c.category == entry.category) {
            Some(category) => category.permissions.push(view),
            None => categories.push(CatalogCategory {
                category: entry.category,
                permissions: vec![view],
            }),
        }
    }

    categories
}
