//! Mirror identity-provider users into the local `users` table

use crate::error::Result;
use crate::keycloak::IdentityProvider;
use crate::repository::UserRepository;
use crate::telemetry::metrics as portal_metrics;
use std::sync::Arc;
use tracing::info;

pub struct IdentitySyncService<U: UserRepository> {
    identity: Arc<dyn IdentityProvider>,
    users: Arc<U>,
    page_size: u32,
}

impl<U: UserRepository> IdentitySyncService<U> {
    pub fn new(identity: Arc<dyn IdentityProvider>, users: Arc<U>, page_size: u32) -> Self {
        Self {
            identity,
            users,
            page_size: page_size.max(1),
        }
    }

    /// Upsert every provider user; local rows are never deleted and keep
    /// their employee link. Returns the number of records written.
    pub async fn sync_users(&self) -> Result<u64> {
        let mut first = 0u32;
        let mut synced = 0u64;

        loop {
            let page = self.identity.list_users(first, self.page_size).await?;
            let fetched = page.len() as u32;

            for user in &page {
                self.users.upsert_from_provider(user).await?;
            }
            synced += u64::from(fetched);

            if fetched < self.page_size {
                break;
            }
            first += fetched;
        }

        portal_metrics::record_identity_sync(synced);
        info!(synced, "Identity users synchronized");
        Ok(synced)
    }
}
