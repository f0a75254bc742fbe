//! Policy enforcer
//!
//! Answers "may subject do action on object" from an in-memory [`PolicyIndex`]
//! loaded out of the policy store. The index is published as an
//! `Arc<PolicyIndex>` behind a `tokio::sync::RwLock`: `enforce` only clones the
//! `Arc` under the read lock, while `reload` builds a complete index before
//! taking the write lock to swap it in. Grant mutations write to the store first
//! and then patch the published index copy-on-write.

mod index;

pub use index::PolicyIndex;

use crate::domain::{GroupingGrant, PolicyGrant};
use crate::error::Result;
use crate::repository::PolicyRepository;
use crate::telemetry::metrics as portal_metrics;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info};

pub struct Enforcer<P: PolicyRepository> {
    store: Arc<P>,
    index: RwLock<Arc<PolicyIndex>>,
}

impl<P: PolicyRepository> Enforcer<P> {
    /// Create an enforcer with an empty index; call [`Enforcer::reload`] before use.
    pub fn new(store: Arc<P>) -> Self {
        Self {
            store,
            index: RwLock::new(Arc::new(PolicyIndex::default())),
        }
    }

    /// Create an enforcer and load the current policy
    pub async fn load(store: Arc<P>) -> Result<Self> {
        let enforcer = Self::new(store);
        enforcer.reload().await?;
        Ok(enforcer)
    }

    pub fn store(&self) -> &Arc<P> {
        &self.store
    }

    /// Re-read the full rule set and publish it atomically
    pub async fn reload(&self) -> Result<()> {
        let started = Instant::now();
        let rules = self.store.load_all().await?;
        let next = Arc::new(PolicyIndex::build(rules));
        let grants = next.grant_count();

        *self.index.write().await = next;

        portal_metrics::record_policy_reload(started.elapsed().as_secs_f64());
        debug!(grants, "Policy index reloaded");
        Ok(())
    }

    /// Current published index
    pub async fn snapshot(&self) -> Arc<PolicyIndex> {
        self.index.read().await.clone()
    }

    pub async fn enforce(&self, subject: &str, object: &str, action: &str) -> bool {
        let allowed = self.snapshot().await.enforce(subject, object, action);
        portal_metrics::record_authz_decision(allowed);
        allowed
    }

    pub async fn implicit_permissions(&self, subject: &str) -> Vec<PolicyGrant> {
        self.snapshot().await.implicit_permissions(subject)
    }

    async fn apply<F>(&self, change: F)
    where
        F: FnOnce(&mut PolicyIndex),
    {
        let mut guard = self.index.write().await;
        change(Arc::make_mut(&mut *guard));
    }

    // ==================== Grants ====================

    /// Idempotent; returns false when the grant already existed
    pub async fn add_grant(&self, grant: &PolicyGrant) -> Result<bool> {
        let added = self.store.add_grant(grant).await?;
        self.apply(|index| index.insert_grant(grant)).await;
        if added {
            info!(
                subject = %grant.subject,
                object = %grant.object,
                action = %grant.action,
                "Policy grant added"
            );
        }
        Ok(added)
    }

    /// Idempotent; returns false when there was nothing to remove
    pub async fn remove_grant(&self, grant: &PolicyGrant) -> Result<bool> {
        let removed = self.store.remove_grant(grant).await?;
        self.apply(|index| index.remove_grant(grant)).await;
        if removed {
            info!(
                subject = %grant.subject,
                object = %grant.object,
                action = %grant.action,
                "Policy grant removed"
            );
        }
        Ok(removed)
    }

    /// Direct grants of a subject, from the store
    pub async fn grants_for_subject(&self, subject: &str) -> Result<Vec<PolicyGrant>> {
        self.store.grants_for_subject(subject).await
    }

    /// Reads the store, not the index, so callers see their own writes
    pub async fn has_grant(&self, grant: &PolicyGrant) -> Result<bool> {
        self.store.has_grant(grant).await
    }

    /// Strip every grant and grouping a subject holds
    pub async fn delete_subject(&self, subject: &str) -> Result<u64> {
        let removed = self.store.remove_all_grants_for_subject(subject).await?;
        self.apply(|index| index.remove_subject(subject)).await;
        info!(subject = %subject, removed, "Subject policy stripped");
        Ok(removed)
    }

    /// Strip the grants attached to a role
    pub async fn remove_role_grants(&self, role: &str) -> Result<u64> {
        let removed = self.store.remove_role_grants(role).await?;
        self.apply(|index| index.remove_subject_grants(role)).await;
        Ok(removed)
    }

    // ==================== Groupings ====================

    pub async fn roles_for_subject(&self, subject: &str) -> Result<Vec<String>> {
        self.store.roles_for_subject(subject).await
    }

    pub async fn has_grouping(&self, subject: &str, role: &str) -> Result<bool> {
        self.store
            .has_grouping(&GroupingGrant::new(subject, role))
            .await
    }

    pub async fn count_groupings_for_role(&self, role: &str) -> Result<i64> {
        self.store.count_groupings_for_role(role).await
    }

    pub async fn replace_grouping(
        &self,
        subject: &str,
        old_role: Option<&str>,
        new_role: &str,
    ) -> Result<()> {
        self.store
            .replace_grouping(subject, old_role.map(str::to_string), new_role)
            .await?;
        self.apply(|index| {
            if let Some(old_role) = old_role {
                index.remove_grouping(&GroupingGrant::new(subject, old_role));
            }
            index.insert_grouping(&GroupingGrant::new(subject, new_role));
        })
        .await;
        info!(subject = %subject, old_role = ?old_role, new_role = %new_role, "Role grouping replaced");
        Ok(())
    }

    pub async fn remove_groupings(&self, subject: &str) -> Result<u64> {
        let removed = self.store.remove_groupings_for_subject(subject).await?;
        self.apply(|index| index.remove_groupings(subject)).await;
        Ok(removed)
    }
}
