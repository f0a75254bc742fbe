//! Single-role-per-subject management on top of the enforcer's groupings

use crate::enforcer::Enforcer;
use crate::error::Result;
use crate::repository::PolicyRepository;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct RoleManager<P: PolicyRepository> {
    enforcer: Arc<Enforcer<P>>,
}

impl<P: PolicyRepository> RoleManager<P> {
    pub fn new(enforcer: Arc<Enforcer<P>>) -> Self {
        Self { enforcer }
    }

    /// Zero or one role in steady state
    pub async fn roles_of(&self, subject: &str) -> Result<Vec<String>> {
        self.enforcer.roles_for_subject(subject).await
    }

    /// Replace whatever role the subject holds with `new_role`
    pub async fn set_role(&self, subject: &str, new_role: &str) -> Result<()> {
        let current = self.roles_of(subject).await?;

        match current.as_slice() {
            [existing] if existing == new_role => {
                debug!(subject = %subject, role = %new_role, "Role unchanged");
                Ok(())
            }
            [] => self.enforcer.replace_grouping(subject, None, new_role).await,
            [existing] => {
                self.enforcer
                    .replace_grouping(subject, Some(existing.as_str()), new_role)
                    .await
            }
            _ => {
                warn!(subject = %subject, roles = ?current, "Subject held several roles, collapsing");
                self.enforcer.remove_groupings(subject).await?;
                self.enforcer.replace_grouping(subject, None, new_role).await
            }
        }
    }
}
