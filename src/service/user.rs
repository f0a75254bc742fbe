//! User listings for the admin screens

use crate::config::PolicyConfig;
use crate::domain::{User, UserWithRole};
use crate::error::Result;
use crate::repository::UserRepository;
use std::sync::Arc;

pub struct UserService<U: UserRepository> {
    repo: Arc<U>,
    policy: PolicyConfig,
}

impl<U: UserRepository> UserService<U> {
    pub fn new(repo: Arc<U>, policy: PolicyConfig) -> Self {
        Self { repo, policy }
    }

    /// Employee-backed users with their role, filtered by name or email
    pub async fn list_with_roles(&self, keyword: &str) -> Result<Vec<UserWithRole>> {
        self.repo.list_with_roles(keyword).await
    }

    /// Users linked to nothing yet
    pub async fn list_unassigned_emails(&self) -> Result<Vec<String>> {
        self.repo.list_unassigned_emails().await
    }

    /// Users that may be offered as customer-portal users
    pub async fn list_customer_candidate_emails(&self) -> Result<Vec<String>> {
        self.repo
            .list_customer_candidate_emails(self.policy.internal_email_domain.clone())
            .await
    }

    pub async fn list_all(&self) -> Result<Vec<User>> {
        self.repo.list_all().await
    }
}
