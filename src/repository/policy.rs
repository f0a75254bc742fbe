//! Policy store: durable grants and role groupings in `policy_rules`

use crate::domain::{GroupingGrant, PolicyGrant, PolicyRule, PolicyRuleRow, PolicyType};
use crate::error::Result;
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PolicyRepository: Send + Sync {
    // Grants
    /// Returns false when the grant already existed
    async fn add_grant(&self, grant: &PolicyGrant) -> Result<bool>;
    /// Returns false when there was nothing to remove
    async fn remove_grant(&self, grant: &PolicyGrant) -> Result<bool>;
    async fn has_grant(&self, grant: &PolicyGrant) -> Result<bool>;
    async fn grants_for_subject(&self, subject: &str) -> Result<Vec<PolicyGrant>>;
    /// Removes every grant and grouping held by `subject`
    async fn remove_all_grants_for_subject(&self, subject: &str) -> Result<u64>;
    /// Removes the grants attached to a role (the role is the grant subject)
    async fn remove_role_grants(&self, role: &str) -> Result<u64>;

    // Groupings
    async fn roles_for_subject(&self, subject: &str) -> Result<Vec<String>>;
    async fn has_grouping(&self, grouping: &GroupingGrant) -> Result<bool>;
    async fn count_groupings_for_role(&self, role: &str) -> Result<i64>;
    async fn replace_grouping(
        &self,
        subject: &str,
        old_role: Option<String>,
        new_role: &str,
    ) -> Result<()>;
    async fn remove_groupings_for_subject(&self, subject: &str) -> Result<u64>;

    // Bulk
    async fn load_all(&self) -> Result<Vec<PolicyRule>>;
}

pub struct PolicyRepositoryImpl {
    pool: MySqlPool,
}

impl PolicyRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PolicyRepository for PolicyRepositoryImpl {
    async fn add_grant(&self, grant: &PolicyGrant) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT IGNORE INTO policy_rules (ptype, v0, v1, v2)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(PolicyType::Grant.as_str())
        .bind(&grant.subject)
        .bind(&grant.object)
        .bind(&grant.action)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_grant(&self, grant: &PolicyGrant) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM policy_rules WHERE ptype = ? AND v0 = ? AND v1 = ? AND v2 = ?",
        )
        .bind(PolicyType::Grant.as_str())
        .bind(&grant.subject)
        .bind(&grant.object)
        .bind(&grant.action)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn has_grant(&self, grant: &PolicyGrant) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM policy_rules WHERE ptype = ? AND v0 = ? AND v1 = ? AND v2 = ?",
        )
        .bind(PolicyType::Grant.as_str())
        .bind(&grant.subject)
        .bind(&grant.object)
        .bind(&grant.action)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn grants_for_subject(&self, subject: &str) -> Result<Vec<PolicyGrant>> {
        let rows = sqlx::query_as::<_, PolicyRuleRow>(
            r#"
            SELECT ptype, v0, v1, v2 FROM policy_rules
            WHERE ptype = ? AND v0 = ?
            ORDER BY id
            "#,
        )
        .bind(PolicyType::Grant.as_str())
        .bind(subject)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| PolicyGrant::new(row.v0, row.v1, row.v2))
            .collect())
    }

    async fn remove_all_grants_for_subject(&self, subject: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM policy_rules WHERE v0 = ? AND ptype IN (?, ?)")
            .bind(subject)
            .bind(PolicyType::Grant.as_str())
            .bind(PolicyType::Grouping.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn remove_role_grants(&self, role: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM policy_rules WHERE ptype = ? AND v0 = ?")
            .bind(PolicyType::Grant.as_str())
            .bind(role)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn roles_for_subject(&self, subject: &str) -> Result<Vec<String>> {
        let roles: Vec<String> = sqlx::query_scalar(
            "SELECT v1 FROM policy_rules WHERE ptype = ? AND v0 = ? ORDER BY id",
        )
        .bind(PolicyType::Grouping.as_str())
        .bind(subject)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }

    async fn has_grouping(&self, grouping: &GroupingGrant) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM policy_rules WHERE ptype = ? AND v0 = ? AND v1 = ?",
        )
        .bind(PolicyType::Grouping.as_str())
        .bind(&grouping.subject)
        .bind(&grouping.role)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn count_groupings_for_role(&self, role: &str) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM policy_rules WHERE ptype = ? AND v1 = ?")
                .bind(PolicyType::Grouping.as_str())
                .bind(role)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    async fn replace_grouping(
        &self,
        subject: &str,
        old_role: Option<String>,
        new_role: &str,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        if let Some(old_role) = old_role {
            sqlx::query("DELETE FROM policy_rules WHERE ptype = ? AND v0 = ? AND v1 = ?")
                .bind(PolicyType::Grouping.as_str())
                .bind(subject)
                .bind(&old_role)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            r#"
            INSERT IGNORE INTO policy_rules (ptype, v0, v1, v2)
            VALUES (?, ?, ?, '')
            "#,
        )
        .bind(PolicyType::Grouping.as_str())
        .bind(subject)
        .bind(new_role)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn remove_groupings_for_subject(&self, subject: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM policy_rules WHERE ptype = ? AND v0 = ?")
            .bind(PolicyType::Grouping.as_str())
            .bind(subject)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn load_all(&self) -> Result<Vec<PolicyRule>> {
        let rows = sqlx::query_as::<_, PolicyRuleRow>(
            "SELECT ptype, v0, v1, v2 FROM policy_rules ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PolicyRule::try_from).collect()
    }
}
