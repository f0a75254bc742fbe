//! Association graph: user↔customer links and the user→employee link

use crate::error::Result;
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssociationRepository: Send + Sync {
    // User <-> Customer
    /// Returns false if the pair already existed
    async fn link_customer(&self, subject: &str, customer_id: i64) -> Result<bool>;
    async fn unlink_customer(&self, subject: &str, customer_id: i64) -> Result<bool>;
    async fn customer_link_exists(&self, subject: &str, customer_id: i64) -> Result<bool>;
    async fn customers_for_subject(&self, subject: &str) -> Result<Vec<i64>>;
    async fn subjects_for_customer(&self, customer_id: i64) -> Result<Vec<String>>;
    async fn clear_customer(&self, customer_id: i64) -> Result<u64>;
    async fn clear_subject_customers(&self, subject: &str) -> Result<u64>;

    // User -> Employee
    async fn employee_for_subject(&self, subject: &str) -> Result<Option<i64>>;
    /// Returns false if the subject is missing or already linked to an employee
    async fn link_employee(&self, subject: &str, employee_id: i64) -> Result<bool>;
    async fn unlink_employee(&self, subject: &str) -> Result<bool>;
    async fn subjects_for_employee(&self, employee_id: i64) -> Result<Vec<String>>;
}

pub struct AssociationRepositoryImpl {
    pool: MySqlPool,
}

impl AssociationRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssociationRepository for AssociationRepositoryImpl {
    async fn link_customer(&self, subject: &str, customer_id: i64) -> Result<bool> {
        let result =
            sqlx::query("INSERT IGNORE INTO customer_user (user_id, customer_id) VALUES (?, ?)")
                .bind(subject)
                .bind(customer_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn unlink_customer(&self, subject: &str, customer_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM customer_user WHERE user_id = ? AND customer_id = ?")
            .bind(subject)
            .bind(customer_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn customer_link_exists(&self, subject: &str, customer_id: i64) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM customer_user WHERE user_id = ? AND customer_id = ?",
        )
        .bind(subject)
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn customers_for_subject(&self, subject: &str) -> Result<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT customer_id FROM customer_user WHERE user_id = ? ORDER BY customer_id",
        )
        .bind(subject)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn subjects_for_customer(&self, customer_id: i64) -> Result<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT user_id FROM customer_user WHERE customer_id = ? ORDER BY user_id",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn clear_customer(&self, customer_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM customer_user WHERE customer_id = ?")
            .bind(customer_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn clear_subject_customers(&self, subject: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM customer_user WHERE user_id = ?")
            .bind(subject)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn employee_for_subject(&self, subject: &str) -> Result<Option<i64>> {
        let employee_id: Option<Option<i64>> =
            sqlx::query_scalar("SELECT employee_id FROM users WHERE id = ?")
                .bind(subject)
                .fetch_optional(&self.pool)
                .await?;

        Ok(employee_id.flatten())
    }

    async fn link_employee(&self, subject: &str, employee_id: i64) -> Result<bool> {
        let result =
            sqlx::query("UPDATE users SET employee_id = ? WHERE id = ? AND employee_id IS NULL")
                .bind(employee_id)
                .bind(subject)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn unlink_employee(&self, subject: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET employee_id = NULL WHERE id = ? AND employee_id IS NOT NULL",
        )
        .bind(subject)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn subjects_for_employee(&self, employee_id: i64) -> Result<Vec<String>> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT id FROM users WHERE employee_id = ? ORDER BY id")
                .bind(employee_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(ids)
    }
}
