//! User repository (local mirror of identity-provider users)

use crate::domain::{IdentityUser, User, UserWithRole};
use crate::error::Result;
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<()>;
    async fn find_by_id(&self, id: &str) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn list_all(&self) -> Result<Vec<User>>;
    async fn find_by_customer(&self, customer_id: i64) -> Result<Vec<User>>;
    async fn find_by_employee(&self, employee_id: i64) -> Result<Vec<User>>;
    /// Returns false when the row was already gone
    async fn delete(&self, id: &str) -> Result<bool>;
    /// Insert or refresh a provider record; never touches `employee_id`
    async fn upsert_from_provider(&self, user: &IdentityUser) -> Result<()>;

    /// Users with neither an employee nor a customer association
    async fn list_unassigned_emails(&self) -> Result<Vec<String>>;
    /// Users without an employee whose email is outside `excluded_domain`
    async fn list_customer_candidate_emails(
        &self,
        excluded_domain: Option<String>,
    ) -> Result<Vec<String>>;
    /// Employee-backed users joined with their role grouping
    async fn list_with_roles(&self, keyword: &str) -> Result<Vec<UserWithRole>>;
}

pub struct UserRepositoryImpl {
    pool: MySqlPool,
}

impl UserRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for UserRepositoryImpl {
    async fn create(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, creation_timestamp, last_login_timestamp, employee_id)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(user.creation_timestamp)
        .bind(user.last_login_timestamp)
        .bind(user.employee_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, creation_timestamp, last_login_timestamp, employee_id
            FROM users WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, creation_timestamp, last_login_timestamp, employee_id
            FROM users WHERE email = ?
            "#,
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn list_all(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, creation_timestamp, last_login_timestamp, employee_id
            FROM users ORDER BY email
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn find_by_customer(&self, customer_id: i64) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.email, u.creation_timestamp, u.last_login_timestamp, u.employee_id
            FROM users u
            INNER JOIN customer_user cu ON cu.user_id = u.id
            WHERE cu.customer_id = ?
            ORDER BY u.email
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn find_by_employee(&self, employee_id: i64) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, creation_timestamp, last_login_timestamp, employee_id
            FROM users WHERE employee_id = ?
            ORDER BY email
            "#,
        )
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn upsert_from_provider(&self, user: &IdentityUser) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, creation_timestamp, last_login_timestamp)
            VALUES (?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                email = VALUES(email),
                creation_timestamp = VALUES(creation_timestamp),
                last_login_timestamp = COALESCE(VALUES(last_login_timestamp), last_login_timestamp)
            "#,
        )
        .bind(&user.subject_id)
        .bind(&user.email)
        .bind(user.creation_timestamp)
        .bind(user.last_login_timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_unassigned_emails(&self) -> Result<Vec<String>> {
        let emails: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT email FROM users
            WHERE employee_id IS NULL
              AND id NOT IN (SELECT user_id FROM customer_user)
            ORDER BY email
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(emails)
    }

    async fn list_customer_candidate_emails(
        &self,
        excluded_domain: Option<String>,
    ) -> Result<Vec<String>> {
        let emails: Vec<String> = match excluded_domain {
            Some(domain) => {
                sqlx::query_scalar(
                    r#"
                    SELECT email FROM users
                    WHERE employee_id IS NULL AND email NOT LIKE ?
                    ORDER BY email
                    "#,
                )
                .bind(format!("%@{}", domain.trim_start_matches('@')))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar(
                    "SELECT email FROM users WHERE employee_id IS NULL ORDER BY email",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(emails)
    }

    async fn list_with_roles(&self, keyword: &str) -> Result<Vec<UserWithRole>> {
        let pattern = format!("%{}%", keyword.trim());
        let users = sqlx::query_as::<_, UserWithRole>(
            r#"
            SELECT u.id, e.full_name, u.email,
                   (SELECT pr.v1 FROM policy_rules pr
                    WHERE pr.ptype = 'g' AND pr.v0 = u.id
                    ORDER BY pr.id LIMIT 1) AS role
            FROM users u
            INNER JOIN employees e ON e.id = u.employee_id
            WHERE e.full_name LIKE ? OR u.email LIKE ?
            ORDER BY e.full_name, u.email
            "#,
        )
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}
