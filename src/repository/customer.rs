//! Customer repository

use crate::domain::{CreateCustomerInput, Customer, UpdateCustomerInput};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn create(&self, input: &CreateCustomerInput) -> Result<Customer>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Customer>>;
    /// Empty keyword lists everything
    async fn list(&self, keyword: &str) -> Result<Vec<Customer>>;
    async fn update(&self, input: &UpdateCustomerInput) -> Result<Customer>;
    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct CustomerRepositoryImpl {
    pool: MySqlPool,
}

impl CustomerRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerRepository for CustomerRepositoryImpl {
    async fn create(&self, input: &CreateCustomerInput) -> Result<Customer> {
        let full_name = input.full_name.trim();
        let result = sqlx::query("INSERT INTO customers (full_name) VALUES (?)")
            .bind(full_name)
            .execute(&self.pool)
            .await?;

        Ok(Customer {
            id: result.last_insert_id() as i64,
            full_name: full_name.to_string(),
        })
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Customer>> {
        let customer =
            sqlx::query_as::<_, Customer>("SELECT id, full_name FROM customers WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(customer)
    }

    async fn list(&self, keyword: &str) -> Result<Vec<Customer>> {
        let pattern = format!("%{}%", keyword.trim());
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, full_name FROM customers
            WHERE full_name LIKE ?
            ORDER BY full_name, id
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    async fn update(&self, input: &UpdateCustomerInput) -> Result<Customer> {
        // MySQL reports zero affected rows for a no-op update, so check presence first
        if self.find_by_id(input.id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Customer {} not found",
                input.id
            )));
        }

        sqlx::query("UPDATE customers SET full_name = ? WHERE id = ?")
            .bind(input.full_name.trim())
            .bind(input.id)
            .execute(&self.pool)
            .await?;

        Ok(Customer {
            id: input.id,
            full_name: input.full_name.trim().to_string(),
        })
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM customers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
