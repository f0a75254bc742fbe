//! Employee repository

use crate::domain::{CreateEmployeeInput, Employee, UpdateEmployeeInput};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    async fn create(&self, input: &CreateEmployeeInput) -> Result<Employee>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Employee>>;
    async fn list(&self) -> Result<Vec<Employee>>;
    async fn update(&self, input: &UpdateEmployeeInput) -> Result<Employee>;
    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct EmployeeRepositoryImpl {
    pool: MySqlPool,
}

impl EmployeeRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmployeeRepository for EmployeeRepositoryImpl {
    async fn create(&self, input: &CreateEmployeeInput) -> Result<Employee> {
        let full_name = input.full_name.trim();
        let result = sqlx::query("INSERT INTO employees (full_name) VALUES (?)")
            .bind(full_name)
            .execute(&self.pool)
            .await?;

        Ok(Employee {
            id: result.last_insert_id() as i64,
            full_name: full_name.to_string(),
        })
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Employee>> {
        let employee =
            sqlx::query_as::<_, Employee>("SELECT id, full_name FROM employees WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(employee)
    }

    async fn list(&self) -> Result<Vec<Employee>> {
        let employees =
            sqlx::query_as::<_, Employee>("SELECT id, full_name FROM employees ORDER BY full_name, id")
                .fetch_all(&self.pool)
                .await?;

        Ok(employees)
    }

    async fn update(&self, input: &UpdateEmployeeInput) -> Result<Employee> {
        if self.find_by_id(input.id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Employee {} not found",
                input.id
            )));
        }

        sqlx::query("UPDATE employees SET full_name = ? WHERE id = ?")
            .bind(input.full_name.trim())
            .bind(input.id)
            .execute(&self.pool)
            .await?;

        Ok(Employee {
            id: input.id,
            full_name: input.full_name.trim().to_string(),
        })
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM employees WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
