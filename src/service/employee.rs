//! Employee CRUD

use crate::domain::{CreateEmployeeInput, Employee, UpdateEmployeeInput};
use crate::error::{AppError, Result};
use crate::repository::{EmployeeRepository, UserRepository};
use std::sync::Arc;
use validator::Validate;

pub struct EmployeeService<E: EmployeeRepository, U: UserRepository> {
    repo: Arc<E>,
    users: Arc<U>,
}

impl<E: EmployeeRepository, U: UserRepository> EmployeeService<E, U> {
    pub fn new(repo: Arc<E>, users: Arc<U>) -> Self {
        Self { repo, users }
    }

    pub async fn list(&self) -> Result<Vec<Employee>> {
        self.repo.list().await
    }

    pub async fn get(&self, id: i64) -> Result<Employee> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", id)))
    }

    pub async fn create(&self, input: CreateEmployeeInput) -> Result<Employee> {
        input.validate()?;
        self.repo.create(&input).await
    }

    pub async fn update(&self, input: UpdateEmployeeInput) -> Result<Employee> {
        input.validate()?;
        self.repo.update(&input).await
    }

    /// Emails of the users linked to an employee
    pub async fn list_users(&self, employee_id: i64) -> Result<Vec<String>> {
        let employee = self.get(employee_id).await?;
        let users = self.users.find_by_employee(employee.id).await?;
        Ok(users.into_iter().map(|u| u.email).collect())
    }
}
