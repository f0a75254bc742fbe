//! Customer CRUD and the customer user listing

use crate::config::PolicyConfig;
use crate::domain::{
    CreateCustomerInput, Customer, CustomerUserView, ScopedObject, UpdateCustomerInput,
    ACTION_READ,
};
use crate::enforcer::Enforcer;
use crate::error::{AppError, Result};
use crate::repository::{CustomerRepository, PolicyRepository, UserRepository};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use validator::Validate;

pub struct CustomerService<C: CustomerRepository, U: UserRepository, P: PolicyRepository> {
    repo: Arc<C>,
    users: Arc<U>,
    enforcer: Arc<Enforcer<P>>,
    policy: PolicyConfig,
}

impl<C: CustomerRepository, U: UserRepository, P: PolicyRepository> CustomerService<C, U, P> {
    pub fn new(
        repo: Arc<C>,
        users: Arc<U>,
        enforcer: Arc<Enforcer<P>>,
        policy: PolicyConfig,
    ) -> Self {
        Self {
            repo,
            users,
            enforcer,
            policy,
        }
    }

    pub async fn list(&self, keyword: &str) -> Result<Vec<Customer>> {
        self.repo.list(keyword).await
    }

    pub async fn get(&self, id: i64) -> Result<Customer> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Customer {} not found", id)))
    }

    pub async fn create(&self, input: CreateCustomerInput) -> Result<Customer> {
        input.validate()?;
        self.repo.create(&input).await
    }

    pub async fn update(&self, input: UpdateCustomerInput) -> Result<Customer> {
        input.validate()?;
        self.repo.update(&input).await
    }

    /// Users of a customer with their per-customer data access, one entry per
    /// configured scoped attribute
    pub async fn list_users(&self, customer_id: i64) -> Result<Vec<CustomerUserView>> {
        let customer = self.get(customer_id).await?;
        let users = self.users.find_by_customer(customer.id).await?;

        let mut views = Vec::with_capacity(users.len());
        for user in users {
            let granted: HashSet<String> = self
                .enforcer
                .implicit_permissions(&user.id)
                .await
                .into_iter()
                .filter(|g| g.action == ACTION_READ)
                .filter_map(|g| g.object.parse::<ScopedObject>().ok())
                .filter(|object| object.customer_id() == Some(customer.id))
                .filter_map(|object| object.attribute().map(str::to_string))
                .collect();

            let access: BTreeMap<String, bool> = self
                .policy
                .scoped_attributes
                .iter()
                .map(|attribute| (attribute.clone(), granted.contains(attribute)))
                .collect();

            views.push(CustomerUserView::new(user.id, user.email, access));
        }
        Ok(views)
    }
}
