//! Cross-store consistency orchestration.
//!
//! Every operation here touches up to three stores: the policy store (through
//! the [`Enforcer`]), the relational association graph, and the identity
//! provider. There is no distributed transaction. Operations are ordered so
//! that a failure part-way through leaves, at worst, an identity-provider user
//! with no local access, and every step is idempotent so re-running the same
//! request finishes the job:
//!
//! 1. policy grants are revoked before association rows are deleted;
//! 2. association and user rows are deleted before the identity-provider user.

use crate::config::PolicyConfig;
use crate::domain::{
    validate_attribute, CreateAccountInput, Customer, Employee, LinkCustomerUserInput,
    LinkEmployeeUserInput, PolicyGrant, ScopedObject, ToggleAccessInput, UnlinkCustomerUserInput,
    UnlinkEmployeeUserInput, User,
};
use crate::enforcer::Enforcer;
use crate::error::{AppError, Result};
use crate::keycloak::IdentityProvider;
use crate::repository::{
    AssociationRepository, CustomerRepository, EmployeeRepository, PolicyRepository,
    UserRepository,
};
use crate::telemetry::metrics as portal_metrics;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

pub struct AssociationService<P, A, U, C, E>
where
    P: PolicyRepository,
    A: AssociationRepository,
    U: UserRepository,
    C: CustomerRepository,
    E: EmployeeRepository,
{
    enforcer: Arc<Enforcer<P>>,
    associations: Arc<A>,
    users: Arc<U>,
    customers: Arc<C>,
    employees: Arc<E>,
    identity: Arc<dyn IdentityProvider>,
    policy: PolicyConfig,
}

impl<P, A, U, C, E> AssociationService<P, A, U, C, E>
where
    P: PolicyRepository,
    A: AssociationRepository,
    U: UserRepository,
    C: CustomerRepository,
    E: EmployeeRepository,
{
    pub fn new(
        enforcer: Arc<Enforcer<P>>,
        associations: Arc<A>,
        users: Arc<U>,
        customers: Arc<C>,
        employees: Arc<E>,
        identity: Arc<dyn IdentityProvider>,
        policy: PolicyConfig,
    ) -> Self {
        Self {
            enforcer,
            associations,
            users,
            customers,
            employees,
            identity,
            policy,
        }
    }

    async fn require_user(&self, subject: &str) -> Result<User> {
        self.users
            .find_by_id(subject)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", subject)))
    }

    async fn require_user_by_email(&self, email: &str) -> Result<User> {
        let email = email.trim();
        self.users
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No user with email '{}'", email)))
    }

    async fn require_customer(&self, customer_id: i64) -> Result<Customer> {
        self.customers
            .find_by_id(customer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Customer {} not found", customer_id)))
    }

    async fn require_employee(&self, employee_id: i64) -> Result<Employee> {
        self.employees
            .find_by_id(employee_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", employee_id)))
    }

    // ==================== Customer associations ====================

    /// Grant or revoke one attribute of one customer for an associated user
    pub async fn toggle_customer_access(&self, input: ToggleAccessInput) -> Result<()> {
        input.validate()?;
        let attribute = input.attribute.trim();
        validate_attribute(attribute)?;
        if !self.policy.is_scoped_attribute(attribute) {
            return Err(AppError::Validation(format!(
                "'{}' is not a customer-scoped attribute",
                attribute
            )));
        }

        let user = self.require_user(&input.user_id).await?;
        if !self
            .associations
            .customer_link_exists(&user.id, input.customer_id)
            .await?
        {
            return Err(AppError::NotFound(format!(
                "User {} is not associated with customer {}",
                user.id, input.customer_id
            )));
        }

        let specific = PolicyGrant::scoped_read(
            &user.id,
            &ScopedObject::specific(input.customer_id, attribute),
        );

        if input.has_access {
            self.enforcer.add_grant(&specific).await?;
            self.enforcer
                .add_grant(&PolicyGrant::scoped_read(
                    &user.id,
                    &ScopedObject::fallback(attribute),
                ))
                .await?;
        } else {
            self.enforcer.remove_grant(&specific).await?;
        }

        info!(
            subject = %user.id,
            customer_id = input.customer_id,
            attribute = %attribute,
            has_access = input.has_access,
            "Customer access toggled"
        );
        Ok(())
    }

    /// Associate an existing user with a customer and make them a portal user
    pub async fn link_customer_user(&self, input: LinkCustomerUserInput) -> Result<()> {
        input.validate()?;
        let user = self.require_user_by_email(&input.email).await?;
        let customer = self.require_customer(input.customer_id).await?;

        let duplicate = || {
            AppError::Conflict(format!(
                "{} is already associated with customer {}",
                user.email, customer.id
            ))
        };

        if self
            .associations
            .customer_link_exists(&user.id, customer.id)
            .await?
        {
            return Err(duplicate());
        }
        // a concurrent insert of the same pair loses here
        if !self.associations.link_customer(&user.id, customer.id).await? {
            return Err(duplicate());
        }

        self.enforcer
            .add_grant(&PolicyGrant::scoped_read(&user.id, &ScopedObject::CustomerWide))
            .await?;

        info!(subject = %user.id, customer_id = customer.id, "User linked to customer");
        Ok(())
    }

    pub async fn unlink_customer_user(&self, input: UnlinkCustomerUserInput) -> Result<()> {
        input.validate()?;
        let user = self.require_user(&input.user_id).await?;

        let linked = self.associations.customers_for_subject(&user.id).await?;
        if !linked.contains(&input.customer_id) {
            return Err(AppError::NotFound(format!(
                "User {} is not associated with customer {}",
                user.id, input.customer_id
            )));
        }

        let orphaned = self
            .detach_customer(&user.id, input.customer_id, &linked)
            .await?;

        if orphaned && user.employee_id.is_none() {
            self.teardown_subject(&user.id).await?;
        }
        Ok(())
    }

    /// Revoke a subject's grants for one customer and drop the association row.
    ///
    /// `linked` is every customer the subject is associated with, including
    /// `customer_id`. Returns true when no customer association remains.
    async fn detach_customer(&self, subject: &str, customer_id: i64, linked: &[i64]) -> Result<bool> {
        for attribute in &self.policy.scoped_attributes {
            self.enforcer
                .remove_grant(&PolicyGrant::scoped_read(
                    subject,
                    &ScopedObject::specific(customer_id, attribute.as_str()),
                ))
                .await?;
        }

        let remaining: Vec<i64> = linked
            .iter()
            .copied()
            .filter(|id| *id != customer_id)
            .collect();

        if remaining.is_empty() {
            self.enforcer
                .remove_grant(&PolicyGrant::scoped_read(subject, &ScopedObject::CustomerWide))
                .await?;
            for attribute in &self.policy.scoped_attributes {
                self.enforcer
                    .remove_grant(&PolicyGrant::scoped_read(
                        subject,
                        &ScopedObject::fallback(attribute.as_str()),
                    ))
                    .await?;
            }
        } else {
            self.recompute_fallbacks(subject, &remaining).await?;
        }

        self.associations
            .unlink_customer(subject, customer_id)
            .await?;

        info!(
            subject = %subject,
            customer_id,
            remaining = remaining.len(),
            "User detached from customer"
        );
        Ok(remaining.is_empty())
    }

    /// Drop each fallback no remaining customer still backs with a specific grant
    async fn recompute_fallbacks(&self, subject: &str, remaining: &[i64]) -> Result<()> {
        for attribute in &self.policy.scoped_attributes {
            let mut still_granted = false;
            for customer_id in remaining {
                let specific = PolicyGrant::scoped_read(
                    subject,
                    &ScopedObject::specific(*customer_id, attribute.as_str()),
                );
                if self.enforcer.has_grant(&specific).await? {
                    still_granted = true;
                    break;
                }
            }

            if !still_granted {
                self.enforcer
                    .remove_grant(&PolicyGrant::scoped_read(
                        subject,
                        &ScopedObject::fallback(attribute.as_str()),
                    ))
                    .await?;
            }
        }
        Ok(())
    }

    // ==================== Employee associations ====================

    pub async fn link_employee_user(&self, input: LinkEmployeeUserInput) -> Result<()> {
        input.validate()?;
        let user = self.require_user_by_email(&input.user_email).await?;
        let employee = self.require_employee(input.employee_id).await?;

        let already_linked = || {
            AppError::Conflict(format!(
                "{} is already linked to an employee",
                user.email
            ))
        };

        if user.employee_id.is_some() {
            return Err(already_linked());
        }
        if !self.associations.link_employee(&user.id, employee.id).await? {
            return Err(already_linked());
        }

        info!(subject = %user.id, employee_id = employee.id, "User linked to employee");
        Ok(())
    }

    pub async fn unlink_employee_user(&self, input: UnlinkEmployeeUserInput) -> Result<()> {
        input.validate()?;
        let user = self.require_user(&input.user_id).await?;
        if user.employee_id != Some(input.employee_id) {
            return Err(AppError::NotFound(format!(
                "User {} is not linked to employee {}",
                user.id, input.employee_id
            )));
        }

        self.detach_employee(&user.id).await
    }

    /// Subjects with customer associations lose only the employee link and
    /// their role; everyone else is torn down.
    async fn detach_employee(&self, subject: &str) -> Result<()> {
        let customers = self.associations.customers_for_subject(subject).await?;
        if customers.is_empty() {
            return self.teardown_subject(subject).await;
        }

        self.enforcer.remove_groupings(subject).await?;
        self.associations.unlink_employee(subject).await?;
        info!(subject = %subject, customers = customers.len(), "User detached from employee");
        Ok(())
    }

    // ==================== Cascading deletes ====================

    #[instrument(skip(self))]
    pub async fn delete_employee(&self, employee_id: i64) -> Result<()> {
        let employee = self.require_employee(employee_id).await?;

        let subjects = self.associations.subjects_for_employee(employee.id).await?;
        for subject in &subjects {
            self.detach_employee(subject).await?;
        }

        self.employees.delete(employee.id).await?;
        info!(employee_id = employee.id, users = subjects.len(), "Employee deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_customer(&self, customer_id: i64) -> Result<()> {
        let customer = self.require_customer(customer_id).await?;

        let subjects = self.associations.subjects_for_customer(customer.id).await?;
        for subject in &subjects {
            let linked = self.associations.customers_for_subject(subject).await?;
            let orphaned = self.detach_customer(subject, customer.id, &linked).await?;
            if orphaned
                && self
                    .associations
                    .employee_for_subject(subject)
                    .await?
                    .is_none()
            {
                self.teardown_subject(subject).await?;
            }
        }

        self.associations.clear_customer(customer.id).await?;
        self.customers.delete(customer.id).await?;
        info!(customer_id = customer.id, users = subjects.len(), "Customer deleted");
        Ok(())
    }

    // ==================== Accounts ====================

    /// Register with the identity provider first, then mirror locally
    pub async fn create_account(&self, input: CreateAccountInput) -> Result<User> {
        input.validate()?;
        let email = input.email.trim().to_string();

        let subject = self.identity.create_user(&email, &input.password).await?;
        let user = User {
            id: subject,
            email,
            creation_timestamp: chrono::Utc::now().timestamp_millis(),
            last_login_timestamp: None,
            employee_id: None,
        };
        self.users.create(&user).await?;

        info!(subject = %user.id, "Account created");
        Ok(user)
    }

    /// Remove a subject everywhere; succeeds for already-deleted subjects
    pub async fn delete_account(&self, subject: &str) -> Result<()> {
        self.teardown_subject(subject).await
    }

    /// Full removal of a subject:
    /// 1. policy grants and groupings
    /// 2. customer associations and the employee link
    /// 3. the relational user record
    /// 4. the identity-provider user (already gone counts as done)
    #[instrument(skip(self))]
    pub async fn teardown_subject(&self, subject: &str) -> Result<()> {
        let result = self.run_teardown(subject).await;
        portal_metrics::record_teardown(result.is_ok());
        if let Err(e) = &result {
            warn!(subject = %subject, error = %e, "Teardown stopped; retry completes it");
        }
        result
    }

    async fn run_teardown(&self, subject: &str) -> Result<()> {
        let grants = self.enforcer.delete_subject(subject).await?;
        let customers = self.associations.clear_subject_customers(subject).await?;
        self.associations.unlink_employee(subject).await?;
        let deleted = self.users.delete(subject).await?;

        match self.identity.delete_user(subject).await {
            Ok(()) => {}
            Err(AppError::NotFound(_)) => {
                info!(subject = %subject, "Identity-provider user already absent");
            }
            Err(e) => return Err(e),
        }

        info!(
            subject = %subject,
            grants,
            customers,
            record_deleted = deleted,
            "Subject torn down"
        );
        Ok(())
    }
}
