//! Shared test infrastructure
//!
//! In-memory repositories over one [`TestDb`], a recording
//! [`TestIdentityProvider`] and a [`TestAppState`] that plugs both into the
//! production `build_router`.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use portal_core::config::PolicyConfig;
use portal_core::domain::{
    CreateCustomerInput, CreateEmployeeInput, CreateRoleInput, Customer, Employee, GroupingGrant,
    IdentityUser, PermissionCatalogEntry, PolicyGrant, PolicyRule, Role, UpdateCustomerInput,
    UpdateEmployeeInput, User, UserWithRole,
};
use portal_core::enforcer::Enforcer;
use portal_core::error::{AppError, Result};
use portal_core::keycloak::IdentityProvider;
use portal_core::repository::{
    AssociationRepository, CustomerRepository, EmployeeRepository, PolicyRepository,
    RbacRepository, UserRepository,
};
use portal_core::service::{
    AssociationService, CustomerService, EmployeeService, IdentitySyncService, RbacService,
    UserService,
};
use portal_core::state::HasServices;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceExt;

// ============================================================================
// In-memory tables
// ============================================================================

#[derive(Default)]
pub struct TestDb {
    pub users: RwLock<Vec<User>>,
    pub customers: RwLock<Vec<Customer>>,
    pub employees: RwLock<Vec<Employee>>,
    /// (user_id, customer_id)
    pub customer_users: RwLock<Vec<(String, i64)>>,
    pub roles: RwLock<Vec<Role>>,
    pub catalog: RwLock<Vec<PermissionCatalogEntry>>,
    pub rules: RwLock<Vec<PolicyRule>>,
    next_id: AtomicI64,
}

impl TestDb {
    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub async fn insert_user(&self, id: &str, email: &str) -> User {
        let user = User {
            id: id.to_string(),
            email: email.to_string(),
            creation_timestamp: 1_700_000_000_000,
            last_login_timestamp: None,
            employee_id: None,
        };
        self.users.write().await.push(user.clone());
        user
    }

    pub async fn insert_customer(&self, id: i64, full_name: &str) {
        self.customers.write().await.push(Customer {
            id,
            full_name: full_name.to_string(),
        });
    }

    pub async fn insert_employee(&self, id: i64, full_name: &str) {
        self.employees.write().await.push(Employee {
            id,
            full_name: full_name.to_string(),
        });
    }

    pub async fn insert_catalog_entry(&self, resource: &str, action: &str, category: &str, no: i32) {
        let id = self.next_id();
        self.catalog.write().await.push(PermissionCatalogEntry {
            id,
            action: action.to_string(),
            resource: resource.to_string(),
            description: format!("{} {}", action, resource),
            category: category.to_string(),
            category_no: no,
        });
    }

    /// Writes straight to the rule table, bypassing any enforcer
    pub async fn insert_rule(&self, rule: PolicyRule) {
        self.rules.write().await.push(rule);
    }

    pub async fn grants_of(&self, subject: &str) -> Vec<(String, String)> {
        let mut grants: Vec<(String, String)> = self
            .rules
            .read()
            .await
            .iter()
            .filter_map(|rule| match rule {
                PolicyRule::Grant(g) if g.subject == subject => {
                    Some((g.object.clone(), g.action.clone()))
                }
                _ => None,
            })
            .collect();
        grants.sort();
        grants
    }

    pub async fn user(&self, id: &str) -> Option<User> {
        self.users.read().await.iter().find(|u| u.id == id).cloned()
    }

    pub async fn customers_of(&self, subject: &str) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .customer_users
            .read()
            .await
            .iter()
            .filter(|(u, _)| u == subject)
            .map(|(_, c)| *c)
            .collect();
        ids.sort();
        ids
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.trim().to_lowercase())
}

// ============================================================================
// Repositories
// ============================================================================

#[derive(Clone)]
pub struct TestPolicyRepository(pub Arc<TestDb>);

#[async_trait]
impl PolicyRepository for TestPolicyRepository {
    async fn add_grant(&self, grant: &PolicyGrant) -> Result<bool> {
        let mut rules = self.0.rules.write().await;
        let rule = PolicyRule::Grant(grant.clone());
        if rules.contains(&rule) {
            return Ok(false);
        }
        rules.push(rule);
        Ok(true)
    }

    async fn remove_grant(&self, grant: &PolicyGrant) -> Result<bool> {
        let mut rules = self.0.rules.write().await;
        let before = rules.len();
        rules.retain(|r| !matches!(r, PolicyRule::Grant(g) if g == grant));
        Ok(rules.len() < before)
    }

    async fn has_grant(&self, grant: &PolicyGrant) -> Result<bool> {
        Ok(self
            .0
            .rules
            .read()
            .await
            .contains(&PolicyRule::Grant(grant.clone())))
    }

    async fn grants_for_subject(&self, subject: &str) -> Result<Vec<PolicyGrant>> {
        Ok(self
            .0
            .rules
            .read()
            .await
            .iter()
            .filter_map(|r| match r {
                PolicyRule::Grant(g) if g.subject == subject => Some(g.clone()),
                _ => None,
            })
            .collect())
    }

    async fn remove_all_grants_for_subject(&self, subject: &str) -> Result<u64> {
        let mut rules = self.0.rules.write().await;
        let before = rules.len();
        rules.retain(|r| match r {
            PolicyRule::Grant(g) => g.subject != subject,
            PolicyRule::Grouping(g) => g.subject != subject,
        });
        Ok((before - rules.len()) as u64)
    }

    async fn remove_role_grants(&self, role: &str) -> Result<u64> {
        let mut rules = self.0.rules.write().await;
        let before = rules.len();
        rules.retain(|r| !matches!(r, PolicyRule::Grant(g) if g.subject == role));
        Ok((before - rules.len()) as u64)
    }

    async fn roles_for_subject(&self, subject: &str) -> Result<Vec<String>> {
        Ok(self
            .0
            .rules
            .read()
            .await
            .iter()
            .filter_map(|r| match r {
                PolicyRule::Grouping(g) if g.subject == subject => Some(g.role.clone()),
                _ => None,
            })
            .collect())
    }

    async fn has_grouping(&self, grouping: &GroupingGrant) -> Result<bool> {
        Ok(self
            .0
            .rules
            .read()
            .await
            .contains(&PolicyRule::Grouping(grouping.clone())))
    }

    async fn count_groupings_for_role(&self, role: &str) -> Result<i64> {
        Ok(self
            .0
            .rules
            .read()
            .await
            .iter()
            .filter(|r| matches!(r, PolicyRule::Grouping(g) if g.role == role))
            .count() as i64)
    }

    async fn replace_grouping(
        &self,
        subject: &str,
        old_role: Option<String>,
        new_role: &str,
    ) -> Result<()> {
        let mut rules = self.0.rules.write().await;
        if let Some(old_role) = old_role {
            let old = PolicyRule::Grouping(GroupingGrant::new(subject, old_role));
            rules.retain(|r| *r != old);
        }
        let new = PolicyRule::Grouping(GroupingGrant::new(subject, new_role));
        if !rules.contains(&new) {
            rules.push(new);
        }
        Ok(())
    }

    async fn remove_groupings_for_subject(&self, subject: &str) -> Result<u64> {
        let mut rules = self.0.rules.write().await;
        let before = rules.len();
        rules.retain(|r| !matches!(r, PolicyRule::Grouping(g) if g.subject == subject));
        Ok((before - rules.len()) as u64)
    }

    async fn load_all(&self) -> Result<Vec<PolicyRule>> {
        Ok(self.0.rules.read().await.clone())
    }
}

#[derive(Clone)]
pub struct TestRbacRepository(pub Arc<TestDb>);

#[async_trait]
impl RbacRepository for TestRbacRepository {
    async fn create_role(&self, input: &CreateRoleInput) -> Result<Role> {
        let name = input.role.trim().to_string();
        let mut roles = self.0.roles.write().await;
        if roles.iter().any(|r| r.name == name) {
            return Err(AppError::Conflict(format!("Role '{}' already exists", name)));
        }
        let role = Role { name };
        roles.push(role.clone());
        Ok(role)
    }

    async fn find_role(&self, name: &str) -> Result<Option<Role>> {
        Ok(self
            .0
            .roles
            .read()
            .await
            .iter()
            .find(|r| r.name == name)
            .cloned())
    }

    async fn list_roles(&self) -> Result<Vec<Role>> {
        let mut roles = self.0.roles.read().await.clone();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn delete_role(&self, name: &str) -> Result<bool> {
        let mut roles = self.0.roles.write().await;
        let before = roles.len();
        roles.retain(|r| r.name != name);
        Ok(roles.len() < before)
    }

    async fn list_catalog(&self) -> Result<Vec<PermissionCatalogEntry>> {
        let mut entries = self.0.catalog.read().await.clone();
        entries.sort_by_key(|e| (e.category_no, e.id));
        Ok(entries)
    }

    async fn catalog_contains(&self, resource: &str, action: &str) -> Result<bool> {
        Ok(self
            .0
            .catalog
            .read()
            .await
            .iter()
            .any(|e| e.resource == resource && e.action == action))
    }
}

#[derive(Clone)]
pub struct TestUserRepository(pub Arc<TestDb>);

#[async_trait]
impl UserRepository for TestUserRepository {
    async fn create(&self, user: &User) -> Result<()> {
        let mut users = self.0.users.write().await;
        if users.iter().any(|u| u.id == user.id || u.email == user.email) {
            return Err(AppError::Conflict(format!("User {} already exists", user.id)));
        }
        users.push(user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.0.user(id).await)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .0
            .users
            .read()
            .await
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<User>> {
        let mut users = self.0.users.read().await.clone();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn find_by_customer(&self, customer_id: i64) -> Result<Vec<User>> {
        let links = self.0.customer_users.read().await.clone();
        let mut users: Vec<User> = self
            .0
            .users
            .read()
            .await
            .iter()
            .filter(|u| links.iter().any(|(id, c)| *id == u.id && *c == customer_id))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn find_by_employee(&self, employee_id: i64) -> Result<Vec<User>> {
        Ok(self
            .0
            .users
            .read()
            .await
            .iter()
            .filter(|u| u.employee_id == Some(employee_id))
            .cloned()
            .collect())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut users = self.0.users.write().await;
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() < before)
    }

    async fn upsert_from_provider(&self, user: &IdentityUser) -> Result<()> {
        let mut users = self.0.users.write().await;
        match users.iter_mut().find(|u| u.id == user.subject_id) {
            Some(existing) => {
                existing.email = user.email.clone();
                existing.creation_timestamp = user.creation_timestamp;
                if user.last_login_timestamp.is_some() {
                    existing.last_login_timestamp = user.last_login_timestamp;
                }
            }
            None => users.push(User {
                id: user.subject_id.clone(),
                email: user.email.clone(),
                creation_timestamp: user.creation_timestamp,
                last_login_timestamp: user.last_login_timestamp,
                employee_id: None,
            }),
        }
        Ok(())
    }

    async fn list_unassigned_emails(&self) -> Result<Vec<String>> {
        let links = self.0.customer_users.read().await.clone();
        let mut emails: Vec<String> = self
            .0
            .users
            .read()
            .await
            .iter()
            .filter(|u| u.employee_id.is_none() && !links.iter().any(|(id, _)| *id == u.id))
            .map(|u| u.email.clone())
            .collect();
        emails.sort();
        Ok(emails)
    }

    async fn list_customer_candidate_emails(
        &self,
        excluded_domain: Option<String>,
    ) -> Result<Vec<String>> {
        let suffix = excluded_domain.map(|d| format!("@{}", d.trim_start_matches('@')));
        let mut emails: Vec<String> = self
            .0
            .users
            .read()
            .await
            .iter()
            .filter(|u| u.employee_id.is_none())
            .filter(|u| suffix.as_ref().map_or(true, |s| !u.email.ends_with(s.as_str())))
            .map(|u| u.email.clone())
            .collect();
        emails.sort();
        Ok(emails)
    }

    async fn list_with_roles(&self, keyword: &str) -> Result<Vec<UserWithRole>> {
        let employees = self.0.employees.read().await.clone();
        let rules = self.0.rules.read().await.clone();
        let mut users: Vec<UserWithRole> = self
            .0
            .users
            .read()
            .await
            .iter()
            .filter_map(|u| {
                let employee = employees.iter().find(|e| Some(e.id) == u.employee_id)?;
                let role = rules.iter().find_map(|r| match r {
                    PolicyRule::Grouping(g) if g.subject == u.id => Some(g.role.clone()),
                    _ => None,
                });
                Some(UserWithRole {
                    id: u.id.clone(),
                    full_name: employee.full_name.clone(),
                    email: u.email.clone(),
                    role,
                })
            })
            .filter(|u| {
                contains_ignore_case(&u.full_name, keyword) || contains_ignore_case(&u.email, keyword)
            })
            .collect();
        users.sort_by(|a, b| (&a.full_name, &a.email).cmp(&(&b.full_name, &b.email)));
        Ok(users)
    }
}

#[derive(Clone)]
pub struct TestCustomerRepository(pub Arc<TestDb>);

#[async_trait]
impl CustomerRepository for TestCustomerRepository {
    async fn create(&self, input: &CreateCustomerInput) -> Result<Customer> {
        let customer = Customer {
            id: 1000 + self.0.next_id(),
            full_name: input.full_name.trim().to_string(),
        };
        self.0.customers.write().await.push(customer.clone());
        Ok(customer)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Customer>> {
        Ok(self
            .0
            .customers
            .read()
            .await
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn list(&self, keyword: &str) -> Result<Vec<Customer>> {
        let mut customers: Vec<Customer> = self
            .0
            .customers
            .read()
            .await
            .iter()
            .filter(|c| contains_ignore_case(&c.full_name, keyword))
            .cloned()
            .collect();
        customers.sort_by(|a, b| (&a.full_name, a.id).cmp(&(&b.full_name, b.id)));
        Ok(customers)
    }

    async fn update(&self, input: &UpdateCustomerInput) -> Result<Customer> {
        let mut customers = self.0.customers.write().await;
        let customer = customers
            .iter_mut()
            .find(|c| c.id == input.id)
            .ok_or_else(|| AppError::NotFound(format!("Customer {} not found", input.id)))?;
        customer.full_name = input.full_name.trim().to_string();
        Ok(customer.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut customers = self.0.customers.write().await;
        let before = customers.len();
        customers.retain(|c| c.id != id);
        Ok(customers.len() < before)
    }
}

#[derive(Clone)]
pub struct TestEmployeeRepository(pub Arc<TestDb>);

#[async_trait]
impl EmployeeRepository for TestEmployeeRepository {
    async fn create(&self, input: &CreateEmployeeInput) -> Result<Employee> {
        let employee = Employee {
            id: 2000 + self.0.next_id(),
            full_name: input.full_name.trim().to_string(),
        };
        self.0.employees.write().await.push(employee.clone());
        Ok(employee)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Employee>> {
        Ok(self
            .0
            .employees
            .read()
            .await
            .iter()
            .find(|e| e.id == id)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Employee>> {
        let mut employees = self.0.employees.read().await.clone();
        employees.sort_by(|a, b| (&a.full_name, a.id).cmp(&(&b.full_name, b.id)));
        Ok(employees)
    }

    async fn update(&self, input: &UpdateEmployeeInput) -> Result<Employee> {
        let mut employees = self.0.employees.write().await;
        let employee = employees
            .iter_mut()
            .find(|e| e.id == input.id)
            .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", input.id)))?;
        employee.full_name = input.full_name.trim().to_string();
        Ok(employee.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut employees = self.0.employees.write().await;
        let before = employees.len();
        employees.retain(|e| e.id != id);
        Ok(employees.len() < before)
    }
}

#[derive(Clone)]
pub struct TestAssociationRepository(pub Arc<TestDb>);

#[async_trait]
impl AssociationRepository for TestAssociationRepository {
    async fn link_customer(&self, subject: &str, customer_id: i64) -> Result<bool> {
        let mut links = self.0.customer_users.write().await;
        let pair = (subject.to_string(), customer_id);
        if links.contains(&pair) {
            return Ok(false);
        }
        links.push(pair);
        Ok(true)
    }

    async fn unlink_customer(&self, subject: &str, customer_id: i64) -> Result<bool> {
        let mut links = self.0.customer_users.write().await;
        let before = links.len();
        links.retain(|(u, c)| !(u == subject && *c == customer_id));
        Ok(links.len() < before)
    }

    async fn customer_link_exists(&self, subject: &str, customer_id: i64) -> Result<bool> {
        Ok(self
            .0
            .customer_users
            .read()
            .await
            .iter()
            .any(|(u, c)| u == subject && *c == customer_id))
    }

    async fn customers_for_subject(&self, subject: &str) -> Result<Vec<i64>> {
        Ok(self.0.customers_of(subject).await)
    }

    async fn subjects_for_customer(&self, customer_id: i64) -> Result<Vec<String>> {
        let mut subjects: Vec<String> = self
            .0
            .customer_users
            .read()
            .await
            .iter()
            .filter(|(_, c)| *c == customer_id)
            .map(|(u, _)| u.clone())
            .collect();
        subjects.sort();
        Ok(subjects)
    }

    async fn clear_customer(&self, customer_id: i64) -> Result<u64> {
        let mut links = self.0.customer_users.write().await;
        let before = links.len();
        links.retain(|(_, c)| *c != customer_id);
        Ok((before - links.len()) as u64)
    }

    async fn clear_subject_customers(&self, subject: &str) -> Result<u64> {
        let mut links = self.0.customer_users.write().await;
        let before = links.len();
        links.retain(|(u, _)| u != subject);
        Ok((before - links.len()) as u64)
    }

    async fn employee_for_subject(&self, subject: &str) -> Result<Option<i64>> {
        Ok(self.0.user(subject).await.and_then(|u| u.employee_id))
    }

    async fn link_employee(&self, subject: &str, employee_id: i64) -> Result<bool> {
        let mut users = self.0.users.write().await;
        match users.iter_mut().find(|u| u.id == subject) {
            Some(user) if user.employee_id.is_none() => {
                user.employee_id = Some(employee_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn unlink_employee(&self, subject: &str) -> Result<bool> {
        let mut users = self.0.users.write().await;
        match users.iter_mut().find(|u| u.id == subject) {
            Some(user) if user.employee_id.is_some() => {
                user.employee_id = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn subjects_for_employee(&self, employee_id: i64) -> Result<Vec<String>> {
        let mut subjects: Vec<String> = self
            .0
            .users
            .read()
            .await
            .iter()
            .filter(|u| u.employee_id == Some(employee_id))
            .map(|u| u.id.clone())
            .collect();
        subjects.sort();
        Ok(subjects)
    }
}

// ============================================================================
// Identity provider
// ============================================================================

/// Identity provider double that records every call
#[derive(Default)]
pub struct TestIdentityProvider {
    users: RwLock<Vec<IdentityUser>>,
    tokens: RwLock<HashMap<String, String>>,
    pub deleted: RwLock<Vec<String>>,
    /// When set, `delete_user` fails with an upstream error
    pub fail_deletes: AtomicBool,
    next_id: AtomicI64,
}

impl TestIdentityProvider {
    pub async fn add_user(&self, subject_id: &str, email: &str) {
        self.users.write().await.push(IdentityUser {
            subject_id: subject_id.to_string(),
            email: email.to_string(),
            creation_timestamp: 1_700_000_000_000,
            last_login_timestamp: None,
        });
    }

    pub async fn issue_token(&self, token: &str, subject_id: &str) {
        self.tokens
            .write()
            .await
            .insert(token.to_string(), subject_id.to_string());
    }

    pub async fn has_user(&self, subject_id: &str) -> bool {
        self.users
            .read()
            .await
            .iter()
            .any(|u| u.subject_id == subject_id)
    }

    pub async fn deleted(&self) -> Vec<String> {
        self.deleted.read().await.clone()
    }
}

#[async_trait]
impl IdentityProvider for TestIdentityProvider {
    async fn create_user(&self, email: &str, _password: &str) -> Result<String> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == email) {
            return Err(AppError::Conflict(format!("User {} already exists", email)));
        }
        let subject_id = format!("kc-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        users.push(IdentityUser {
            subject_id: subject_id.clone(),
            email: email.to_string(),
            creation_timestamp: 1_700_000_000_000,
            last_login_timestamp: None,
        });
        Ok(subject_id)
    }

    async fn delete_user(&self, subject_id: &str) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AppError::IdentityProvider("Keycloak unavailable".to_string()));
        }
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| u.subject_id != subject_id);
        if users.len() == before {
            return Err(AppError::NotFound(format!("User {} not found", subject_id)));
        }
        self.deleted.write().await.push(subject_id.to_string());
        Ok(())
    }

    async fn verify_token(&self, token: &str) -> Result<String> {
        self.tokens
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Invalid token".to_string()))
    }

    async fn list_users(&self, first: u32, max: u32) -> Result<Vec<IdentityUser>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .skip(first as usize)
            .take(max as usize)
            .cloned()
            .collect())
    }
}

// ============================================================================
// Test AppState
// ============================================================================

pub fn test_policy_config() -> PolicyConfig {
    PolicyConfig {
        internal_email_domain: Some("acme.test".to_string()),
        sync_page_size: 2,
        ..PolicyConfig::default()
    }
}

/// Production services wired to the in-memory repositories
#[derive(Clone)]
pub struct TestAppState {
    pub db: Arc<TestDb>,
    pub idp: Arc<TestIdentityProvider>,
    pub policy: PolicyConfig,
    pub enforcer: Arc<Enforcer<TestPolicyRepository>>,
    pub identity: Arc<dyn IdentityProvider>,
    pub rbac_service: Arc<RbacService<TestPolicyRepository, TestRbacRepository>>,
    pub user_service: Arc<UserService<TestUserRepository>>,
    pub customer_service:
        Arc<CustomerService<TestCustomerRepository, TestUserRepository, TestPolicyRepository>>,
    pub employee_service: Arc<EmployeeService<TestEmployeeRepository, TestUserRepository>>,
    pub association_service: Arc<
        AssociationService<
            TestPolicyRepository,
            TestAssociationRepository,
            TestUserRepository,
            TestCustomerRepository,
            TestEmployeeRepository,
        >,
    >,
    pub identity_sync_service: Arc<IdentitySyncService<TestUserRepository>>,
}

impl TestAppState {
    pub fn new() -> Self {
        Self::with_policy(test_policy_config())
    }

    pub fn with_policy(policy: PolicyConfig) -> Self {
        let db = Arc::new(TestDb::default());
        let idp = Arc::new(TestIdentityProvider::default());
        let identity: Arc<dyn IdentityProvider> = idp.clone();

        let policy_repo = Arc::new(TestPolicyRepository(db.clone()));
        let rbac_repo = Arc::new(TestRbacRepository(db.clone()));
        let user_repo = Arc::new(TestUserRepository(db.clone()));
        let customer_repo = Arc::new(TestCustomerRepository(db.clone()));
        let employee_repo = Arc::new(TestEmployeeRepository(db.clone()));
        let association_repo = Arc::new(TestAssociationRepository(db.clone()));

        let enforcer = Arc::new(Enforcer::new(policy_repo));

        Self {
            rbac_service: Arc::new(RbacService::new(rbac_repo, enforcer.clone())),
            user_service: Arc::new(UserService::new(user_repo.clone(), policy.clone())),
            customer_service: Arc::new(CustomerService::new(
                customer_repo.clone(),
                user_repo.clone(),
                enforcer.clone(),
                policy.clone(),
            )),
            employee_service: Arc::new(EmployeeService::new(
                employee_repo.clone(),
                user_repo.clone(),
            )),
            association_service: Arc::new(AssociationService::new(
                enforcer.clone(),
                association_repo,
                user_repo.clone(),
                customer_repo,
                employee_repo,
                identity.clone(),
                policy.clone(),
            )),
            identity_sync_service: Arc::new(IdentitySyncService::new(
                identity.clone(),
                user_repo,
                policy.sync_page_size,
            )),
            db,
            idp,
            policy,
            enforcer,
            identity,
        }
    }

    /// Seed the admin role, its catalog grants and an admin user with a token
    pub async fn with_admin(self, subject: &str, token: &str) -> Self {
        self.db.insert_catalog_entry("rbac::data", "read", "Administration", 1).await;
        self.db.insert_catalog_entry("rbac::data", "write", "Administration", 1).await;
        self.db
            .insert_catalog_entry("portal::data::customer", "read", "Customer portal", 2)
            .await;
        self.db.roles.write().await.push(Role {
            name: "admin".to_string(),
        });
        self.db
            .insert_rule(PolicyRule::Grant(PolicyGrant::new("admin", "rbac::data", "read")))
            .await;
        self.db
            .insert_rule(PolicyRule::Grant(PolicyGrant::new("admin", "rbac::data", "write")))
            .await;
        self.db
            .insert_rule(PolicyRule::Grouping(GroupingGrant::new(subject, "admin")))
            .await;
        self.db
            .insert_user(subject, &format!("{}@acme.test", subject))
            .await;
        self.idp.add_user(subject, &format!("{}@acme.test", subject)).await;
        self.idp.issue_token(token, subject).await;
        self
    }
}

impl Default for TestAppState {
    fn default() -> Self {
        Self::new()
    }
}

impl HasServices for TestAppState {
    type PolicyRepo = TestPolicyRepository;
    type RbacRepo = TestRbacRepository;
    type UserRepo = TestUserRepository;
    type CustomerRepo = TestCustomerRepository;
    type EmployeeRepo = TestEmployeeRepository;
    type AssociationRepo = TestAssociationRepository;

    fn policy_config(&self) -> &PolicyConfig {
        &self.policy
    }

    fn enforcer(&self) -> &Arc<Enforcer<Self::PolicyRepo>> {
        &self.enforcer
    }

    fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.identity
    }

    fn rbac_service(&self) -> &RbacService<Self::PolicyRepo, Self::RbacRepo> {
        &self.rbac_service
    }

    fn user_service(&self) -> &UserService<Self::UserRepo> {
        &self.user_service
    }

    fn customer_service(
        &self,
    ) -> &CustomerService<Self::CustomerRepo, Self::UserRepo, Self::PolicyRepo> {
        &self.customer_service
    }

    fn employee_service(&self) -> &EmployeeService<Self::EmployeeRepo, Self::UserRepo> {
        &self.employee_service
    }

    fn association_service(
        &self,
    ) -> &AssociationService<
        Self::PolicyRepo,
        Self::AssociationRepo,
        Self::UserRepo,
        Self::CustomerRepo,
        Self::EmployeeRepo,
    > {
        &self.association_service
    }

    fn identity_sync_service(&self) -> &IdentitySyncService<Self::UserRepo> {
        &self.identity_sync_service
    }

    fn prometheus_handle(&self) -> Option<&PrometheusHandle> {
        None
    }

    async fn check_ready(&self) -> bool {
        true
    }
}

// ============================================================================
// HTTP helpers
// ============================================================================

/// Send a request with an optional bearer token and JSON body
pub async fn send<R: DeserializeOwned>(
    app: &Router,
    method: Method,
    path: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, Option<R>) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap_or_default();

    if bytes.is_empty() {
        return (status, None);
    }
    (status, serde_json::from_slice(&bytes).ok())
}
