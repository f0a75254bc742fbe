//! Application state trait for dependency injection
//!
//! Handlers and middleware are generic over [`HasServices`], so the same
//! router runs against the production `AppState` and in-memory test states.

use crate::config::PolicyConfig;
use crate::enforcer::Enforcer;
use crate::keycloak::IdentityProvider;
use crate::repository::{
    AssociationRepository, CustomerRepository, EmployeeRepository, PolicyRepository,
    RbacRepository, UserRepository,
};
use crate::service::{
    AssociationService, CustomerService, EmployeeService, IdentitySyncService, RbacService,
    UserService,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

pub trait HasServices: Clone + Send + Sync + 'static {
    type PolicyRepo: PolicyRepository + 'static;
    type RbacRepo: RbacRepository + 'static;
    type UserRepo: UserRepository + 'static;
    type CustomerRepo: CustomerRepository + 'static;
    type EmployeeRepo: EmployeeRepository + 'static;
    type AssociationRepo: AssociationRepository + 'static;

    fn policy_config(&self) -> &PolicyConfig;

    fn enforcer(&self) -> &Arc<Enforcer<Self::PolicyRepo>>;

    fn identity(&self) -> &Arc<dyn IdentityProvider>;

    fn rbac_service(&self) -> &RbacService<Self::PolicyRepo, Self::RbacRepo>;

    fn user_service(&self) -> &UserService<Self::UserRepo>;

    fn customer_service(
        &self,
    ) -> &CustomerService<Self::CustomerRepo, Self::UserRepo, Self::PolicyRepo>;

    fn employee_service(&self) -> &EmployeeService<Self::EmployeeRepo, Self::UserRepo>;

    fn association_service(
        &self,
    ) -> &AssociationService<
        Self::PolicyRepo,
        Self::AssociationRepo,
        Self::UserRepo,
        Self::CustomerRepo,
        Self::EmployeeRepo,
    >;

    fn identity_sync_service(&self) -> &IdentitySyncService<Self::UserRepo>;

    /// Present when metrics are enabled
    fn prometheus_handle(&self) -> Option<&PrometheusHandle>;

    /// True when the backing stores answer
    fn check_ready(&self) -> impl std::future::Future<Output = bool> + Send;
}
