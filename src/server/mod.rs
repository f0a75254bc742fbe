//! Server initialization and routing

use crate::api;
use crate::config::{Config, PolicyConfig};
use crate::domain::{ACTION_READ, ACTION_WRITE};
use crate::enforcer::Enforcer;
use crate::keycloak::{IdentityProvider, KeycloakClient};
use crate::middleware::{authenticate, require_permission, PermissionGate, RedactingMakeSpan};
use crate::repository::{
    association::AssociationRepositoryImpl, customer::CustomerRepositoryImpl,
    employee::EmployeeRepositoryImpl, policy::PolicyRepositoryImpl, rbac::RbacRepositoryImpl,
    user::UserRepositoryImpl,
};
use crate::service::{
    AssociationService, CustomerService, EmployeeService, IdentitySyncService, RbacService,
    UserService,
};
use crate::state::HasServices;
use anyhow::Result;
use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::{mysql::MySqlPoolOptions, MySqlPool};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db_pool: MySqlPool,
    pub enforcer: Arc<Enforcer<PolicyRepositoryImpl>>,
    pub identity: Arc<dyn IdentityProvider>,
    pub rbac_service: Arc<RbacService<PolicyRepositoryImpl, RbacRepositoryImpl>>,
    pub user_service: Arc<UserService<UserRepositoryImpl>>,
    pub customer_service:
        Arc<CustomerService<CustomerRepositoryImpl, UserRepositoryImpl, PolicyRepositoryImpl>>,
    pub employee_service: Arc<EmployeeService<EmployeeRepositoryImpl, UserRepositoryImpl>>,
    pub association_service: Arc<
        AssociationService<
            PolicyRepositoryImpl,
            AssociationRepositoryImpl,
            UserRepositoryImpl,
            CustomerRepositoryImpl,
            EmployeeRepositoryImpl,
        >,
    >,
    pub identity_sync_service: Arc<IdentitySyncService<UserRepositoryImpl>>,
    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    /// Connect to the database, load the policy and wire every service
    pub async fn connect(config: Config, prometheus_handle: Option<PrometheusHandle>) -> Result<Self> {
        let db_pool = MySqlPoolOptions::new()
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .connect(&config.database.url)
            .await?;
        info!("Connected to database");

        let policy_repo = Arc::new(PolicyRepositoryImpl::new(db_pool.clone()));
        let rbac_repo = Arc::new(RbacRepositoryImpl::new(db_pool.clone()));
        let user_repo = Arc::new(UserRepositoryImpl::new(db_pool.clone()));
        let customer_repo = Arc::new(CustomerRepositoryImpl::new(db_pool.clone()));
        let employee_repo = Arc::new(EmployeeRepositoryImpl::new(db_pool.clone()));
        let association_repo = Arc::new(AssociationRepositoryImpl::new(db_pool.clone()));

        let identity: Arc<dyn IdentityProvider> =
            Arc::new(KeycloakClient::new(config.keycloak.clone())?);

        let enforcer = Arc::new(Enforcer::load(policy_repo).await?);
        info!(
            grants = enforcer.snapshot().await.grant_count(),
            "Policy loaded"
        );

        let policy = config.policy.clone();
        Ok(Self {
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
            config: Arc::new(config),
            db_pool,
            enforcer,
            identity,
            prometheus_handle,
        })
    }
}

impl HasServices for AppState {
    type PolicyRepo = PolicyRepositoryImpl;
    type RbacRepo = RbacRepositoryImpl;
    type UserRepo = UserRepositoryImpl;
    type CustomerRepo = CustomerRepositoryImpl;
    type EmployeeRepo = EmployeeRepositoryImpl;
    type AssociationRepo = AssociationRepositoryImpl;

    fn policy_config(&self) -> &PolicyConfig {
        &self.config.policy
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
        self.prometheus_handle.as_ref()
    }

    async fn check_ready(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.db_pool).await.is_ok()
    }
}

/// Run the HTTP server
pub async fn run(config: Config, prometheus_handle: Option<PrometheusHandle>) -> Result<()> {
    let http_addr = config.http_addr();
    let state = AppState::connect(config, prometheus_handle).await?;
    let app = build_router(state);

    let listener = TcpListener::bind(&http_addr).await?;
    info!("HTTP server started on {}", http_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the HTTP router with generic state type
///
/// Every `/api/v1` route runs `authenticate` first, then the per-method
/// `require_permission` gate for the admin resource.
pub fn build_router<S: HasServices>(state: S) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let read = from_fn_with_state(
        PermissionGate::new(state.clone(), ACTION_READ),
        require_permission::<S>,
    );
    let write = from_fn_with_state(
        PermissionGate::new(state.clone(), ACTION_WRITE),
        require_permission::<S>,
    );

    let api_routes = Router::new()
        .route("/me/permissions", get(api::permissions::mine::<S>))
        // Users
        .route(
            "/users",
            get(api::users::list::<S>).route_layer(read.clone()),
        )
        .route(
            "/users/unassigned",
            get(api::users::list_unassigned::<S>).route_layer(read.clone()),
        )
        .route(
            "/users/emails",
            get(api::users::list_emails::<S>).route_layer(read.clone()),
        )
        .route(
            "/users/all",
            get(api::users::list_all::<S>).route_layer(read.clone()),
        )
        .route(
            "/users/sync",
            post(api::users::sync::<S>).route_layer(write.clone()),
        )
        // Roles
        .route(
            "/roles",
            get(api::roles::list::<S>).route_layer(read.clone()).merge(
                post(api::roles::create::<S>)
                    .put(api::roles::assign::<S>)
                    .route_layer(write.clone()),
            ),
        )
        .route(
            "/roles/{name}",
            delete(api::roles::delete::<S>).route_layer(write.clone()),
        )
        // Role permissions
        .route(
            "/permissions",
            get(api::permissions::list_for_role::<S>)
                .route_layer(read.clone())
                .merge(
                    post(api::permissions::add::<S>)
                        .delete(api::permissions::remove::<S>)
                        .route_layer(write.clone()),
                ),
        )
        // Employees
        .route(
            "/employees",
            get(api::employees::list::<S>).route_layer(read.clone()).merge(
                post(api::employees::create::<S>)
                    .put(api::employees::update::<S>)
                    .route_layer(write.clone()),
            ),
        )
        .route(
            "/employees/associations",
            post(api::employees::link_user::<S>)
                .delete(api::employees::unlink_user::<S>)
                .route_layer(write.clone()),
        )
        .route(
            "/employees/{id}",
            delete(api::employees::delete::<S>).route_layer(write.clone()),
        )
        .route(
            "/employees/{id}/users",
            get(api::employees::list_users::<S>).route_layer(read.clone()),
        )
        // Customers
        .route(
            "/customers",
            get(api::customers::list::<S>).route_layer(read.clone()).merge(
                post(api::customers::create::<S>)
                    .put(api::customers::update::<S>)
                    .route_layer(write.clone()),
            ),
        )
        .route(
            "/customers/associations",
            post(api::customers::link_user::<S>)
                .put(api::customers::toggle_access::<S>)
                .delete(api::customers::unlink_user::<S>)
                .route_layer(write.clone()),
        )
        .route(
            "/customers/{id}",
            delete(api::customers::delete::<S>).route_layer(write.clone()),
        )
        .route(
            "/customers/{id}/users",
            get(api::customers::list_users::<S>).route_layer(read.clone()),
        )
        // Accounts
        .route(
            "/accounts",
            get(api::accounts::list::<S>).route_layer(read).merge(
                post(api::accounts::create::<S>).route_layer(write.clone()),
            ),
        )
        .route(
            "/accounts/{id}",
            delete(api::accounts::delete::<S>).route_layer(write),
        )
        .layer(from_fn_with_state(state.clone(), authenticate::<S>));

    Router::new()
        .route("/health", get(api::health::health))
        .route("/ready", get(api::health::ready::<S>))
        .route("/metrics", get(api::metrics::metrics_handler::<S>))
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http().make_span_with(RedactingMakeSpan))
        .layer(cors)
        .with_state(state)
}
