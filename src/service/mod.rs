//! Business logic layer

pub mod association;
pub mod catalog;
pub mod customer;
pub mod employee;
pub mod identity_sync;
pub mod rbac;
pub mod role;
pub mod user;

pub use association::AssociationService;
pub use catalog::PermissionCatalog;
pub use customer::CustomerService;
pub use employee::EmployeeService;
pub use identity_sync::IdentitySyncService;
pub use rbac::RbacService;
pub use role::RoleManager;
pub use user::UserService;
