//! Data access layer (Repository pattern)

pub mod association;
pub mod customer;
pub mod employee;
pub mod policy;
pub mod rbac;
pub mod user;

pub use association::AssociationRepository;
pub use customer::CustomerRepository;
pub use employee::EmployeeRepository;
pub use policy::PolicyRepository;
pub use rbac::RbacRepository;
pub use user::UserRepository;
