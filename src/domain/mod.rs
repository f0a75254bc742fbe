//! Domain models for Portal Core

pub mod association;
pub mod common;
pub mod customer;
pub mod employee;
pub mod policy;
pub mod rbac;
pub mod user;

pub use association::*;
pub use customer::*;
pub use employee::*;
pub use policy::*;
pub use rbac::*;
pub use user::*;
