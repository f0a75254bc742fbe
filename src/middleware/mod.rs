//! HTTP middleware

pub mod auth;
pub mod trace;

pub use auth::{authenticate, require_permission, PermissionGate, RequestContext};
pub use trace::RedactingMakeSpan;
