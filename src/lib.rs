//! Portal Core - customer portal backend
//!
//! RBAC policy enforcement over a MySQL-backed rule store, plus the
//! orchestration that keeps users, customers, employees, policy grants and
//! Keycloak registrations consistent with each other.

pub mod api;
pub mod config;
pub mod domain;
pub mod enforcer;
pub mod error;
pub mod keycloak;
pub mod middleware;
pub mod migration;
pub mod repository;
pub mod server;
pub mod service;
pub mod state;
pub mod telemetry;

pub use config::Config;
pub use error::{AppError, Result};
