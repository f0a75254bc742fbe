//! Configuration management for Portal Core

use crate::domain::validate_attribute;
use anyhow::{Context, Result};
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server host
    pub http_host: String,
    /// HTTP server port
    pub http_port: u16,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Keycloak (identity provider) configuration
    pub keycloak: KeycloakConfig,
    /// Authorization policy configuration
    pub policy: PolicyConfig,
    /// Logging and metrics configuration
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct KeycloakConfig {
    /// Internal URL for server-to-server communication (e.g., http://keycloak:8080)
    pub url: String,
    /// Realm holding portal users
    pub realm: String,
    /// Realm the admin client authenticates against
    pub admin_realm: String,
    pub admin_client_id: String,
    pub admin_client_secret: String,
    pub admin_username: String,
    pub admin_password: String,
    /// Request timeout for Admin API calls
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct PolicyConfig {
    /// Route-level resource checked by the authorization middleware
    pub admin_resource: String,
    /// Attributes that get per-customer grants and customer-agnostic fallbacks.
    /// Fallback recomputation on unlink iterates exactly this set.
    pub scoped_attributes: Vec<String>,
    /// Users whose email ends with this domain are internal staff and never
    /// offered as customer-portal users
    pub internal_email_domain: Option<String>,
    /// Page size used when pulling users from the identity provider
    pub sync_page_size: u32,
}

impl PolicyConfig {
    pub fn default_attributes() -> Vec<String> {
        vec!["finance".to_string(), "performance".to_string()]
    }

    pub fn is_scoped_attribute(&self, attribute: &str) -> bool {
        self.scoped_attributes.iter().any(|a| a == attribute)
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            admin_resource: "rbac::data".to_string(),
            scoped_attributes: Self::default_attributes(),
            internal_email_domain: None,
            sync_page_size: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// "json" for flattened JSON lines, anything else for the pretty formatter
    pub log_format: String,
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: "pretty".to_string(),
            metrics_enabled: false,
        }
    }
}

/// Parse a comma-separated attribute list, dropping blanks and duplicates
pub fn parse_attribute_list(raw: &str) -> Vec<String> {
    let mut attributes: Vec<String> = Vec::new();
    for attribute in raw.split(',').map(str::trim).filter(|a| !a.is_empty()) {
        if !attributes.iter().any(|a| a == attribute) {
            attributes.push(attribute.to_string());
        }
    }
    attributes
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            http_host: env::var("HTTP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid HTTP_PORT")?,
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").context("DATABASE_URL is required")?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()
                    .unwrap_or(2),
            },
            keycloak: KeycloakConfig {
                url: env::var("KEYCLOAK_URL")
                    .unwrap_or_else(|_| "http://localhost:8081".to_string()),
                realm: env::var("KEYCLOAK_REALM").unwrap_or_else(|_| "portal".to_string()),
                admin_realm: env::var("KEYCLOAK_ADMIN_REALM")
                    .unwrap_or_else(|_| "master".to_string()),
                admin_client_id: env::var("KEYCLOAK_ADMIN_CLIENT_ID")
                    .unwrap_or_else(|_| "admin-cli".to_string()),
                admin_client_secret: env::var("KEYCLOAK_ADMIN_CLIENT_SECRET")
                    .unwrap_or_else(|_| String::new()),
                admin_username: env::var("KEYCLOAK_ADMIN")
                    .unwrap_or_else(|_| "admin".to_string()),
                admin_password: env::var("KEYCLOAK_ADMIN_PASSWORD")
                    .unwrap_or_else(|_| "admin".to_string()),
                timeout_secs: env::var("KEYCLOAK_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .context("Invalid KEYCLOAK_TIMEOUT_SECS")?,
            },
            policy: {
                let scoped_attributes = env::var("PORTAL_SCOPED_ATTRIBUTES")
                    .map(|s| parse_attribute_list(&s))
                    .unwrap_or_else(|_| PolicyConfig::default_attributes());
                anyhow::ensure!(
                    !scoped_attributes.is_empty(),
                    "PORTAL_SCOPED_ATTRIBUTES must name at least one attribute"
                );
                for attribute in &scoped_attributes {
                    validate_attribute(attribute).context("Invalid PORTAL_SCOPED_ATTRIBUTES")?;
                }

                PolicyConfig {
                    admin_resource: env::var("PORTAL_ADMIN_RESOURCE")
                        .unwrap_or_else(|_| "rbac::data".to_string()),
                    scoped_attributes,
                    internal_email_domain: env::var("PORTAL_INTERNAL_EMAIL_DOMAIN")
                        .ok()
                        .filter(|d| !d.trim().is_empty()),
                    sync_page_size: env::var("PORTAL_SYNC_PAGE_SIZE")
                        .unwrap_or_else(|_| "100".to_string())
                        .parse()
                        .context("Invalid PORTAL_SYNC_PAGE_SIZE")?,
                }
            },
            telemetry: TelemetryConfig {
                log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
                metrics_enabled: env::var("METRICS_ENABLED")
                    .map(|s| s.to_lowercase() == "true")
                    .unwrap_or(false),
            },
        })
    }

    /// Get HTTP server address
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}
