//! Keycloak Admin API client and the identity-provider seam used by services

use crate::config::KeycloakConfig;
use crate::domain::IdentityUser;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Operations the portal needs from its identity provider.
///
/// Services and middleware hold an `Arc<dyn IdentityProvider>` so tests can
/// swap in a fake without HTTP mocking.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create a login account and return the provider's user id.
    /// Fails with `Conflict` when the email is already registered.
    async fn create_user(&self, email: &str, password: &str) -> Result<String>;
    /// Fails with `NotFound` when the provider has no such user
    async fn delete_user(&self, subject_id: &str) -> Result<()>;
    /// Resolve a bearer token to its subject id; `Unauthorized` when invalid
    async fn verify_token(&self, token: &str) -> Result<String>;
    /// One page of realm users
    async fn list_users(&self, first: u32, max: u32) -> Result<Vec<IdentityUser>>;
}

/// Keycloak Admin API client
#[derive(Clone)]
pub struct KeycloakClient {
    config: KeycloakConfig,
    http_client: Client,
    token: Arc<RwLock<Option<AdminToken>>>,
}

#[derive(Debug, Clone)]
struct AdminToken {
    access_token: String,
    expires_at: chrono::DateTime<chrono::Utc>,
}

/// Keycloak user representation (subset)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeycloakUser {
    pub id: Option<String>,
    pub username: String,
    pub email: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    pub created_timestamp: Option<i64>,
}

impl KeycloakUser {
    fn into_identity_user(self) -> Option<IdentityUser> {
        let subject_id = self.id?;
        Some(IdentityUser {
            subject_id,
            email: self.email.unwrap_or(self.username),
            creation_timestamp: self.created_timestamp.unwrap_or_default(),
            last_login_timestamp: None,
        })
    }
}

/// Input for creating a user in Keycloak
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKeycloakUserInput {
    pub username: String,
    pub email: String,
    pub enabled: bool,
    pub email_verified: bool,
    pub credentials: Vec<KeycloakCredential>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeycloakCredential {
    #[serde(rename = "type")]
    pub credential_type: String,
    pub value: String,
    pub temporary: bool,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
}

impl KeycloakClient {
    pub fn new(config: KeycloakConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
            token: Arc::new(RwLock::new(None)),
        })
    }

    /// Admin access token, cached until shortly before expiry
    async fn get_admin_token(&self) -> Result<String> {
        {
            let token = self.token.read().await;
            if let Some(ref t) = *token {
                if t.expires_at > chrono::Utc::now() + chrono::Duration::seconds(30) {
                    return Ok(t.access_token.clone());
                }
            }
        }

        let token_url = format!(
            "{}/realms/{}/protocol/openid-connect/token",
            self.config.url, self.config.admin_realm
        );

        let mut params = vec![
            ("grant_type", "password"),
            ("client_id", self.config.admin_client_id.as_str()),
            ("username", self.config.admin_username.as_str()),
            ("password", self.config.admin_password.as_str()),
        ];
        if !self.config.admin_client_secret.is_empty() {
            params.push(("client_secret", self.config.admin_client_secret.as_str()));
        }

        let response = self
            .http_client
            .post(&token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::IdentityProvider(format!("Failed to get admin token: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::IdentityProvider(format!(
                "Failed to get admin token: {} - {}",
                status, body
            )));
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            expires_in: i64,
        }

        let token_response: TokenResponse = response.json().await.map_err(|e| {
            AppError::IdentityProvider(format!("Failed to parse token response: {}", e))
        })?;

        *self.token.write().await = Some(AdminToken {
            access_token: token_response.access_token.clone(),
            expires_at: chrono::Utc::now() + chrono::Duration::seconds(token_response.expires_in),
        });

        Ok(token_response.access_token)
    }

    fn users_url(&self) -> String {
        format!(
            "{}/admin/realms/{}/users",
            self.config.url, self.config.realm
        )
    }

    /// Create a user in Keycloak and return its id
    pub async fn create_user(&self, input: &CreateKeycloakUserInput) -> Result<String> {
        let token = self.get_admin_token().await?;

        let response = self
            .http_client
            .post(self.users_url())
            .bearer_auth(&token)
            .json(input)
            .send()
            .await
            .map_err(|e| AppError::IdentityProvider(format!("Failed to create user: {}", e)))?;

        if response.status() == StatusCode::CONFLICT {
            return Err(AppError::Conflict(format!(
                "User '{}' already exists",
                input.email
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::IdentityProvider(format!(
                "Failed to create user: {} - {}",
                status, body
            )));
        }

        // the new id is the last segment of the Location header
        let location = response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::IdentityProvider("Missing location header".to_string()))?;

        let user_id = location
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::IdentityProvider("Invalid location header".to_string()))?;

        info!(user_id = %user_id, "Keycloak user created");
        Ok(user_id.to_string())
    }

    pub async fn delete_user(&self, user_id: &str) -> Result<()> {
        let token = self.get_admin_token().await?;
        let url = format!("{}/{}", self.users_url(), urlencoding::encode(user_id));

        let response = self
            .http_client
            .delete(&url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| AppError::IdentityProvider(format!("Failed to delete user: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!(
                "User {} not found in Keycloak",
                user_id
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::IdentityProvider(format!(
                "Failed to delete user: {} - {}",
                status, body
            )));
        }

        Ok(())
    }

    /// Page through realm users
    pub async fn list_users(&self, first: u32, max: u32) -> Result<Vec<KeycloakUser>> {
        let token = self.get_admin_token().await?;
        let url = format!(
            "{}?first={}&max={}&briefRepresentation=true",
            self.users_url(),
            first,
            max
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| AppError::IdentityProvider(format!("Failed to list users: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::IdentityProvider(format!(
                "Failed to list users: {} - {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::IdentityProvider(format!("Failed to parse users: {}", e)))
    }

    /// Resolve an end-user access token through the realm's userinfo endpoint
    pub async fn userinfo_subject(&self, access_token: &str) -> Result<String> {
        let url = format!(
            "{}/realms/{}/protocol/openid-connect/userinfo",
            self.config.url, self.config.realm
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::IdentityProvider(format!("Failed to verify token: {}", e)))?;

        match response.status() {
            status if status.is_success() => {
                let info: UserInfo = response.json().await.map_err(|e| {
                    AppError::IdentityProvider(format!("Failed to parse userinfo: {}", e))
                })?;
                debug!(subject = %info.sub, "Token verified");
                Ok(info.sub)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(AppError::Unauthorized("Invalid or expired token".to_string()))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(AppError::IdentityProvider(format!(
                    "Failed to verify token: {} - {}",
                    status, body
                )))
            }
        }
    }
}

#[async_trait]
impl IdentityProvider for KeycloakClient {
    async fn create_user(&self, email: &str, password: &str) -> Result<String> {
        let input = CreateKeycloakUserInput {
            username: email.to_string(),
            email: email.to_string(),
            enabled: true,
            email_verified: true,
            credentials: vec![KeycloakCredential {
                credential_type: "password".to_string(),
                value: password.to_string(),
                temporary: false,
            }],
        };
        KeycloakClient::create_user(self, &input).await
    }

    async fn delete_user(&self, subject_id: &str) -> Result<()> {
        KeycloakClient::delete_user(self, subject_id).await
    }

    async fn verify_token(&self, token: &str) -> Result<String> {
        self.userinfo_subject(token).await
    }

    async fn list_users(&self, first: u32, max: u32) -> Result<Vec<IdentityUser>> {
        let users = KeycloakClient::list_users(self, first, max).await?;
        Ok(users
            .into_iter()
            .filter_map(KeycloakUser::into_identity_user)
            .collect())
    }
}
