//! Authentication
//!
//! Bearer tokens are verified against an external identity provider; the
//! matching local account is materialized lazily on first contact.

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use thiserror::Error;

use crate::config::AuthConfig;
use crate::db::{User, UserRepository};
use crate::error::Result;
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing credentials")]
    MissingCredentials,
    #[error("unauthorized")]
    Unauthorized,
    #[error("identity provider error: {0}")]
    Provider(String),
}

/// Identity as asserted by the external provider.
#[derive(Debug, Clone)]
pub struct Identity {
    pub external_id: String,
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Token verification seam. The HTTP implementation talks to the real
/// provider; tests swap in a canned one.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, bearer_token: &str) -> std::result::Result<Identity, AuthError>;
}

/// Identity provider backed by a GoTrue-compatible HTTP endpoint.
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    provider_url: String,
    anon_key: String,
}

impl HttpIdentityProvider {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            provider_url: config.provider_url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn resolve(&self, bearer_token: &str) -> std::result::Result<Identity, AuthError> {
        let url = format!("{}/auth/v1/user", self.provider_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(bearer_token)
            .header("apikey", &self.anon_key)
            .send()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AuthError::Unauthorized);
        }
        if !response.status().is_success() {
            return Err(AuthError::Provider(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        let external_id = payload["id"]
            .as_str()
            .ok_or_else(|| AuthError::Provider("user payload missing id".to_string()))?
            .to_string();
        let email = payload["email"]
            .as_str()
            .ok_or_else(|| AuthError::Provider("user payload missing email".to_string()))?
            .to_string();

        let metadata = &payload["user_metadata"];
        let name = metadata["full_name"]
            .as_str()
            .or_else(|| metadata["name"].as_str())
            .map(|s| s.to_string());
        let avatar_url = metadata["avatar_url"].as_str().map(|s| s.to_string());

        Ok(Identity {
            external_id,
            email,
            name,
            avatar_url,
        })
    }
}

/// Extract the bearer token from the Authorization header.
pub fn bearer_token(headers: &HeaderMap) -> std::result::Result<&str, AuthError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingCredentials)
}

/// Resolve the request's user: verify the token, then look up or create the
/// local account.
pub async fn current_user(state: &AppState, headers: &HeaderMap) -> Result<User> {
    let token = bearer_token(headers)?;
    let identity = state.identity().resolve(token).await?;

    let repo = UserRepository::new(state.db());
    let user = repo.find_or_create(&identity).await?;

    Ok(user)
}
