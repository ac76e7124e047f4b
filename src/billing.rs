//! Billing provider integration
//!
//! Outbound half of the billing loop: creates hosted checkout sessions with
//! the payment provider. The inbound half (webhooks mutating subscription
//! rows) lives in `routes::webhooks`; request-serving code never mutates
//! billing state directly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::BillingConfig;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("provider returned a malformed response")]
    MalformedResponse,

    #[error("billing is not configured: {0}")]
    NotConfigured(String),
}

/// Inputs for one hosted checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    /// Amount in minor units (cents).
    pub amount_cents: u64,
    pub currency: String,
    pub customer_email: String,
    pub success_url: String,
    pub cancel_url: String,
    /// Carried as session metadata so the webhook can attribute the
    /// resulting subscription to a local account.
    pub user_id: String,
    pub plan: String,
}

/// A created checkout session: the id and the hosted payment page URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Checkout seam. The HTTP implementation talks to the real provider; tests
/// swap in a canned one.
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    async fn create_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, BillingError>;
}

/// Checkout provider backed by the payment provider's HTTP API.
pub struct HttpCheckoutProvider {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl HttpCheckoutProvider {
    pub fn new(config: &BillingConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl CheckoutProvider for HttpCheckoutProvider {
    async fn create_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, BillingError> {
        if self.api_key.is_empty() {
            return Err(BillingError::NotConfigured(
                "BILLING_API_KEY is not set".to_string(),
            ));
        }

        let url = format!("{}/checkout/sessions", self.api_base);
        let body = serde_json::json!({
            "amount": request.amount_cents,
            "currency": request.currency,
            "customer_email": request.customer_email,
            "success_url": request.success_url,
            "cancel_url": request.cancel_url,
            "metadata": {
                "user_id": request.user_id,
                "plan": request.plan,
            },
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BillingError::Api { status, body });
        }

        let payload: serde_json::Value = response.json().await?;

        let id = payload["id"].as_str();
        let session_url = payload["url"].as_str();
        match (id, session_url) {
            (Some(id), Some(url)) => Ok(CheckoutSession {
                id: id.to_string(),
                url: url.to_string(),
            }),
            _ => Err(BillingError::MalformedResponse),
        }
    }
}
