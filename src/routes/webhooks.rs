//! Billing provider webhooks
//!
//! The only code path that mutates subscription and payment rows. Every
//! request must carry a valid HMAC-SHA256 signature over the raw body.

use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use sqlx::SqlitePool;

use crate::db::{PaymentRepository, SubscriptionRepository, SubscriptionUpdate};
use crate::error::{AppError, Result};
use crate::state::AppState;

const SIGNATURE_HEADER: &str = "x-webhook-signature";

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct SubscriptionPayload {
    id: String,
    user_id: String,
    customer_id: Option<String>,
    #[serde(default)]
    plan: String,
    status: Option<String>,
    current_period_start: Option<String>,
    current_period_end: Option<String>,
    #[serde(default)]
    cancel_at_period_end: bool,
}

#[derive(Debug, Deserialize)]
struct PaymentPayload {
    id: Option<String>,
    checkout_id: Option<String>,
    /// Amount in minor units (cents).
    amount: i64,
    currency: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/billing", post(billing_webhook))
}

async fn billing_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<serde_json::Value>> {
    let secret = &state.config().billing.webhook_secret;
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing webhook signature".to_string()))?;

    if !verify_signature(secret, body.as_bytes(), signature) {
        return Err(AppError::Unauthorized("invalid webhook signature".to_string()));
    }

    let event: WebhookEvent = serde_json::from_str(&body)
        .map_err(|e| AppError::BadRequest(format!("malformed webhook payload: {e}")))?;

    apply_event(state.db(), &event).await?;

    Ok(Json(json!({ "received": true })))
}

/// HMAC-SHA256 over the raw body, hex-encoded.
///
/// An unconfigured (empty) secret rejects every delivery; anyone can compute
/// an HMAC under the empty key.
fn verify_signature(secret: &str, body: &[u8], provided_hex: &str) -> bool {
    if secret.is_empty() {
        return false;
    }
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);

    let Ok(provided) = hex::decode(provided_hex) else {
        return false;
    };
    mac.verify_slice(&provided).is_ok()
}

/// Dispatch one verified event against the database. Unknown event types are
/// acknowledged without effect.
pub async fn apply_event(pool: &SqlitePool, event: &WebhookEvent) -> Result<()> {
    match event.kind.as_str() {
        "payment.succeeded" | "payment.failed" => {
            let payload: PaymentPayload = serde_json::from_value(event.data.clone())
                .map_err(|e| AppError::BadRequest(format!("malformed payment data: {e}")))?;

            let status = if event.kind == "payment.succeeded" {
                "succeeded"
            } else {
                "failed"
            };
            PaymentRepository::new(pool)
                .insert(
                    payload.id.as_deref(),
                    payload.checkout_id.as_deref(),
                    payload.amount as f64 / 100.0,
                    payload.currency.as_deref().unwrap_or("USD"),
                    status,
                )
                .await?;
        }
        "subscription.created" => {
            let payload: SubscriptionPayload = serde_json::from_value(event.data.clone())
                .map_err(|e| AppError::BadRequest(format!("malformed subscription data: {e}")))?;

            SubscriptionRepository::new(pool)
                .upsert_by_provider_id(
                    &payload.id,
                    &payload.user_id,
                    payload.customer_id.as_deref(),
                    &payload.plan,
                    &update_from(&payload),
                )
                .await?;
            tracing::info!(user_id = %payload.user_id, plan = %payload.plan, "subscription created");
        }
        "subscription.updated" => {
            let payload: SubscriptionPayload = serde_json::from_value(event.data.clone())
                .map_err(|e| AppError::BadRequest(format!("malformed subscription data: {e}")))?;

            let found = SubscriptionRepository::new(pool)
                .update_by_provider_id(&payload.id, &update_from(&payload))
                .await?;
            if !found {
                tracing::warn!(provider_subscription_id = %payload.id, "update for unknown subscription");
            }
        }
        "subscription.canceled" => {
            let payload: SubscriptionPayload = serde_json::from_value(event.data.clone())
                .map_err(|e| AppError::BadRequest(format!("malformed subscription data: {e}")))?;

            SubscriptionRepository::new(pool)
                .cancel_by_provider_id(&payload.id)
                .await?;
            tracing::info!(user_id = %payload.user_id, "subscription canceled");
        }
        other => {
            tracing::info!(kind = %other, "ignoring unhandled webhook event");
        }
    }

    Ok(())
}

fn update_from(payload: &SubscriptionPayload) -> SubscriptionUpdate {
    SubscriptionUpdate {
        status: payload.status.clone().unwrap_or_else(|| "active".to_string()),
        current_period_start: payload.current_period_start.clone(),
        current_period_end: payload.current_period_end.clone(),
        cancel_at_period_end: payload.cancel_at_period_end,
    }
}
