//! Checkout session creation
//!
//! Starts a plan purchase: creates a hosted checkout session with the
//! payment provider and returns its URL. The session carries the local user
//! id as metadata so the subscription webhook can attribute the result; the
//! plan itself only changes when that webhook arrives.

use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::current_user;
use crate::billing::CheckoutSessionRequest;
use crate::error::{AppError, Result};
use crate::quota::PlanTier;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub plan: String,
    /// Price in whole currency units.
    pub amount: u64,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub checkout_url: String,
    pub session_id: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(create_checkout))
}

async fn create_checkout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    let user = current_user(&state, &headers).await?;

    if matches!(PlanTier::from_db(&request.plan), PlanTier::Free) {
        return Err(AppError::BadRequest(
            "plan must be one of: starter, standard, premium".to_string(),
        ));
    }
    if request.amount == 0 {
        return Err(AppError::BadRequest("amount is required".to_string()));
    }

    let site_url = state.config().ai.referer.trim_end_matches('/');
    let session = state
        .checkout()
        .create_session(CheckoutSessionRequest {
            amount_cents: request.amount * 100,
            currency: "USD".to_string(),
            customer_email: user.email.clone(),
            success_url: format!("{site_url}/dashboard?success=true"),
            cancel_url: format!("{site_url}/pricing?canceled=true"),
            user_id: user.id.clone(),
            plan: request.plan.clone(),
        })
        .await?;

    tracing::info!(user_id = %user.id, plan = %request.plan, "created checkout session");

    Ok(Json(CheckoutResponse {
        checkout_url: session.url,
        session_id: session.id,
    }))
}
