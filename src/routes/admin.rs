//! Admin endpoints
//!
//! Guarded by a static bearer secret rather than user auth, intended for an
//! external cron trigger.

use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};

use crate::auth::bearer_token;
use crate::cleanup::{run_once, CleanupReport};
use crate::error::{AppError, Result};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/cleanup", post(trigger_cleanup))
}

async fn trigger_cleanup(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CleanupReport>> {
    let secret = &state.config().billing.admin_secret;
    let token = bearer_token(&headers)
        .map_err(|_| AppError::Unauthorized("admin secret required".to_string()))?;

    if secret.is_empty() || token != secret {
        return Err(AppError::Unauthorized("invalid admin secret".to_string()));
    }

    let report = run_once(state.db(), state.file_store()).await;
    Ok(Json(report))
}
