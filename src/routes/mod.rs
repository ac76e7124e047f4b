//! HTTP route handlers

pub mod admin;
pub mod chat;
pub mod checkout;
pub mod health;
pub mod summarize;
pub mod upload;
pub mod user;
pub mod webhooks;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::db::{FileRecord, FileRepository};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Assemble the full application router.
pub fn app(state: AppState) -> Router {
    // Body limit sized to the most permissive plan; per-plan enforcement
    // happens in the upload handler.
    let body_limit = state.quota().plans().max_file_size_any_tier() as usize + 1024 * 1024;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .nest("/health", health::router())
        .nest("/upload", upload::router())
        .nest("/summarize", summarize::generate_router())
        .nest("/summary", summarize::fetch_router())
        .nest("/chat", chat::router())
        .nest("/checkout", checkout::router())
        .nest("/user", user::router())
        .nest("/webhooks", webhooks::router())
        .nest("/admin", admin::router());

    Router::new()
        .nest("/health", health::router())
        .nest("/api/v1", api)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Fetch a file row and enforce that it belongs to `user_id`.
///
/// A missing row reads as an expired document (404); someone else's row is
/// an access-denied (403).
pub(crate) async fn owned_file(
    state: &AppState,
    user_id: &str,
    file_id: &str,
) -> Result<FileRecord> {
    let record = FileRepository::new(state.db())
        .get(file_id)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found or expired".to_string()))?;

    if record.user_id != user_id {
        return Err(AppError::AccessDenied(
            "You do not have access to this file".to_string(),
        ));
    }

    Ok(record)
}
