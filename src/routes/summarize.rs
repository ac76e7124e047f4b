//! Summary generation and retrieval

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;

use crate::ai::summarize::summarize;
use crate::auth::current_user;
use crate::db::SubscriptionRepository;
use crate::error::{AppError, Result};
use crate::pdf;
use crate::quota::Capability;
use crate::state::AppState;
use crate::storage::SummaryDocument;

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub file_id: String,
    pub model: Option<String>,
}

pub fn generate_router() -> Router<AppState> {
    Router::new().route("/", post(generate))
}

pub fn fetch_router() -> Router<AppState> {
    Router::new().route("/:file_id", get(fetch))
}

async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SummarizeRequest>,
) -> Result<Json<SummaryDocument>> {
    let user = current_user(&state, &headers).await?;
    let record = super::owned_file(&state, &user.id, &request.file_id).await?;

    let tier = SubscriptionRepository::new(state.db())
        .current_tier(&user.id)
        .await?;

    let check = state
        .quota()
        .check_capability(state.ledger(), &user.id, tier, Capability::Summary)
        .await?;
    if !check.allowed {
        return Err(AppError::QuotaExceeded {
            used: check.used,
            limit: check.limit.unwrap_or(0),
            message: check.message.unwrap_or_default(),
        });
    }

    let bytes = state.file_store().read_pdf(&record.id).await?;
    let parsed = pdf::parse(bytes).await?;

    if parsed.text.trim().is_empty() {
        return Err(AppError::BadRequest(
            "No extractable text in this document".to_string(),
        ));
    }

    let model = request
        .model
        .as_deref()
        .unwrap_or(&state.config().ai.default_model);
    let summary = summarize(state.backend(), &parsed.text, model).await?;

    let document = SummaryDocument {
        file_id: record.id.clone(),
        summary,
        title: parsed.title,
        author: parsed.author,
        num_pages: parsed.page_count,
        created_at: Utc::now(),
    };
    state.file_store().save_summary(&record.id, &document).await?;

    // Recorded only after the summary is persisted, so a failed generation
    // never burns quota.
    state
        .quota()
        .record_usage(state.ledger(), &user.id, Capability::Summary, Some(&record.id))
        .await?;

    tracing::info!(user_id = %user.id, file_id = %record.id, "generated summary");

    Ok(Json(document))
}

async fn fetch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(file_id): Path<String>,
) -> Result<Json<SummaryDocument>> {
    let user = current_user(&state, &headers).await?;
    let record = super::owned_file(&state, &user.id, &file_id).await?;

    let document = state.file_store().read_summary(&record.id).await?;
    Ok(Json(document))
}
