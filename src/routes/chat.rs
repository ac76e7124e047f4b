//! Document question answering

use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::ai::chat::answer;
use crate::ai::ChatMessage;
use crate::auth::current_user;
use crate::db::SubscriptionRepository;
use crate::error::{AppError, Result};
use crate::pdf;
use crate::quota::Capability;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub file_id: String,
    pub question: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub file_id: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(ask))
}

async fn ask(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    if request.question.trim().is_empty() {
        return Err(AppError::BadRequest("Question must not be empty".to_string()));
    }

    let user = current_user(&state, &headers).await?;
    let record = super::owned_file(&state, &user.id, &request.file_id).await?;

    let tier = SubscriptionRepository::new(state.db())
        .current_tier(&user.id)
        .await?;

    let check = state
        .quota()
        .check_capability(state.ledger(), &user.id, tier, Capability::Chat)
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

    let model = request
        .model
        .as_deref()
        .unwrap_or(&state.config().ai.default_model);
    let reply = answer(
        state.backend(),
        &request.question,
        &parsed.text,
        &request.history,
        model,
    )
    .await?;

    state
        .quota()
        .record_usage(state.ledger(), &user.id, Capability::Chat, Some(&record.id))
        .await?;

    Ok(Json(ChatResponse {
        answer: reply,
        file_id: record.id,
    }))
}
