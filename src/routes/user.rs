//! Per-user views: uploaded files and subscription state

use axum::{extract::State, http::HeaderMap, routing::get, Json, Router};
use serde::Serialize;

use crate::auth::current_user;
use crate::db::{FileRecord, FileRepository, SubscriptionRepository};
use crate::error::Result;
use crate::quota::Capability;
use crate::state::AppState;

#[derive(Serialize)]
pub struct FilesResponse {
    pub files: Vec<FileRecord>,
}

#[derive(Serialize)]
pub struct UsageReport {
    pub used: u32,
    /// `null` means unlimited.
    pub limit: Option<u32>,
}

#[derive(Serialize)]
pub struct SubscriptionView {
    pub plan: String,
    pub summaries: UsageReport,
    pub chats: UsageReport,
    pub max_file_size: u64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/files", get(files))
        .route("/subscription", get(subscription))
}

async fn files(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<FilesResponse>> {
    let user = current_user(&state, &headers).await?;
    let mut files = FileRepository::new(state.db())
        .list_for_user(&user.id)
        .await?;

    // Rows awaiting the next reclamation sweep are already expired from the
    // client's point of view.
    let cutoff = (chrono::Utc::now() - chrono::Duration::hours(crate::cleanup::FILE_EXPIRY_HOURS))
        .to_rfc3339();
    files.retain(|f| f.created_at >= cutoff);

    Ok(Json(FilesResponse { files }))
}

async fn subscription(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SubscriptionView>> {
    let user = current_user(&state, &headers).await?;

    let tier = SubscriptionRepository::new(state.db())
        .current_tier(&user.id)
        .await?;

    // The same checks that gate the operations produce the usage report, so
    // the numbers shown always match what enforcement will do.
    let summaries = state
        .quota()
        .check_capability(state.ledger(), &user.id, tier, Capability::Summary)
        .await?;
    let chats = state
        .quota()
        .check_capability(state.ledger(), &user.id, tier, Capability::Chat)
        .await?;

    Ok(Json(SubscriptionView {
        plan: tier.as_str().to_string(),
        summaries: UsageReport {
            used: summaries.used,
            limit: summaries.limit,
        },
        chats: UsageReport {
            used: chats.used,
            limit: chats.limit,
        },
        max_file_size: state.quota().plans().limits(tier).max_file_size,
    }))
}
