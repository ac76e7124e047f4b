//! PDF upload endpoint

use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;

use crate::auth::current_user;
use crate::db::{FileRepository, SubscriptionRepository};
use crate::error::{AppError, Result};
use crate::pdf;
use crate::state::AppState;
use crate::storage::FileStore;

#[derive(Serialize)]
pub struct UploadResponse {
    pub file_id: String,
    pub file_name: String,
    pub file_size: u64,
    pub num_pages: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(upload))
}

async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let user = current_user(&state, &headers).await?;

    let tier = SubscriptionRepository::new(state.db())
        .current_tier(&user.id)
        .await?;

    let (file_name, bytes) = read_file_field(&mut multipart).await?;

    if !pdf::is_pdf(&bytes) {
        return Err(AppError::BadRequest(
            "Only PDF files are supported".to_string(),
        ));
    }

    let size_check = state.quota().check_file_size(tier, bytes.len() as u64);
    if !size_check.allowed {
        return Err(AppError::FileTooLarge {
            max_size: size_check.max_size,
            message: size_check.message.unwrap_or_default(),
        });
    }

    let file_id = FileStore::new_file_id();
    let file_size = bytes.len() as u64;

    // Persist the blob first so parsing does not need a second copy of the
    // bytes; roll it back if the document turns out to be unreadable.
    state.file_store().save_pdf(&file_id, &bytes).await?;
    let parsed = match pdf::parse(bytes).await {
        Ok(parsed) => parsed,
        Err(e) => {
            let _ = state.file_store().delete_pdf(&file_id).await;
            return Err(e.into());
        }
    };

    FileRepository::new(state.db())
        .create(
            &file_id,
            &user.id,
            &file_name,
            file_size as i64,
            parsed.page_count as i64,
            &Utc::now().to_rfc3339(),
        )
        .await?;

    tracing::info!(
        user_id = %user.id,
        file_id = %file_id,
        file_size,
        num_pages = parsed.page_count,
        "uploaded document"
    );

    Ok(Json(UploadResponse {
        file_id,
        file_name,
        file_size,
        num_pages: parsed.page_count,
        title: parsed.title,
        author: parsed.author,
    }))
}

/// Pull the `file` part out of the multipart body.
async fn read_file_field(multipart: &mut Multipart) -> Result<(String, Vec<u8>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .unwrap_or("document.pdf")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("failed to read upload: {e}")))?;

        return Ok((file_name, bytes.to_vec()));
    }

    Err(AppError::BadRequest(
        "missing 'file' field in multipart body".to_string(),
    ))
}
