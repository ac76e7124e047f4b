//! Storage types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage-specific errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A generated summary persisted as a keyed JSON blob alongside its source
/// document. Shares the document's 24-hour lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryDocument {
    pub file_id: String,
    pub summary: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub num_pages: u32,
    pub created_at: DateTime<Utc>,
}
