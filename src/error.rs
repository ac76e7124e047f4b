//! Error types for the PDF Summarizer server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::ai::BackendError;
use crate::auth::AuthError;
use crate::billing::BillingError;
use crate::pdf::ParseError;
use crate::quota::LedgerError;
use crate::storage::StorageError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
///
/// Quota denials and authentication failures are deliberately distinct
/// variants so clients can tell "sign in" apart from "upgrade your plan".
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("{message}")]
    QuotaExceeded {
        used: u32,
        limit: u32,
        message: String,
    },

    #[error("{message}")]
    FileTooLarge { max_size: u64, message: String },

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("PDF parsing failed: {0}")]
    Parse(#[from] ParseError),

    #[error("AI backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Billing error: {0}")]
    Billing(#[from] BillingError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Usage ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials | AuthError::Unauthorized => {
                AppError::Unauthorized(err.to_string())
            }
            AuthError::Provider(msg) => AppError::Internal(format!("identity provider: {msg}")),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Unauthorized(_) => (
                StatusCode::UNAUTHORIZED,
                json!({
                    "error": "unauthorized",
                    "message": "Please sign in to continue",
                    "requires_auth": true,
                }),
            ),
            AppError::QuotaExceeded {
                used,
                limit,
                message,
            } => (
                StatusCode::FORBIDDEN,
                json!({
                    "error": "quota_exceeded",
                    "message": message,
                    "used": used,
                    "limit": limit,
                    "upgrade_required": true,
                }),
            ),
            AppError::FileTooLarge { max_size, message } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                json!({
                    "error": "file_too_large",
                    "message": message,
                    "max_size": max_size,
                    "upgrade_required": true,
                }),
            ),
            AppError::AccessDenied(msg) => (
                StatusCode::FORBIDDEN,
                json!({ "error": "access_denied", "message": msg }),
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                json!({ "error": "not_found", "message": msg }),
            ),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "bad_request", "message": msg }),
            ),
            AppError::Parse(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": "parse_error",
                    "message": format!("Invalid or corrupted PDF file: {e}"),
                }),
            ),
            AppError::Backend(e) => {
                tracing::error!("AI backend error: {}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    json!({
                        "error": "backend_error",
                        "message": format!("Generation failed: {e}"),
                    }),
                )
            }
            AppError::Billing(e) => {
                tracing::error!("Billing error: {}", e);
                let status = match e {
                    BillingError::NotConfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (
                    status,
                    json!({
                        "error": "billing_error",
                        "message": "Checkout failed",
                    }),
                )
            }
            AppError::Storage(e) => match e {
                StorageError::NotFound(key) => (
                    StatusCode::NOT_FOUND,
                    json!({
                        "error": "not_found",
                        "message": format!("Object not found: {key}"),
                    }),
                ),
                _ => {
                    tracing::error!("Storage error: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        json!({ "error": "storage_error", "message": "Storage error" }),
                    )
                }
            },
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "database_error", "message": "Database error" }),
                )
            }
            AppError::Ledger(e) => {
                tracing::error!("Usage ledger error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "ledger_error", "message": "Usage accounting error" }),
                )
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "io_error", "message": "IO error" }),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "internal_error",
                        "message": "An internal error occurred",
                    }),
                )
            }
        };

        let mut body = body;
        if cfg!(debug_assertions) {
            body["details"] = json!(self.to_string());
        }

        (status, Json(body)).into_response()
    }
}
