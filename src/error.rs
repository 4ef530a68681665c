//! Application error taxonomy.
//!
//! All fallible operations return `Result<T, AppError>` instead of using
//! `unwrap()`. `AppError` also implements `axum::response::IntoResponse` so
//! handlers can propagate it with `?` directly.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Main error type for the service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or out-of-range input from a caller.
    #[error("validation error: {0}")]
    Validation(String),

    /// An upstream dependency (arXiv, an LLM provider, TTS) failed in a way
    /// that is expected to resolve itself on retry.
    #[error("transient error: {0}")]
    Transient(String),

    /// An external provider rejected the request outright (bad API key,
    /// quota exhausted, content policy). Not worth retrying.
    #[error("provider rejected request: {0}")]
    ProviderRejection(String),

    /// Referenced entity does not exist or invariants around it are broken.
    #[error("integrity error: {0}")]
    Integrity(String),

    /// The requested state change conflicts with the entity's current state
    /// (e.g. disliking a paper that's already liked without confirmation).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Unrecoverable error; surfaces as a 500 and should page someone.
    #[error("internal error: {0}")]
    Fatal(String),

    /// Database error.
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    /// Outbound HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON (de)serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error (TTS artifact writes).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed XML from an ingestion source.
    #[error("parse error: {0}")]
    Parse(String),

    /// Config error.
    #[error("config error: {0}")]
    Config(String),
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Parse(_) => StatusCode::BAD_REQUEST,
            AppError::Integrity(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ProviderRejection(_) => StatusCode::BAD_GATEWAY,
            AppError::Transient(_) | AppError::Network(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Db(_)
            | AppError::Json(_)
            | AppError::Io(_)
            | AppError::Config(_)
            | AppError::Fatal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "internal error");
        } else {
            tracing::debug!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Extension trait for adding context to `Option` types.
pub trait OptionExt<T> {
    /// Convert `Option` to `Result`, producing an `Integrity` error on `None`.
    fn ok_or_integrity(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_integrity(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| AppError::Integrity(msg.to_string()))
    }
}
