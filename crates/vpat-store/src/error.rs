//! Store error types.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while writing to the result backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Row not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after_ms: Option<u64>,
    },

    #[error("Server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Write rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Classify a non-success HTTP status.
    pub fn from_http_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            429 => Self::RateLimited {
                message,
                retry_after_ms: None,
            },
            500..=599 => Self::ServerError { status, message },
            _ => Self::Rejected { status, message },
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Network(_) | StoreError::RateLimited { .. } | StoreError::ServerError { .. }
        )
    }

    /// Delay requested by the server, if any.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            StoreError::RateLimited { retry_after_ms, .. } => *retry_after_ms,
            _ => None,
        }
    }

    /// HTTP status associated with the error, for metrics.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            StoreError::NotFound(_) => Some(404),
            StoreError::Conflict(_) => Some(409),
            StoreError::RateLimited { .. } => Some(429),
            StoreError::ServerError { status, .. } | StoreError::Rejected { status, .. } => {
                Some(*status)
            }
            StoreError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
