//! Embedding client error types.

use thiserror::Error;

pub type EmbedResult<T> = Result<T, EmbedError>;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("Embedding service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Image encoding failed: {0}")]
    Encode(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EmbedError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EmbedError::ServiceUnavailable(_) | EmbedError::Network(_)
        )
    }

    /// Classify a non-success HTTP status.
    pub fn from_http_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            429 | 502 | 503 | 504 => {
                Self::ServiceUnavailable(format!("HTTP {}: {}", status, body))
            }
            _ => Self::RequestFailed(format!("HTTP {}: {}", status, body)),
        }
    }
}
