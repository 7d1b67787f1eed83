//! Worker error types.

use thiserror::Error;
use vpat_embed_client::EmbedError;
use vpat_media::MediaError;
use vpat_store::StoreError;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Message written to the backend when too few windows were sampled.
pub const INSUFFICIENT_WINDOWS_MESSAGE: &str = "Not enough windows sampled from video";

/// Every variant is fatal for the job that raised it.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Source video unreadable: {0}")]
    SourceUnreadable(String),

    #[error("Only {found} windows sampled, at least {required} required")]
    InsufficientWindows { found: usize, required: usize },

    #[error("Embedding failed: {0}")]
    EmbeddingFailed(String),

    #[error("Cannot form {clusters} clusters from {points} points")]
    InsufficientData { points: usize, clusters: usize },

    #[error("Result write failed: {0}")]
    SinkWriteFailed(#[from] StoreError),

    #[error("Source download failed: {0}")]
    SourceFetchFailed(String),

    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn embedding_failed(msg: impl Into<String>) -> Self {
        Self::EmbeddingFailed(msg.into())
    }

    pub fn invalid_job(msg: impl Into<String>) -> Self {
        Self::InvalidJob(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Text stored as the job's `error_message`.
    pub fn user_message(&self) -> String {
        match self {
            WorkerError::InsufficientWindows { .. } => INSUFFICIENT_WINDOWS_MESSAGE.to_string(),
            WorkerError::SourceUnreadable(_) => "Cannot open video".to_string(),
            WorkerError::SourceFetchFailed(_) => "Failed to download source video".to_string(),
            WorkerError::InsufficientData { points, clusters } => format!(
                "Not enough windows to form {} clusters ({} available)",
                clusters, points
            ),
            WorkerError::Internal(_) | WorkerError::Io(_) => {
                "Internal error while analysing video".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerError::SourceUnreadable(_) => "source_unreadable",
            WorkerError::InsufficientWindows { .. } => "insufficient_windows",
            WorkerError::EmbeddingFailed(_) => "embedding_failed",
            WorkerError::InsufficientData { .. } => "insufficient_data",
            WorkerError::SinkWriteFailed(_) => "sink_write_failed",
            WorkerError::SourceFetchFailed(_) => "source_fetch_failed",
            WorkerError::InvalidJob(_) => "invalid_job",
            WorkerError::Config(_) => "config",
            WorkerError::Internal(_) => "internal",
            WorkerError::Io(_) => "io",
        }
    }
}

impl From<MediaError> for WorkerError {
    fn from(err: MediaError) -> Self {
        match err {
            e if e.is_unreadable_source() => WorkerError::SourceUnreadable(e.to_string()),
            e @ (MediaError::DownloadFailed { .. } | MediaError::Network(_)) => {
                WorkerError::SourceFetchFailed(e.to_string())
            }
            MediaError::InvalidParameters(msg) => WorkerError::Config(msg),
            MediaError::Io(e) => WorkerError::Io(e),
            e => WorkerError::Internal(e.to_string()),
        }
    }
}

impl From<EmbedError> for WorkerError {
    fn from(err: EmbedError) -> Self {
        WorkerError::EmbeddingFailed(err.to_string())
    }
}
