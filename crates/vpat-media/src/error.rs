//! Error types for media operations.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Cannot open video {path}: {message}")]
    OpenFailed { path: PathBuf, message: String },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Frame decode failed: {0}")]
    DecodeFailed(String),

    #[error("Invalid sampling parameters: {0}")]
    InvalidParameters(String),

    #[error("Download failed: {message}")]
    DownloadFailed { message: String },

    #[error("No video backend available: {0}")]
    BackendUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MediaError {
    /// Create an open failure error.
    pub fn open_failed(path: &Path, message: impl Into<String>) -> Self {
        Self::OpenFailed {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn decode_failed(message: impl Into<String>) -> Self {
        Self::DecodeFailed(message.into())
    }

    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::InvalidParameters(message.into())
    }

    /// Create a download failure error.
    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
        }
    }

    /// True when the source could not be opened at all.
    pub fn is_unreadable_source(&self) -> bool {
        matches!(
            self,
            MediaError::OpenFailed { .. } | MediaError::FileNotFound(_)
        )
    }
}
