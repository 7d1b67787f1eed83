//! Analysis job definitions, status transitions and reports.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

/// Default number of patterns kept per job.
pub const DEFAULT_MAX_PATTERNS: usize = 8;

/// Unique identifier for a job.
///
/// The backend stores one row per analysed video; the job id is that row's id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job status as written to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Pipeline is running
    Running,
    /// Patterns were stored
    Done,
    /// Job failed; an error message is attached
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status transition for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JobStatusUpdate {
    pub job_id: JobId,
    pub status: JobStatus,
    /// Human-readable failure reason. Always present for `failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Analysis summary. Only set for `done`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl JobStatusUpdate {
    pub fn running(job_id: JobId) -> Self {
        Self {
            job_id,
            status: JobStatus::Running,
            error_message: None,
            summary: None,
        }
    }

    pub fn done(job_id: JobId, summary: impl Into<String>) -> Self {
        Self {
            job_id,
            status: JobStatus::Done,
            error_message: None,
            summary: Some(summary.into()),
        }
    }

    pub fn failed(job_id: JobId, error_message: impl Into<String>) -> Self {
        Self {
            job_id,
            status: JobStatus::Failed,
            error_message: Some(error_message.into()),
            summary: None,
        }
    }
}

/// Job descriptor accepted by the invocation surface.
///
/// `video_url` is the source locator; `store_url` and `store_key` locate the
/// REST backend that receives status updates and results.
#[derive(Clone, Serialize, Deserialize, Validate, JsonSchema)]
pub struct AnalyzeJob {
    /// Backend row id of the analysed video; doubles as the job id.
    #[validate(length(min = 1, max = 128))]
    pub match_id: String,

    /// `http(s)://` URL, `file://` URL or local path of the source video.
    #[validate(length(min = 1))]
    pub video_url: String,

    /// Base URL of the REST backend.
    #[serde(alias = "supabase_url")]
    #[validate(url)]
    pub store_url: String,

    /// Service key for the REST backend.
    #[serde(alias = "supabase_service_role_key")]
    #[validate(length(min = 1))]
    pub store_key: String,

    /// Number of patterns to keep; the worker default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub max_patterns: Option<usize>,
}

impl AnalyzeJob {
    pub fn job_id(&self) -> JobId {
        JobId::from_string(self.match_id.clone())
    }
}

// The service key must never reach the logs.
impl fmt::Debug for AnalyzeJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzeJob")
            .field("match_id", &self.match_id)
            .field("video_url", &self.video_url)
            .field("store_url", &self.store_url)
            .field("store_key", &"<redacted>")
            .field("max_patterns", &self.max_patterns)
            .finish()
    }
}

/// Outcome status reported to the caller of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Success,
    Error,
}

/// Result of one job run, returned to the invoker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JobReport {
    pub status: ReportStatus,
    /// Number of stored patterns
    pub patterns: usize,
    /// Number of stored pattern examples
    pub examples: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobReport {
    pub fn success(patterns: usize, examples: usize) -> Self {
        Self {
            status: ReportStatus::Success,
            patterns,
            examples,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ReportStatus::Error,
            patterns: 0,
            examples: 0,
            error: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ReportStatus::Success
    }
}
