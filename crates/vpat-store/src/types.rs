//! Row shapes exchanged with the REST backend.

use serde::{Deserialize, Serialize};
use vpat_models::{JobStatus, JobStatusUpdate, Pattern, PatternId};

/// Side attribution written on every pattern row. Mining does not know which
/// side a pattern belongs to.
pub const UNKNOWN_SIDE: &str = "unknown";

/// Body of a status PATCH against the jobs table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusPatch<'a> {
    pub status: &'a str,
    /// `Some(None)` serializes as `null` and clears a stale message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<Option<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_summary: Option<&'a str>,
}

impl<'a> From<&'a JobStatusUpdate> for StatusPatch<'a> {
    fn from(update: &'a JobStatusUpdate) -> Self {
        let error_message = match update.status {
            JobStatus::Running => Some(None),
            JobStatus::Failed => Some(update.error_message.as_deref()),
            JobStatus::Done => None,
        };

        Self {
            status: update.status.as_str(),
            error_message,
            analysis_summary: update.summary.as_deref(),
        }
    }
}

/// Pattern row as inserted into the patterns table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternRow<'a> {
    pub match_id: &'a str,
    pub side: &'a str,
    pub title: &'a str,
    pub summary: &'a str,
    pub confidence: f64,
}

impl<'a> PatternRow<'a> {
    pub fn new(match_id: &'a str, pattern: &'a Pattern) -> Self {
        Self {
            match_id,
            side: UNKNOWN_SIDE,
            title: &pattern.title,
            summary: &pattern.summary,
            confidence: pattern.confidence,
        }
    }
}

/// Example row referencing a stored pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleRow {
    pub pattern_id: PatternId,
    pub start_sec: f64,
    pub end_sec: f64,
}

/// Minimal projection of an inserted row.
#[derive(Debug, Clone, Deserialize)]
pub struct InsertedRow {
    pub id: PatternId,
}
