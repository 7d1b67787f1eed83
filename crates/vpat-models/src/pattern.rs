//! Pattern discovery results.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A `[start_sec, end_sec]` span of the source video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TimeRange {
    pub start_sec: f64,
    pub end_sec: f64,
}

impl TimeRange {
    pub fn new(start_sec: f64, end_sec: f64) -> Self {
        Self { start_sec, end_sec }
    }

    pub fn duration(&self) -> f64 {
        self.end_sec - self.start_sec
    }
}

/// Number of windows assigned to one cluster label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClusterStats {
    pub label: usize,
    pub count: usize,
}

/// A frequently recurring cluster, ranked by frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Pattern {
    /// 1-based rank; rank 1 is the most frequent cluster
    pub rank: usize,
    pub title: String,
    pub summary: String,
    /// In `[0.5, 0.95]`
    pub confidence: f64,
    /// Raw cluster label this pattern was built from
    pub label: usize,
    /// Number of windows in the cluster
    pub count: usize,
}

/// A window time range belonging to a retained pattern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PatternExample {
    pub pattern_rank: usize,
    pub start_sec: f64,
    pub end_sec: f64,
}

impl PatternExample {
    pub fn time_range(&self) -> TimeRange {
        TimeRange::new(self.start_sec, self.end_sec)
    }
}

/// Identifier generated by the backend for a stored pattern row.
///
/// Backends hand out either uuids or serial integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum PatternId {
    Number(i64),
    Text(String),
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternId::Number(n) => write!(f, "{}", n),
            PatternId::Text(s) => f.write_str(s),
        }
    }
}
