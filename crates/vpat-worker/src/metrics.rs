//! Job metrics.

use std::time::Duration;

use metrics::{counter, histogram};

/// Metric name constants.
pub mod names {
    /// Finished jobs by outcome and error kind.
    pub const JOBS_TOTAL: &str = "vpat_jobs_total";

    /// Stage duration in seconds by stage.
    pub const STAGE_DURATION_SECONDS: &str = "vpat_stage_duration_seconds";

    /// Windows sampled per job.
    pub const WINDOWS_SAMPLED: &str = "vpat_windows_sampled";

    /// Patterns stored per successful job.
    pub const PATTERNS_STORED: &str = "vpat_patterns_stored";
}

/// Pipeline stages, used as metric and log labels.
pub mod stage {
    pub const ACQUIRE: &str = "acquire";
    pub const SAMPLE: &str = "sample";
    pub const EMBED: &str = "embed";
    pub const CLUSTER: &str = "cluster";
    pub const SELECT: &str = "select";
    pub const STORE: &str = "store";
}

pub fn record_job_success(patterns: usize) {
    counter!(names::JOBS_TOTAL, "outcome" => "success", "error_kind" => "none").increment(1);
    histogram!(names::PATTERNS_STORED).record(patterns as f64);
}

pub fn record_job_failure(error_kind: &'static str) {
    counter!(names::JOBS_TOTAL, "outcome" => "failed", "error_kind" => error_kind).increment(1);
}

pub fn record_stage(stage: &'static str, elapsed: Duration) {
    histogram!(names::STAGE_DURATION_SECONDS, "stage" => stage).record(elapsed.as_secs_f64());
}

pub fn record_windows_sampled(count: usize) {
    histogram!(names::WINDOWS_SAMPLED).record(count as f64);
}
