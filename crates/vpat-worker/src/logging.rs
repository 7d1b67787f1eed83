//! Structured job logging.
//!
//! Every event carries the job id and operation so a single job can be
//! followed through the logs.

use std::time::Duration;

use tracing::{error, info, Span};
use vpat_models::JobId;

/// Job logger stamping events with job context.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: String,
}

impl JobLogger {
    pub fn new(job_id: &JobId, operation: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job started: {}", message
        );
    }

    /// Log a finished pipeline stage with its duration.
    pub fn log_stage(&self, stage: &str, elapsed: Duration, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            stage,
            elapsed_ms = elapsed.as_millis() as u64,
            "Stage {} done: {}", stage, message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job completed: {}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span wrapping the whole job.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            operation = %self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_logger_context() {
        let job_id = JobId::from_string("match-42");
        let logger = JobLogger::new(&job_id, "pattern_mining");

        assert_eq!(logger.job_id(), "match-42");
        assert_eq!(logger.operation(), "pattern_mining");
    }

    #[test]
    fn test_logging_without_subscriber_is_silent() {
        let logger = JobLogger::new(&JobId::from_string("m"), "pattern_mining");
        logger.log_stage("sample", Duration::from_millis(12), "12 windows");
        let _guard = logger.create_span().entered();
        logger.log_completion("ok");
    }
}
