//! Result sink trait.

use async_trait::async_trait;
use vpat_models::{JobId, JobStatusUpdate, Pattern, PatternId};

use crate::error::StoreResult;
use crate::types::ExampleRow;

/// Destination for job status transitions and mined patterns.
///
/// Pattern inserts return backend-generated ids in input order; example rows
/// reference those ids. A rejected write is an error, never a partial success.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Write a status transition for a job.
    async fn write_status(&self, update: &JobStatusUpdate) -> StoreResult<()>;

    /// Insert pattern rows for a job, returning their ids in input order.
    async fn insert_patterns(
        &self,
        job_id: &JobId,
        patterns: &[Pattern],
    ) -> StoreResult<Vec<PatternId>>;

    /// Insert example rows, returning the number stored.
    async fn insert_examples(&self, examples: &[ExampleRow]) -> StoreResult<usize>;
}
