//! Analysis job handler.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::{error, info, warn};
use validator::Validate;
use vpat_models::{AnalyzeJob, JobReport, JobStatusUpdate, SourceLocator};
use vpat_store::{RestStore, RestStoreConfig, ResultSink};
use vpat_worker::PatternJobRunner;

use crate::error::{ApiError, ApiResult};
use crate::metrics::{record_job_accepted, record_job_timed_out};
use crate::state::AppState;

/// Run one analysis job and return its report.
///
/// Malformed or invalid descriptors are rejected with 400 before anything is
/// written. Once accepted, the job runs on its own task so a dropped client
/// connection cannot interrupt it halfway through its writes.
pub async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeJob>, JsonRejection>,
) -> ApiResult<Json<JobReport>> {
    let Json(job) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    job.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    SourceLocator::parse(&job.video_url).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let store = RestStore::with_client(
        state.http.clone(),
        RestStoreConfig::from_env(job.store_url.clone(), job.store_key.clone()),
    )
    .map_err(|e| ApiError::bad_request(e.to_string()))?;

    info!(
        match_id = %job.match_id,
        max_patterns = ?job.max_patterns,
        "Analysis requested"
    );
    record_job_accepted();

    let runner = Arc::clone(&state.runner);
    let timeout = state.config.job_timeout;
    let report = tokio::spawn(run_with_timeout(runner, job, store, timeout))
        .await
        .map_err(|e| ApiError::internal(format!("job task failed: {}", e)))?;

    Ok(Json(report))
}

async fn run_with_timeout(
    runner: Arc<PatternJobRunner>,
    job: AnalyzeJob,
    store: RestStore,
    timeout: Duration,
) -> JobReport {
    match tokio::time::timeout(timeout, runner.run(&job, &store)).await {
        Ok(report) => report,
        Err(_) => {
            let message = format!("Job timed out after {:?}", timeout);
            warn!(match_id = %job.match_id, "{}", message);
            record_job_timed_out();

            let update = JobStatusUpdate::failed(job.job_id(), message.clone());
            if let Err(e) = store.write_status(&update).await {
                error!(match_id = %job.match_id, "Failed to write timeout status: {}", e);
            }
            JobReport::error(message)
        }
    }
}
