//! Job orchestration.
//!
//! One job runs one video end-to-end:
//! running → acquire source → sample → guard → embed → cluster → select →
//! insert patterns → insert examples → done.
//! Any failure is reported through the sink as `failed` with a readable
//! message. Nothing is retried here and written rows are never rolled back.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tempfile::TempDir;
use tracing::Instrument;
use validator::Validate;
use vpat_embed_client::EmbeddingProvider;
use vpat_media::{download_video, sample_video, VideoBackend};
use vpat_models::{
    AnalyzeJob, JobId, JobReport, JobStatusUpdate, PatternId, SourceLocator, TimeRange,
};
use vpat_store::{ExampleRow, ResultSink, StoreError};

use crate::clustering::{choose_k, KMeans};
use crate::config::WorkerConfig;
use crate::embedding::embed_windows;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics::{
    record_job_failure, record_job_success, record_stage, record_windows_sampled, stage,
};
use crate::selection::{analysis_summary, select_patterns};

const OPERATION: &str = "pattern_mining";
const SOURCE_FILE_NAME: &str = "source.mp4";

/// Local copy of the source video. A downloaded copy is deleted on drop.
struct AcquiredSource {
    path: PathBuf,
    _dir: Option<TempDir>,
}

impl AcquiredSource {
    fn path(&self) -> &Path {
        &self.path
    }
}

/// Counts of rows stored by a successful run.
#[derive(Debug, Clone, Copy)]
struct Stored {
    patterns: usize,
    examples: usize,
}

/// Runs pattern mining jobs.
pub struct PatternJobRunner {
    config: WorkerConfig,
    video_backend: Arc<dyn VideoBackend>,
    provider: Arc<dyn EmbeddingProvider>,
    http: reqwest::Client,
    kmeans: KMeans,
}

impl PatternJobRunner {
    pub fn new(
        config: WorkerConfig,
        video_backend: Arc<dyn VideoBackend>,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> WorkerResult<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(config.download_timeout)
            .user_agent(concat!("vpat-worker/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WorkerError::config(format!("failed to build HTTP client: {}", e)))?;
        let kmeans = KMeans::new(config.kmeans_config());

        Ok(Self {
            config,
            video_backend,
            provider,
            http,
            kmeans,
        })
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Run one job to completion, reporting its outcome through `sink`.
    ///
    /// Exactly one terminal status is attempted. When the `done` write
    /// itself fails the job is reported failed instead.
    pub async fn run(&self, job: &AnalyzeJob, sink: &dyn ResultSink) -> JobReport {
        let job_id = job.job_id();
        let logger = JobLogger::new(&job_id, OPERATION);
        let span = logger.create_span();

        async {
            logger.log_start(&format!("max_patterns={:?}", job.max_patterns));

            let stored = match self.execute(job, &job_id, sink, &logger).await {
                Ok(stored) => stored,
                Err(e) => return self.fail(&job_id, sink, &logger, e).await,
            };

            let done = JobStatusUpdate::done(job_id.clone(), analysis_summary(stored.patterns));
            if let Err(e) = sink.write_status(&done).await {
                return self.fail(&job_id, sink, &logger, e.into()).await;
            }

            logger.log_completion(&format!(
                "{} patterns, {} examples",
                stored.patterns, stored.examples
            ));
            record_job_success(stored.patterns);
            JobReport::success(stored.patterns, stored.examples)
        }
        .instrument(span)
        .await
    }

    async fn fail(
        &self,
        job_id: &JobId,
        sink: &dyn ResultSink,
        logger: &JobLogger,
        error: WorkerError,
    ) -> JobReport {
        let message = error.user_message();
        logger.log_error(&format!("{} ({})", error, error.kind()));
        record_job_failure(error.kind());

        let failed = JobStatusUpdate::failed(job_id.clone(), message.clone());
        if let Err(e) = sink.write_status(&failed).await {
            logger.log_error(&format!("Failed to write failed status: {}", e));
        }

        JobReport::error(message)
    }

    async fn execute(
        &self,
        job: &AnalyzeJob,
        job_id: &JobId,
        sink: &dyn ResultSink,
        logger: &JobLogger,
    ) -> WorkerResult<Stored> {
        job.validate()
            .map_err(|e| WorkerError::invalid_job(e.to_string()))?;
        let requested = job.max_patterns.unwrap_or(self.config.default_max_patterns);
        let max_patterns = NonZeroUsize::new(requested)
            .ok_or_else(|| WorkerError::invalid_job("max_patterns must be at least 1"))?;
        let params = self.config.sampling_params()?;

        sink.write_status(&JobStatusUpdate::running(job_id.clone()))
            .await?;

        let started = Instant::now();
        let source = self.acquire_source(&job.video_url).await?;
        self.finish_stage(logger, stage::ACQUIRE, started, &source.path().display().to_string());

        let started = Instant::now();
        let backend = Arc::clone(&self.video_backend);
        let path = source.path().to_path_buf();
        let windows = tokio::task::spawn_blocking(move || {
            sample_video(backend.as_ref(), &path, &params)
        })
        .await
        .map_err(|e| WorkerError::internal(format!("sampling task failed: {}", e)))??;
        drop(source);
        record_windows_sampled(windows.len());
        self.finish_stage(logger, stage::SAMPLE, started, &format!("{} windows", windows.len()));

        if windows.len() < self.config.min_windows {
            return Err(WorkerError::InsufficientWindows {
                found: windows.len(),
                required: self.config.min_windows,
            });
        }

        let started = Instant::now();
        let ranges: Vec<TimeRange> = windows.iter().map(|w| w.time_range()).collect();
        let embeddings = embed_windows(&windows, self.provider.as_ref()).await?;
        drop(windows);
        self.finish_stage(
            logger,
            stage::EMBED,
            started,
            &format!("{} embeddings via {}", embeddings.len(), self.provider.name()),
        );

        let started = Instant::now();
        let k = choose_k(embeddings.len());
        let labels = self.kmeans.fit(&embeddings, k)?;
        self.finish_stage(logger, stage::CLUSTER, started, &format!("k={}", k));

        let started = Instant::now();
        let selection = select_patterns(&ranges, &labels, max_patterns)?;
        self.finish_stage(
            logger,
            stage::SELECT,
            started,
            &format!(
                "{} of {} clusters kept",
                selection.patterns.len(),
                selection.stats.len()
            ),
        );

        let started = Instant::now();
        let ids = sink.insert_patterns(job_id, &selection.patterns).await?;
        if ids.len() != selection.patterns.len() {
            return Err(StoreError::invalid_response(format!(
                "expected {} pattern ids, got {}",
                selection.patterns.len(),
                ids.len()
            ))
            .into());
        }

        let rows = example_rows(&ids, &selection.examples)?;
        let examples = if rows.is_empty() {
            0
        } else {
            sink.insert_examples(&rows).await?
        };
        self.finish_stage(
            logger,
            stage::STORE,
            started,
            &format!("{} patterns, {} examples", ids.len(), examples),
        );

        Ok(Stored {
            patterns: ids.len(),
            examples,
        })
    }

    fn finish_stage(&self, logger: &JobLogger, name: &'static str, started: Instant, message: &str) {
        let elapsed = started.elapsed();
        record_stage(name, elapsed);
        logger.log_stage(name, elapsed, message);
    }

    async fn acquire_source(&self, video_url: &str) -> WorkerResult<AcquiredSource> {
        let locator =
            SourceLocator::parse(video_url).map_err(|e| WorkerError::invalid_job(e.to_string()))?;

        match locator {
            SourceLocator::Local(path) => Ok(AcquiredSource { path, _dir: None }),
            SourceLocator::Remote(url) => {
                tokio::fs::create_dir_all(&self.config.work_dir).await?;
                let dir = tempfile::Builder::new()
                    .prefix("job-")
                    .tempdir_in(&self.config.work_dir)?;
                let path = dir.path().join(SOURCE_FILE_NAME);

                download_video(&self.http, &url, &path)
                    .await
                    .map_err(|e| WorkerError::SourceFetchFailed(e.to_string()))?;

                Ok(AcquiredSource {
                    path,
                    _dir: Some(dir),
                })
            }
        }
    }
}

/// Attach backend ids to examples; ranks are 1-based positions in `ids`.
fn example_rows(
    ids: &[PatternId],
    examples: &[vpat_models::PatternExample],
) -> WorkerResult<Vec<ExampleRow>> {
    examples
        .iter()
        .map(|example| {
            let pattern_id = example
                .pattern_rank
                .checked_sub(1)
                .and_then(|i| ids.get(i))
                .ok_or_else(|| {
                    WorkerError::internal(format!(
                        "example references unknown pattern rank {}",
                        example.pattern_rank
                    ))
                })?;
            Ok(ExampleRow {
                pattern_id: pattern_id.clone(),
                start_sec: example.start_sec,
                end_sec: example.end_sec,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vpat_models::PatternExample;

    #[test]
    fn test_example_rows_map_ranks_to_ids() {
        let ids = vec![PatternId::Number(40), PatternId::Text("b".into())];
        let examples = vec![
            PatternExample {
                pattern_rank: 2,
                start_sec: 0.0,
                end_sec: 8.0,
            },
            PatternExample {
                pattern_rank: 1,
                start_sec: 20.0,
                end_sec: 28.0,
            },
        ];

        let rows = example_rows(&ids, &examples).unwrap();
        assert_eq!(rows[0].pattern_id, PatternId::Text("b".into()));
        assert_eq!(rows[1].pattern_id, PatternId::Number(40));
        assert_eq!(rows[1].start_sec, 20.0);
    }

    #[test]
    fn test_example_rows_reject_unknown_rank() {
        let examples = vec![PatternExample {
            pattern_rank: 3,
            start_sec: 0.0,
            end_sec: 8.0,
        }];
        assert!(example_rows(&[PatternId::Number(1)], &examples).is_err());
    }
}
