//! End-to-end pipeline scenarios against in-memory fakes.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::Rgb;
use serial_test::serial;
use vpat_embed_client::{EmbedError, EmbedResult, EmbeddingProvider};
use vpat_media::{Frame, MediaError, MediaResult, VideoBackend, VideoSource};
use vpat_models::{AnalyzeJob, JobId, JobStatus, JobStatusUpdate, Pattern, PatternId, ReportStatus};
use vpat_store::{ExampleRow, ResultSink, StoreError, StoreResult};
use vpat_worker::{PatternJobRunner, WorkerConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STRIDE: f64 = 20.0;
const DIMENSION: usize = 8;

/// Video whose window `i` shows scene `groups[i]`; windows listed in `blank`
/// decode nothing.
struct SceneSource {
    groups: Vec<usize>,
    blank: Vec<usize>,
}

impl VideoSource for SceneSource {
    fn fps(&self) -> Option<f64> {
        Some(1.0)
    }

    fn frame_count(&self) -> Option<u64> {
        Some(self.groups.len() as u64 * STRIDE as u64)
    }

    fn read_frame_at(&mut self, position_sec: f64) -> MediaResult<Option<Frame>> {
        let window = (position_sec / STRIDE) as usize;
        if self.blank.contains(&window) {
            return Ok(None);
        }
        let group = self.groups[window] as u8;
        Ok(Some(Frame::from_pixel(2, 2, Rgb([group, 0, 0]))))
    }
}

struct SceneBackend {
    groups: Vec<usize>,
    blank: Vec<usize>,
    require_file: bool,
    unreadable: bool,
}

impl SceneBackend {
    fn new(groups: Vec<usize>) -> Self {
        Self {
            groups,
            blank: Vec::new(),
            require_file: false,
            unreadable: false,
        }
    }
}

impl VideoBackend for SceneBackend {
    fn open(&self, path: &Path) -> MediaResult<Box<dyn VideoSource>> {
        if self.unreadable {
            return Err(MediaError::open_failed(path, "unsupported codec"));
        }
        if self.require_file && !path.is_file() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }
        Ok(Box::new(SceneSource {
            groups: self.groups.clone(),
            blank: self.blank.clone(),
        }))
    }

    fn name(&self) -> &'static str {
        "scenes"
    }
}

/// One-hot embedding of the scene encoded in each frame.
struct SceneProvider {
    fail: bool,
}

#[async_trait]
impl EmbeddingProvider for SceneProvider {
    async fn embed_images(&self, images: &[Frame]) -> EmbedResult<Vec<Vec<f32>>> {
        if self.fail {
            return Err(EmbedError::ServiceUnavailable("model not loaded".into()));
        }
        Ok(images
            .iter()
            .map(|frame| {
                let mut v = vec![0.0; DIMENSION];
                v[frame.get_pixel(0, 0).0[0] as usize] = 1.0;
                v
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "scenes"
    }
}

#[derive(Default)]
struct RecordingSink {
    statuses: Mutex<Vec<JobStatusUpdate>>,
    patterns: Mutex<Vec<Pattern>>,
    examples: Mutex<Vec<ExampleRow>>,
    fail_examples: bool,
    fail_done: bool,
}

impl RecordingSink {
    fn statuses(&self) -> Vec<JobStatusUpdate> {
        self.statuses.lock().unwrap().clone()
    }

    fn status_sequence(&self) -> Vec<JobStatus> {
        self.statuses().iter().map(|s| s.status).collect()
    }
}

#[async_trait]
impl ResultSink for RecordingSink {
    async fn write_status(&self, update: &JobStatusUpdate) -> StoreResult<()> {
        self.statuses.lock().unwrap().push(update.clone());
        if self.fail_done && update.status == JobStatus::Done {
            return Err(StoreError::from_http_status(503, "backend down"));
        }
        Ok(())
    }

    async fn insert_patterns(
        &self,
        _job_id: &JobId,
        patterns: &[Pattern],
    ) -> StoreResult<Vec<PatternId>> {
        let mut stored = self.patterns.lock().unwrap();
        let first = stored.len() as i64;
        stored.extend_from_slice(patterns);
        Ok((0..patterns.len() as i64)
            .map(|i| PatternId::Number(100 + first + i))
            .collect())
    }

    async fn insert_examples(&self, examples: &[ExampleRow]) -> StoreResult<usize> {
        if self.fail_examples {
            return Err(StoreError::from_http_status(400, "bad foreign key"));
        }
        self.examples.lock().unwrap().extend_from_slice(examples);
        Ok(examples.len())
    }
}

fn job(video_url: &str, max_patterns: usize) -> AnalyzeJob {
    AnalyzeJob {
        match_id: "match-1".to_string(),
        video_url: video_url.to_string(),
        store_url: "http://localhost:54321".to_string(),
        store_key: "service-key".to_string(),
        max_patterns: Some(max_patterns),
    }
}

/// Twelve windows in four scenes of sizes 5/4/2/1, interleaved in time.
fn twelve_windows() -> Vec<usize> {
    vec![0, 1, 0, 2, 1, 0, 3, 1, 0, 2, 1, 0]
}

fn runner(backend: SceneBackend, provider: SceneProvider, work_dir: &Path) -> PatternJobRunner {
    let config = WorkerConfig {
        work_dir: work_dir.to_path_buf(),
        ..WorkerConfig::default()
    };
    PatternJobRunner::new(config, Arc::new(backend), Arc::new(provider)).unwrap()
}

#[tokio::test]
async fn test_successful_job_stores_ranked_patterns() {
    let work = tempfile::tempdir().unwrap();
    let runner = runner(
        SceneBackend::new(twelve_windows()),
        SceneProvider { fail: false },
        work.path(),
    );
    let sink = RecordingSink::default();

    let report = runner.run(&job("/videos/match.mp4", 8), &sink).await;

    assert_eq!(report.status, ReportStatus::Success);
    assert_eq!(report.patterns, 4);
    assert_eq!(report.examples, 12);

    let patterns = sink.patterns.lock().unwrap().clone();
    let counts: Vec<usize> = patterns.iter().map(|p| p.count).collect();
    assert_eq!(counts, vec![5, 4, 2, 1]);
    let ranks: Vec<usize> = patterns.iter().map(|p| p.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3, 4]);
    assert!((patterns[0].confidence - (0.5 + 5.0 / 12.0)).abs() < 1e-9);
    assert!(patterns.iter().all(|p| (0.5..=0.95).contains(&p.confidence)));

    // Every example is an original window range and points at its scene's pattern.
    let examples = sink.examples.lock().unwrap().clone();
    for (i, example) in examples.iter().enumerate() {
        assert_eq!(example.start_sec, i as f64 * STRIDE);
        assert_eq!(example.end_sec, i as f64 * STRIDE + 8.0);
    }
    assert_eq!(examples[0].pattern_id, examples[2].pattern_id);
    assert_eq!(examples[0].pattern_id, PatternId::Number(100));
    assert_eq!(examples[6].pattern_id, PatternId::Number(103));

    let statuses = sink.statuses();
    assert_eq!(sink.status_sequence(), vec![JobStatus::Running, JobStatus::Done]);
    assert_eq!(
        statuses[1].summary.as_deref(),
        Some("Found 4 repeated pattern clusters from sampled windows.")
    );
}

#[tokio::test]
async fn test_max_patterns_limits_patterns_and_examples() {
    let work = tempfile::tempdir().unwrap();
    let runner = runner(
        SceneBackend::new(twelve_windows()),
        SceneProvider { fail: false },
        work.path(),
    );
    let sink = RecordingSink::default();

    let report = runner.run(&job("/videos/match.mp4", 2), &sink).await;

    assert!(report.is_success());
    assert_eq!(report.patterns, 2);
    assert_eq!(report.examples, 9);
    assert!(sink
        .examples
        .lock()
        .unwrap()
        .iter()
        .all(|e| e.pattern_id == PatternId::Number(100) || e.pattern_id == PatternId::Number(101)));
}

#[tokio::test]
async fn test_max_patterns_above_cluster_count_keeps_every_cluster() {
    let work = tempfile::tempdir().unwrap();
    let runner = runner(
        SceneBackend::new(twelve_windows()),
        SceneProvider { fail: false },
        work.path(),
    );
    let sink = RecordingSink::default();

    let report = runner.run(&job("/videos/match.mp4", 100), &sink).await;

    assert!(report.is_success(), "{:?}", report.error);
    assert_eq!(report.patterns, 4);
    assert_eq!(report.examples, 12);
}

#[tokio::test]
#[serial]
async fn test_missing_max_patterns_uses_configured_default() {
    let work = tempfile::tempdir().unwrap();
    std::env::set_var("PATTERN_MAX_PATTERNS", "2");
    let config = WorkerConfig {
        work_dir: work.path().to_path_buf(),
        ..WorkerConfig::from_env()
    };
    std::env::remove_var("PATTERN_MAX_PATTERNS");
    let runner = PatternJobRunner::new(
        config,
        Arc::new(SceneBackend::new(twelve_windows())),
        Arc::new(SceneProvider { fail: false }),
    )
    .unwrap();
    let sink = RecordingSink::default();

    let mut request = job("/videos/match.mp4", 8);
    request.max_patterns = None;
    let report = runner.run(&request, &sink).await;

    assert!(report.is_success(), "{:?}", report.error);
    assert_eq!(report.patterns, 2);
    assert_eq!(report.examples, 9);
}

#[tokio::test]
async fn test_too_few_windows_fails_without_rows() {
    let work = tempfile::tempdir().unwrap();
    let mut backend = SceneBackend::new(twelve_windows());
    backend.blank = vec![1, 3, 5, 7];
    let runner = runner(backend, SceneProvider { fail: false }, work.path());
    let sink = RecordingSink::default();

    let report = runner.run(&job("/videos/match.mp4", 8), &sink).await;

    assert_eq!(report.status, ReportStatus::Error);
    assert_eq!(
        report.error.as_deref(),
        Some("Not enough windows sampled from video")
    );
    assert!(sink.patterns.lock().unwrap().is_empty());
    assert!(sink.examples.lock().unwrap().is_empty());

    let statuses = sink.statuses();
    assert_eq!(sink.status_sequence(), vec![JobStatus::Running, JobStatus::Failed]);
    assert_eq!(
        statuses[1].error_message.as_deref(),
        Some("Not enough windows sampled from video")
    );
}

#[tokio::test]
async fn test_unreadable_source_fails_job() {
    let work = tempfile::tempdir().unwrap();
    let mut backend = SceneBackend::new(twelve_windows());
    backend.unreadable = true;
    let runner = runner(backend, SceneProvider { fail: false }, work.path());
    let sink = RecordingSink::default();

    let report = runner.run(&job("/videos/broken.mp4", 8), &sink).await;

    assert!(!report.is_success());
    assert_eq!(sink.status_sequence(), vec![JobStatus::Running, JobStatus::Failed]);
    assert!(sink.statuses()[1].error_message.is_some());
    assert!(sink.patterns.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_embedding_failure_fails_job() {
    let work = tempfile::tempdir().unwrap();
    let runner = runner(
        SceneBackend::new(twelve_windows()),
        SceneProvider { fail: true },
        work.path(),
    );
    let sink = RecordingSink::default();

    let report = runner.run(&job("/videos/match.mp4", 8), &sink).await;

    assert!(report.error.unwrap().starts_with("Embedding failed"));
    assert!(sink.patterns.lock().unwrap().is_empty());
    assert_eq!(sink.status_sequence().last(), Some(&JobStatus::Failed));
}

#[tokio::test]
async fn test_example_insert_failure_keeps_patterns_and_fails_job() {
    let work = tempfile::tempdir().unwrap();
    let runner = runner(
        SceneBackend::new(twelve_windows()),
        SceneProvider { fail: false },
        work.path(),
    );
    let sink = RecordingSink {
        fail_examples: true,
        ..RecordingSink::default()
    };

    let report = runner.run(&job("/videos/match.mp4", 8), &sink).await;

    assert!(!report.is_success());
    assert_eq!(sink.patterns.lock().unwrap().len(), 4);
    assert_eq!(sink.status_sequence(), vec![JobStatus::Running, JobStatus::Failed]);
}

#[tokio::test]
async fn test_failed_done_write_reports_failure() {
    let work = tempfile::tempdir().unwrap();
    let runner = runner(
        SceneBackend::new(twelve_windows()),
        SceneProvider { fail: false },
        work.path(),
    );
    let sink = RecordingSink {
        fail_done: true,
        ..RecordingSink::default()
    };

    let report = runner.run(&job("/videos/match.mp4", 8), &sink).await;

    assert!(!report.is_success());
    assert_eq!(
        sink.status_sequence(),
        vec![JobStatus::Running, JobStatus::Done, JobStatus::Failed]
    );
}

#[tokio::test]
async fn test_invalid_job_is_rejected_before_running() {
    let work = tempfile::tempdir().unwrap();
    let runner = runner(
        SceneBackend::new(twelve_windows()),
        SceneProvider { fail: false },
        work.path(),
    );
    let sink = RecordingSink::default();

    let report = runner.run(&job("/videos/match.mp4", 0), &sink).await;

    assert!(!report.is_success());
    assert_eq!(sink.status_sequence(), vec![JobStatus::Failed]);
}

#[tokio::test]
async fn test_remote_source_is_downloaded_and_cleaned_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/match.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 4096]))
        .expect(1)
        .mount(&server)
        .await;

    let work = tempfile::tempdir().unwrap();
    let mut backend = SceneBackend::new(twelve_windows());
    backend.require_file = true;
    let runner = runner(backend, SceneProvider { fail: false }, work.path());
    let sink = RecordingSink::default();

    let url = format!("{}/match.mp4", server.uri());
    let report = runner.run(&job(&url, 8), &sink).await;

    assert!(report.is_success(), "{:?}", report.error);
    assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_failed_download_fails_job() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let work = tempfile::tempdir().unwrap();
    let runner = runner(
        SceneBackend::new(twelve_windows()),
        SceneProvider { fail: false },
        work.path(),
    );
    let sink = RecordingSink::default();

    let url = format!("{}/missing.mp4", server.uri());
    let report = runner.run(&job(&url, 8), &sink).await;

    assert_eq!(
        report.error.as_deref(),
        Some("Failed to download source video")
    );
    assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
}
