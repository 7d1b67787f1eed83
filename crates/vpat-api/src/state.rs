//! Application state.

use std::sync::Arc;
use std::time::Duration;

use vpat_embed_client::EmbeddingClient;
use vpat_media::OpenCvBackend;
use vpat_worker::{PatternJobRunner, WorkerConfig};

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub runner: Arc<PatternJobRunner>,
    /// Checked by the readiness probe when present
    pub embedder: Option<Arc<EmbeddingClient>>,
    /// Shared connection pool for per-job store clients
    pub http: reqwest::Client,
}

impl AppState {
    /// Build the production state from the environment.
    pub fn new(config: ApiConfig) -> ApiResult<Self> {
        let embedder = Arc::new(EmbeddingClient::from_env()?);
        let runner = PatternJobRunner::new(
            WorkerConfig::from_env(),
            Arc::new(OpenCvBackend::new()),
            embedder.clone(),
        )?;

        let mut state = Self::with_runner(config, Arc::new(runner))?;
        state.embedder = Some(embedder);
        Ok(state)
    }

    /// State around an existing runner, without a readiness target.
    pub fn with_runner(config: ApiConfig, runner: Arc<PatternJobRunner>) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("vpat-api/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            runner,
            embedder: None,
            http,
        })
    }
}
