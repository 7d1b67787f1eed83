//! PostgREST-style REST client.
//!
//! Writes go to `{base_url}/rest/v1/{table}` authenticated with the service
//! key in both the `apikey` and `Authorization` headers:
//! - status transitions are PATCHes filtered by `id=eq.{job_id}` and retried
//! - pattern and example rows are batch POSTs returning the stored rows

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, info_span, warn, Instrument};
use vpat_models::{JobId, JobStatusUpdate, Pattern, PatternId};

use crate::error::{StoreError, StoreResult};
use crate::metrics::record_request;
use crate::retry::{with_retry, RetryConfig};
use crate::sink::ResultSink;
use crate::types::{ExampleRow, InsertedRow, PatternRow, StatusPatch};

/// Table names used by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    /// Rows carrying job status, one per analysed video
    pub jobs: String,
    pub patterns: String,
    pub examples: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            jobs: "matches".to_string(),
            patterns: "patterns".to_string(),
            examples: "pattern_examples".to_string(),
        }
    }
}

/// REST store configuration.
#[derive(Clone)]
pub struct RestStoreConfig {
    /// Backend base URL, without the `/rest/v1` suffix
    pub base_url: String,
    /// Service key sent as `apikey` and bearer token
    pub service_key: String,
    /// Per-request timeout
    pub timeout: Duration,
    pub tables: TableNames,
    /// Retry policy for status writes
    pub retry: RetryConfig,
}

impl RestStoreConfig {
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            service_key: service_key.into(),
            timeout: Duration::from_secs(60),
            tables: TableNames::default(),
            retry: RetryConfig::default(),
        }
    }

    /// Create config for the given backend, reading tunables from the environment.
    pub fn from_env(base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        let mut config = Self::new(base_url, service_key);
        if let Some(secs) = std::env::var("STORE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }
        config.retry = RetryConfig::from_env();
        config
    }

    pub fn with_tables(mut self, tables: TableNames) -> Self {
        self.tables = tables;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn validate(&self) -> StoreResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(StoreError::config("store base URL cannot be empty"));
        }
        if self.service_key.is_empty() {
            return Err(StoreError::config("store service key cannot be empty"));
        }
        Ok(())
    }
}

impl fmt::Debug for RestStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestStoreConfig")
            .field("base_url", &self.base_url)
            .field("service_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("tables", &self.tables)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Result sink backed by a PostgREST-compatible REST API.
#[derive(Clone)]
pub struct RestStore {
    http: Client,
    config: RestStoreConfig,
    rest_url: String,
}

impl RestStore {
    /// Create a store with its own HTTP client.
    pub fn new(config: RestStoreConfig) -> StoreResult<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("vpat-store/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(StoreError::Network)?;
        Self::with_client(http, config)
    }

    /// Create a store sharing an existing HTTP client.
    pub fn with_client(http: Client, config: RestStoreConfig) -> StoreResult<Self> {
        config.validate()?;
        let rest_url = format!("{}/rest/v1", config.base_url.trim_end_matches('/'));
        Ok(Self {
            http,
            config,
            rest_url,
        })
    }

    pub fn config(&self) -> &RestStoreConfig {
        &self.config
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .timeout(self.config.timeout)
            .header("apikey", &self.config.service_key)
            .bearer_auth(&self.config.service_key)
            .header("Prefer", "return=representation")
    }

    /// PATCH the job row. Idempotent, so transient failures are retried.
    async fn patch_status(&self, update: &JobStatusUpdate) -> StoreResult<()> {
        let table = &self.config.tables.jobs;
        let url = format!(
            "{}?id=eq.{}",
            self.table_url(table),
            urlencoding::encode(update.job_id.as_str())
        );
        let body = StatusPatch::from(update);

        let rows: Vec<serde_json::Value> = with_retry(&self.config.retry, "write_status", || {
            self.execute_request("write_status", table, async {
                let response = self
                    .authorized(self.http.patch(&url))
                    .json(&body)
                    .send()
                    .await?;
                Self::parse_rows(&url, response).await
            })
        })
        .await?;

        if rows.is_empty() {
            warn!(
                job_id = %update.job_id,
                status = %update.status,
                "Status update matched no rows"
            );
        }

        Ok(())
    }

    /// POST a batch of rows and return the stored representation.
    async fn insert_rows<B, T>(&self, operation: &str, table: &str, rows: &B) -> StoreResult<Vec<T>>
    where
        B: serde::Serialize + ?Sized + Sync,
        T: serde::de::DeserializeOwned,
    {
        let url = self.table_url(table);

        self.execute_request(operation, table, async {
            let response = self
                .authorized(self.http.post(&url))
                .json(rows)
                .send()
                .await?;
            Self::parse_rows(&url, response).await
        })
        .await
    }

    async fn parse_rows<T: serde::de::DeserializeOwned>(
        url: &str,
        response: Response,
    ) -> StoreResult<Vec<T>> {
        let status = response.status();
        if !status.is_success() {
            return Err(Self::handle_error_response(url, response).await);
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn handle_error_response(url: &str, response: Response) -> StoreError {
        let status = response.status().as_u16();
        let retry_after_ms = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(|secs| secs * 1000);
        let body = response.text().await.unwrap_or_default();

        match StoreError::from_http_status(status, format!("{} failed: {}", url, body)) {
            StoreError::RateLimited { message, .. } => StoreError::RateLimited {
                message,
                retry_after_ms,
            },
            other => other,
        }
    }

    /// Execute a request with tracing span and metrics.
    async fn execute_request<T, F>(&self, operation: &str, table: &str, fut: F) -> StoreResult<T>
    where
        F: std::future::Future<Output = StoreResult<T>>,
    {
        let span = info_span!("store_request", operation = %operation, table = %table);

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, table, status, latency_ms);

        result
    }
}

#[async_trait]
impl ResultSink for RestStore {
    async fn write_status(&self, update: &JobStatusUpdate) -> StoreResult<()> {
        debug!(job_id = %update.job_id, status = %update.status, "Writing job status");
        self.patch_status(update).await
    }

    async fn insert_patterns(
        &self,
        job_id: &JobId,
        patterns: &[Pattern],
    ) -> StoreResult<Vec<PatternId>> {
        if patterns.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<PatternRow<'_>> = patterns
            .iter()
            .map(|p| PatternRow::new(job_id.as_str(), p))
            .collect();

        let inserted: Vec<InsertedRow> = self
            .insert_rows("insert_patterns", &self.config.tables.patterns, rows.as_slice())
            .await?;

        if inserted.len() != patterns.len() {
            return Err(StoreError::invalid_response(format!(
                "inserted {} patterns but backend returned {} rows",
                patterns.len(),
                inserted.len()
            )));
        }

        debug!(job_id = %job_id, count = inserted.len(), "Inserted pattern rows");
        Ok(inserted.into_iter().map(|row| row.id).collect())
    }

    async fn insert_examples(&self, examples: &[ExampleRow]) -> StoreResult<usize> {
        if examples.is_empty() {
            return Ok(0);
        }

        let _: Vec<serde_json::Value> = self
            .insert_rows("insert_examples", &self.config.tables.examples, examples)
            .await?;

        debug!(count = examples.len(), "Inserted example rows");
        Ok(examples.len())
    }
}
