//! Embedding service HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::ColorType;
use reqwest::Client;
use tracing::{debug, warn};
use vpat_media::Frame;

use crate::error::{EmbedError, EmbedResult};
use crate::provider::EmbeddingProvider;
use crate::types::{EmbedRequest, EmbedResponse, HealthResponse};

/// Configuration for the embedding client.
#[derive(Debug, Clone)]
pub struct EmbeddingClientConfig {
    /// Base URL of the embedding service
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Max retries on transient failures
    pub max_retries: u32,
    /// First retry delay; doubles per attempt
    pub retry_base_delay: Duration,
    /// JPEG quality used when uploading frames
    pub jpeg_quality: u8,
}

impl Default for EmbeddingClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            timeout: Duration::from_secs(120),
            max_retries: 2,
            retry_base_delay: Duration::from_millis(500),
            jpeg_quality: 90,
        }
    }
}

impl EmbeddingClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("EMBEDDING_SERVICE_URL").unwrap_or(defaults.base_url),
            timeout: std::env::var("EMBEDDING_SERVICE_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            max_retries: std::env::var("EMBEDDING_SERVICE_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            retry_base_delay: defaults.retry_base_delay,
            jpeg_quality: std::env::var("EMBEDDING_JPEG_QUALITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|q: &u8| (1..=100).contains(q))
                .unwrap_or(defaults.jpeg_quality),
        }
    }
}

/// Client for the embedding service.
pub struct EmbeddingClient {
    http: Client,
    config: EmbeddingClientConfig,
}

impl EmbeddingClient {
    /// Create a new embedding client.
    pub fn new(config: EmbeddingClientConfig) -> EmbedResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("vpat-embed-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(EmbedError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> EmbedResult<Self> {
        Self::new(EmbeddingClientConfig::from_env())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Check if the embedding service is healthy.
    pub async fn health_check(&self) -> EmbedResult<bool> {
        let url = self.endpoint("health");

        match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                let health: HealthResponse = response.json().await?;
                Ok(health.status == "healthy" || health.status == "ok")
            }
            Ok(response) => {
                warn!("Embedding service health check failed: {}", response.status());
                Ok(false)
            }
            Err(e) => {
                warn!("Embedding service health check error: {}", e);
                Ok(false)
            }
        }
    }

    fn encode_frame(&self, frame: &Frame) -> EmbedResult<String> {
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.config.jpeg_quality)
            .encode(frame.as_raw(), frame.width(), frame.height(), ColorType::Rgb8)
            .map_err(|e| EmbedError::Encode(e.to_string()))?;
        Ok(STANDARD.encode(jpeg))
    }

    async fn post_embed(&self, url: &str, request: &EmbedRequest) -> EmbedResult<EmbedResponse> {
        let response = self.http.post(url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbedError::from_http_status(status.as_u16(), body));
        }

        Ok(response.json().await?)
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> EmbedResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = EmbedResult<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = backoff_delay(self.config.retry_base_delay, attempt);
                    warn!(
                        "Embedding request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| EmbedError::RequestFailed("Unknown error".to_string())))
    }
}

/// Upper bound for a single backoff sleep.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// `base * 2^attempt`, saturating and capped at [`MAX_RETRY_DELAY`].
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
        .min(MAX_RETRY_DELAY)
}

fn validate_response(response: EmbedResponse, expected: usize) -> EmbedResult<Vec<Vec<f32>>> {
    if response.embeddings.len() != expected {
        return Err(EmbedError::InvalidResponse(format!(
            "expected {} embeddings, got {}",
            expected,
            response.embeddings.len()
        )));
    }

    let dimension = response
        .dimension
        .or_else(|| response.embeddings.first().map(Vec::len))
        .unwrap_or(0);
    if dimension == 0 && expected > 0 {
        return Err(EmbedError::InvalidResponse("empty embedding vectors".to_string()));
    }
    if let Some(bad) = response.embeddings.iter().find(|v| v.len() != dimension) {
        return Err(EmbedError::InvalidResponse(format!(
            "expected dimension {}, got {}",
            dimension,
            bad.len()
        )));
    }

    Ok(response.embeddings)
}

#[async_trait]
impl EmbeddingProvider for EmbeddingClient {
    async fn embed_images(&self, images: &[Frame]) -> EmbedResult<Vec<Vec<f32>>> {
        if images.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbedRequest {
            images: images
                .iter()
                .map(|frame| self.encode_frame(frame))
                .collect::<EmbedResult<_>>()?,
        };
        let url = self.endpoint("embed");

        debug!(images = images.len(), "Sending embedding request to {}", url);

        let response = self.with_retry(|| self.post_embed(&url, &request)).await?;
        validate_response(response, images.len())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
