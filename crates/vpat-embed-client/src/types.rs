//! Embedding service request/response types.

use serde::{Deserialize, Serialize};

/// Batch of images to embed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedRequest {
    /// Base64-encoded JPEG images
    pub images: Vec<String>,
}

/// One vector per submitted image, in submission order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedResponse {
    pub embeddings: Vec<Vec<f32>>,
    /// Model identifier (e.g. "clip-vit-base-patch32")
    #[serde(default)]
    pub model: Option<String>,
    /// Vector dimension reported by the service
    #[serde(default)]
    pub dimension: Option<usize>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: Option<String>,
}
