//! Embedding provider trait.

use async_trait::async_trait;
use vpat_media::Frame;

use crate::error::EmbedResult;

/// Maps images to fixed-dimension vectors.
///
/// Implementations must be deterministic for a fixed model version and
/// return exactly one vector per input image, in input order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed_images(&self, images: &[Frame]) -> EmbedResult<Vec<Vec<f32>>>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}
