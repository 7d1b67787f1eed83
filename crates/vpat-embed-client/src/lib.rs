//! Client for the image embedding service.
//!
//! The pipeline only depends on the [`EmbeddingProvider`] trait; the HTTP
//! client here is one implementation of it, talking to a model server that
//! turns JPEG frames into fixed-dimension vectors.

pub mod client;
pub mod error;
pub mod provider;
pub mod types;

pub use client::{EmbeddingClient, EmbeddingClientConfig};
pub use error::{EmbedError, EmbedResult};
pub use provider::EmbeddingProvider;
pub use types::{EmbedRequest, EmbedResponse};
