//! Pattern mining pipeline.
//!
//! Turns a video into ranked recurring-pattern clusters:
//! - Window embeddings averaged from per-frame vectors
//! - Seeded k-means over the embeddings
//! - Frequency-ranked pattern selection
//! - Orchestration with status reporting through a result sink

pub mod clustering;
pub mod config;
pub mod embedding;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod processor;
pub mod selection;

pub use clustering::{choose_k, KMeans, KMeansConfig};
pub use config::WorkerConfig;
pub use embedding::{embed_windows, mean_normalized, Embedding};
pub use error::{WorkerError, WorkerResult};
pub use logging::JobLogger;
pub use processor::PatternJobRunner;
pub use selection::{confidence, select_patterns, Selection};
