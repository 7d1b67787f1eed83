//! Result sink for mined patterns.
//!
//! This crate provides:
//! - The [`ResultSink`] trait the pipeline writes through
//! - A PostgREST-style REST implementation with retry and request metrics

pub mod client;
pub mod error;
pub mod metrics;
pub mod retry;
pub mod sink;
pub mod types;

pub use client::{RestStore, RestStoreConfig, TableNames};
pub use error::{StoreError, StoreResult};
pub use retry::RetryConfig;
pub use sink::ResultSink;
pub use types::{ExampleRow, PatternRow, StatusPatch};
