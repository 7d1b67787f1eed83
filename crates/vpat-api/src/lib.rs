//! Axum HTTP API for video pattern mining.
//!
//! This crate provides:
//! - `POST /analyze` running one pattern mining job per request
//! - Liveness and readiness probes
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
