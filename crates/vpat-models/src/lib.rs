//! Shared data models for the video pattern miner.
//!
//! This crate provides Serde-serializable types for:
//! - Analysis jobs, their status transitions and final reports
//! - Source video locators
//! - Patterns, pattern examples and cluster statistics

pub mod job;
pub mod locator;
pub mod pattern;

// Re-export common types
pub use job::{AnalyzeJob, JobId, JobReport, JobStatus, JobStatusUpdate, ReportStatus};
pub use locator::{LocatorError, SourceLocator};
pub use pattern::{ClusterStats, Pattern, PatternExample, PatternId, TimeRange};
