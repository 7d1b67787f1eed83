//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use vpat_media::SamplingParams;
use vpat_models::job::DEFAULT_MAX_PATTERNS;

use crate::clustering::KMeansConfig;
use crate::error::{WorkerError, WorkerResult};

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Window length in seconds
    pub window_secs: f64,
    /// Distance between window starts in seconds
    pub stride_secs: f64,
    /// Fewer sampled windows than this fails the job
    pub min_windows: usize,
    /// Top-N used when a job does not specify one
    pub default_max_patterns: usize,
    /// Seed for k-means++ initialisation
    pub kmeans_seed: u64,
    /// Lloyd iteration cap
    pub kmeans_max_iterations: usize,
    /// Root for per-job temp directories
    pub work_dir: PathBuf,
    /// Timeout for downloading a remote source
    pub download_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            window_secs: 8.0,
            stride_secs: 20.0,
            min_windows: 10,
            default_max_patterns: DEFAULT_MAX_PATTERNS,
            kmeans_seed: 42,
            kmeans_max_iterations: 300,
            work_dir: PathBuf::from("/tmp/vpat"),
            download_timeout: Duration::from_secs(120),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            window_secs: env_or("PATTERN_WINDOW_SECS", defaults.window_secs),
            stride_secs: env_or("PATTERN_STRIDE_SECS", defaults.stride_secs),
            min_windows: env_or("PATTERN_MIN_WINDOWS", defaults.min_windows),
            default_max_patterns: env_or("PATTERN_MAX_PATTERNS", defaults.default_max_patterns),
            kmeans_seed: env_or("KMEANS_SEED", defaults.kmeans_seed),
            kmeans_max_iterations: env_or("KMEANS_MAX_ITERATIONS", defaults.kmeans_max_iterations),
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            download_timeout: Duration::from_secs(env_or(
                "DOWNLOAD_TIMEOUT_SECS",
                defaults.download_timeout.as_secs(),
            )),
        }
    }

    /// Check values that would otherwise fail deep inside a job.
    pub fn validate(&self) -> WorkerResult<()> {
        self.sampling_params()?;
        if self.min_windows == 0 {
            return Err(WorkerError::config("PATTERN_MIN_WINDOWS must be at least 1"));
        }
        if self.default_max_patterns == 0 {
            return Err(WorkerError::config("PATTERN_MAX_PATTERNS must be at least 1"));
        }
        if self.kmeans_max_iterations == 0 {
            return Err(WorkerError::config("KMEANS_MAX_ITERATIONS must be at least 1"));
        }
        Ok(())
    }

    pub fn sampling_params(&self) -> WorkerResult<SamplingParams> {
        SamplingParams::new(self.window_secs, self.stride_secs)
            .map_err(|e| WorkerError::config(e.to_string()))
    }

    pub fn kmeans_config(&self) -> KMeansConfig {
        KMeansConfig {
            seed: self.kmeans_seed,
            max_iterations: self.kmeans_max_iterations,
            ..KMeansConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults_match_service_behaviour() {
        let config = WorkerConfig::default();
        assert_eq!(config.window_secs, 8.0);
        assert_eq!(config.stride_secs, 20.0);
        assert_eq!(config.min_windows, 10);
        assert_eq!(config.default_max_patterns, 8);
        assert_eq!(config.kmeans_seed, 42);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        std::env::set_var("PATTERN_WINDOW_SECS", "4");
        std::env::set_var("PATTERN_MIN_WINDOWS", "3");
        std::env::set_var("KMEANS_SEED", "not-a-number");
        let config = WorkerConfig::from_env();
        std::env::remove_var("PATTERN_WINDOW_SECS");
        std::env::remove_var("PATTERN_MIN_WINDOWS");
        std::env::remove_var("KMEANS_SEED");

        assert_eq!(config.window_secs, 4.0);
        assert_eq!(config.min_windows, 3);
        assert_eq!(config.kmeans_seed, 42);
    }

    #[test]
    fn test_validate_rejects_bad_stride() {
        let config = WorkerConfig {
            stride_secs: 0.0,
            ..WorkerConfig::default()
        };
        assert!(matches!(config.validate(), Err(WorkerError::Config(_))));
    }
}
