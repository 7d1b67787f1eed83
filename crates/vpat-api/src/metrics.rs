//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return its render handle.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "vpat_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vpat_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "vpat_http_requests_in_flight";

    pub const JOBS_ACCEPTED_TOTAL: &str = "vpat_jobs_accepted_total";
    pub const JOBS_TIMED_OUT_TOTAL: &str = "vpat_jobs_timed_out_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_job_accepted() {
    counter!(names::JOBS_ACCEPTED_TOTAL).increment(1);
}

pub fn record_job_timed_out() {
    counter!(names::JOBS_TIMED_OUT_TOTAL).increment(1);
}

/// Metrics middleware for HTTP requests.
///
/// Labels use the matched route template so ids never become label values.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}
