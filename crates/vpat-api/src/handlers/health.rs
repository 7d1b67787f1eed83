//! Health check handlers.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Liveness probe.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub embedding_service: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Readiness probe: the embedding service must answer its health check.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let Some(embedder) = state.embedder.as_ref() else {
        return Ok(Json(ReadinessResponse {
            status: "ready".to_string(),
            embedding_service: CheckStatus {
                status: "skipped".to_string(),
                latency_ms: None,
            },
        }));
    };

    let start = Instant::now();
    let healthy = embedder.health_check().await.unwrap_or(false);
    let check = CheckStatus {
        status: if healthy { "ok" } else { "error" }.to_string(),
        latency_ms: Some(start.elapsed().as_millis() as u64),
    };

    if healthy {
        Ok(Json(ReadinessResponse {
            status: "ready".to_string(),
            embedding_service: check,
        }))
    } else {
        Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready".to_string(),
                embedding_service: check,
            }),
        ))
    }
}
