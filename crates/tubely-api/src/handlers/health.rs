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

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub firestore: CheckStatus,
    pub storage: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl CheckStatus {
    fn from_result<E: std::fmt::Display>(result: Result<(), E>, start: Instant) -> Self {
        match result {
            Ok(()) => Self {
                status: "ok".to_string(),
                error: None,
                latency_ms: Some(start.elapsed().as_millis() as u64),
            },
            Err(e) => Self {
                status: "error".to_string(),
                error: Some(e.to_string()),
                latency_ms: None,
            },
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Readiness check endpoint (readiness probe).
/// Checks connectivity to Firestore and the object store.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let start = Instant::now();
    let firestore = CheckStatus::from_result(state.videos.health_check().await, start);

    let start = Instant::now();
    let storage = CheckStatus::from_result(state.objects.check_connectivity().await, start);

    let all_ok = firestore.is_ok() && storage.is_ok();
    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" }.to_string(),
        checks: ReadinessChecks { firestore, storage },
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
