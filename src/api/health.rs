use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ml::ModelPhase;
use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    model_loaded: bool,
    scaler_loaded: bool,
    phase: ModelPhase,
    timestamp: DateTime<Utc>,
}

/// GET /health - Health check endpoint
///
/// Healthy only once the model, scaler and metadata are loaded and validated.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let health = state.model.health();
    let healthy = health.is_healthy();

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" },
        model_loaded: health.model_loaded,
        scaler_loaded: health.scaler_loaded,
        phase: health.phase,
        timestamp: Utc::now(),
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    tracing::debug!(healthy, phase = %health.phase, "Health check completed");
    (status_code, Json(response))
}

/// GET /health/ready - Readiness probe
///
/// Returns 200 if the application is ready to serve predictions
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    if state.model.health().is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health/live - Liveness probe
///
/// Returns 200 if the application is running
pub async fn liveness_check() -> impl IntoResponse {
    StatusCode::OK
}
