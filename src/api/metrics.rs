use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::round_to;
use crate::state::AppState;

/// Serving metrics. Model fields are null while no model is loaded.
#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub predictions_served: u64,
    pub avg_error: f64,
    pub model_version: Option<String>,
    pub model_rmse: Option<f64>,
    pub model_r2: Option<f64>,
    pub window_size: usize,
    pub window_rmse: f64,
    pub forecasts_issued: u64,
    pub timestamp: DateTime<Utc>,
}

/// GET /metrics
pub async fn metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    let snapshot = state.tracker.snapshot();
    let model = state.model.current();

    Json(MetricsResponse {
        predictions_served: snapshot.predictions_served,
        avg_error: round_to(snapshot.avg_error, 2),
        model_version: model.as_ref().map(|m| m.version().to_string()),
        model_rmse: model.as_ref().map(|m| round_to(m.rmse(), 2)),
        model_r2: model.as_ref().map(|m| round_to(m.r2(), 4)),
        window_size: snapshot.window_size,
        window_rmse: round_to(snapshot.window_rmse, 2),
        forecasts_issued: snapshot.forecasts_issued,
        timestamp: Utc::now(),
    })
}
