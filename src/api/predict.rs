use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde_json::Value;
use validator::Validate;

use crate::api::error::ApiError;
use crate::api::fields::RequestFields;
use crate::domain::PredictionResult;
use crate::forecast::{forecast, parse_timestamp, LoadQuery, PredictionError};
use crate::state::AppState;

/// Field order used when reporting the first invalid field
const FIELD_ORDER: [&str; 4] = [
    "current_time",
    "current_load",
    "historical_loads",
    "confidence_level",
];

/// Forecast request
#[derive(Debug, Validate)]
pub struct PredictRequest {
    /// ISO-8601 wall-clock time
    pub current_time: String,
    #[validate(range(min = 0.0))]
    pub current_load: f64,
    /// Recent loads, oldest first; may be empty
    pub historical_loads: Vec<f64>,
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub confidence_level: Option<f64>,
}

impl PredictRequest {
    /// Fields are read in request order; the first missing or mistyped one
    /// is reported.
    pub fn from_fields(mut fields: RequestFields) -> Result<Self, ApiError> {
        let request = Self {
            current_time: fields.required("current_time")?,
            current_load: fields.required("current_load")?,
            historical_loads: fields.required("historical_loads")?,
            confidence_level: fields.optional("confidence_level")?,
        };
        request
            .validate()
            .map_err(|e| ApiError::from_validation(e, &FIELD_ORDER))?;
        Ok(request)
    }
}

/// POST /predict
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    let req = PredictRequest::from_fields(RequestFields::from_json(payload)?)?;

    if req.historical_loads.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(ApiError::invalid(
            "historical_loads",
            "historical_loads must contain non-negative numbers",
        ));
    }

    let current_time = parse_timestamp(&req.current_time)
        .map_err(|e| ApiError::invalid("current_time", e.to_string()))?;
    let confidence_level = req
        .confidence_level
        .unwrap_or(state.cfg.serving.confidence_level);

    let model = state.model.current().ok_or(PredictionError::ModelNotLoaded)?;
    let query = LoadQuery {
        current_time,
        current_load: req.current_load,
        historical_loads: &req.historical_loads,
    };
    let result = forecast(&model, &query, confidence_level)?;

    let issued = state.tracker.note_forecast();
    tracing::info!(
        predicted_load = result.predicted_load,
        current_load = req.current_load,
        history_len = req.historical_loads.len(),
        issued,
        "prediction served"
    );

    Ok(Json(result))
}
