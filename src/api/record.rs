use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Serialize;
use serde_json::Value;
use validator::Validate;

use crate::api::error::ApiError;
use crate::api::fields::RequestFields;
use crate::domain::round_to;
use crate::state::AppState;

const FIELD_ORDER: [&str; 2] = ["predicted_load", "actual_load"];

#[derive(Debug, Validate)]
pub struct RecordActualRequest {
    #[validate(range(min = 0.0))]
    pub predicted_load: f64,
    #[validate(range(min = 0.0))]
    pub actual_load: f64,
}

impl RecordActualRequest {
    pub fn from_fields(mut fields: RequestFields) -> Result<Self, ApiError> {
        let request = Self {
            predicted_load: fields.required("predicted_load")?,
            actual_load: fields.required("actual_load")?,
        };
        request
            .validate()
            .map_err(|e| ApiError::from_validation(e, &FIELD_ORDER))?;
        Ok(request)
    }
}

#[derive(Debug, Serialize)]
pub struct RecordActualResponse {
    pub status: &'static str,
    /// Absolute difference between predicted and actual load, 2 decimals
    pub error: f64,
}

/// POST /record_actual
pub async fn record_actual(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<RecordActualResponse>, ApiError> {
    let req = RequestFields::from_json(payload)
        .and_then(RecordActualRequest::from_fields)
        .map_err(ApiError::into_recording)?;

    let error = state.tracker.record(req.predicted_load, req.actual_load);
    tracing::info!(
        predicted = req.predicted_load,
        actual = req.actual_load,
        error,
        "actual load recorded"
    );

    Ok(Json(RecordActualResponse {
        status: "recorded",
        error: round_to(error, 2),
    }))
}
