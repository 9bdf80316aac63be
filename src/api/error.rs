use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use itertools::Itertools;
use serde::Serialize;
use thiserror::Error;

use crate::forecast::PredictionError;

/// API error types that can be returned from handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation { field: String, message: String },

    #[error("{message}")]
    Recording { field: String, message: String },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Model not loaded")]
    ModelNotLoaded,

    #[error("Prediction failed: {0}")]
    InternalPrediction(String),
}

/// Error response that gets serialized to JSON
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

impl ApiError {
    pub fn missing(field: &str) -> Self {
        ApiError::Validation {
            field: field.to_string(),
            message: format!("Missing required field: {field}"),
        }
    }

    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Re-tag a field error as a record-actual failure
    pub fn into_recording(self) -> Self {
        match self {
            ApiError::Validation { field, message } => ApiError::Recording { field, message },
            other => other,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::Recording { .. } | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::ModelNotLoaded | ApiError::InternalPrediction(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the error type string
    fn error_type(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "ValidationError",
            ApiError::Recording { .. } => "RecordingError",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::ModelNotLoaded => "ModelNotLoaded",
            ApiError::InternalPrediction(_) => "InternalPredictionError",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = self.error_type();

        let message = match &self {
            ApiError::InternalPrediction(_) => {
                tracing::error!(error = %self, "prediction failed");
                "An internal error occurred".to_string()
            }
            ApiError::ModelNotLoaded => {
                tracing::warn!("prediction requested without a loaded model");
                "Model not loaded".to_string()
            }
            _ => {
                tracing::debug!(error = %self, "Client error");
                self.to_string()
            }
        };

        let field = match self {
            ApiError::Validation { field, .. } | ApiError::Recording { field, .. } => Some(field),
            _ => None,
        };

        (status, Json(ErrorResponse { error, message, field })).into_response()
    }
}

// Conversion from common error types

impl From<PredictionError> for ApiError {
    fn from(error: PredictionError) -> Self {
        match error {
            PredictionError::ModelNotLoaded => ApiError::ModelNotLoaded,
            other => ApiError::InternalPrediction(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    /// Reports the first offending field in `order`; fields not listed there
    /// follow alphabetically
    pub fn from_validation(errors: validator::ValidationErrors, order: &[&str]) -> Self {
        let field_errors = errors.field_errors();
        let rank = |field: &str| order.iter().position(|f| *f == field).unwrap_or(order.len());
        match field_errors
            .keys()
            .sorted_by_key(|field| (rank(field), field.to_string()))
            .next()
        {
            Some(field) => {
                let reason = field_errors[field]
                    .iter()
                    .map(|e| e.code.to_string())
                    .join(", ");
                ApiError::invalid(field, format!("Invalid value for {field}: {reason}"))
            }
            None => ApiError::BadRequest(errors.to_string()),
        }
    }
}
