use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How far ahead a forecast looks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionHorizon {
    #[default]
    #[serde(rename = "30_minutes")]
    ThirtyMinutes,
}

impl std::fmt::Display for PredictionHorizon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ThirtyMinutes => write!(f, "30_minutes"),
        }
    }
}

/// Symmetric band around a point forecast
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceInterval {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// A served load forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_load: f64,
    pub confidence_lower: f64,
    pub confidence_upper: f64,
    #[serde(rename = "prediction_horizon")]
    pub horizon: PredictionHorizon,
    /// R² of the model on its held-out test split
    pub model_accuracy: f64,
    pub timestamp: DateTime<Utc>,
}

impl PredictionResult {
    pub fn new(predicted_load: f64, interval: ConfidenceInterval, model_accuracy: f64) -> Self {
        Self {
            predicted_load,
            confidence_lower: interval.lower,
            confidence_upper: interval.upper,
            horizon: PredictionHorizon::default(),
            model_accuracy,
            timestamp: Utc::now(),
        }
    }

    /// Round to the precision exposed on the wire
    pub fn rounded(self) -> Self {
        Self {
            predicted_load: round_to(self.predicted_load, 2),
            confidence_lower: round_to(self.confidence_lower, 2),
            confidence_upper: round_to(self.confidence_upper, 2),
            model_accuracy: round_to(self.model_accuracy, 4),
            ..self
        }
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
