//! Forecast Metrics and Evaluation
//!
//! Error metrics used to score a model on its held-out split.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Forecast accuracy metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Root Mean Square Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error (%)
    pub mape: f64,
    /// R² (coefficient of determination)
    pub r2: f64,
    /// Number of samples evaluated
    pub sample_count: usize,
    /// Maximum absolute error observed
    pub max_error: f64,
}

impl ForecastMetrics {
    /// Calculate metrics from actual and predicted values
    pub fn calculate(actual: &[f64], predicted: &[f64]) -> Result<Self, ForecastMetricsError> {
        if actual.len() != predicted.len() {
            return Err(ForecastMetricsError::DimensionMismatch {
                actual: actual.len(),
                predicted: predicted.len(),
            });
        }

        if actual.is_empty() {
            return Err(ForecastMetricsError::EmptyData);
        }

        let n = actual.len() as f64;
        let mut abs_sum = 0.0;
        let mut sq_sum = 0.0;
        let mut pct_sum = 0.0;
        let mut pct_count = 0usize;
        let mut max_error = 0.0f64;

        for (a, p) in actual.iter().zip(predicted.iter()) {
            let error = (a - p).abs();
            abs_sum += error;
            sq_sum += error * error;
            max_error = max_error.max(error);

            // Zero loads carry no percentage error
            if a.abs() > 1e-6 {
                pct_sum += error / a.abs() * 100.0;
                pct_count += 1;
            }
        }

        let mean_actual = actual.iter().sum::<f64>() / n;
        let total_variance: f64 = actual.iter().map(|a| (a - mean_actual).powi(2)).sum();

        let r2 = if total_variance > 1e-10 {
            1.0 - (sq_sum / total_variance)
        } else {
            0.0
        };

        Ok(ForecastMetrics {
            mae: abs_sum / n,
            rmse: (sq_sum / n).sqrt(),
            mape: if pct_count == 0 {
                0.0
            } else {
                pct_sum / pct_count as f64
            },
            r2,
            sample_count: actual.len(),
            max_error,
        })
    }

    /// Assess forecast quality based on MAPE
    pub fn quality(&self) -> ForecastQuality {
        if self.mape < 5.0 {
            ForecastQuality::Excellent
        } else if self.mape < 10.0 {
            ForecastQuality::Good
        } else if self.mape < 20.0 {
            ForecastQuality::Fair
        } else if self.mape < 50.0 {
            ForecastQuality::Poor
        } else {
            ForecastQuality::VeryPoor
        }
    }

    /// RMSE strictly below `max_rmse` and R² strictly above `min_r2`
    pub fn meets_targets(&self, max_rmse: f64, min_r2: f64) -> bool {
        self.rmse < max_rmse && self.r2 > min_r2
    }
}

impl fmt::Display for ForecastMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Metrics: MAE={:.2}, RMSE={:.2}, MAPE={:.2}%, R²={:.4}, Quality={:?}",
            self.mae,
            self.rmse,
            self.mape,
            self.r2,
            self.quality()
        )
    }
}

/// Forecast quality classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForecastQuality {
    Excellent,  // MAPE < 5%
    Good,       // MAPE 5-10%
    Fair,       // MAPE 10-20%
    Poor,       // MAPE 20-50%
    VeryPoor,   // MAPE > 50%
}

/// Forecast metrics calculation errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ForecastMetricsError {
    #[error("Dimension mismatch: actual={actual}, predicted={predicted}")]
    DimensionMismatch { actual: usize, predicted: usize },

    #[error("Empty data provided")]
    EmptyData,
}
