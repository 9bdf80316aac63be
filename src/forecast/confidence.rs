//! Prediction intervals from the model's offline error.
//!
//! The band is a fixed-width simplification: its half-width is the training
//! RMSE times a constant, the same for every request. It is not a predictive
//! distribution and does not adapt to live residuals.

use crate::domain::ConfidenceInterval;

/// Levels at or above this use the wide multiplier
pub const HIGH_CONFIDENCE_LEVEL: f64 = 0.95;
pub const HIGH_CONFIDENCE_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_MULTIPLIER: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceEstimator {
    rmse: f64,
}

impl ConfidenceEstimator {
    /// `rmse` is the static test-split error recorded at training time.
    /// Negative or non-finite values collapse the band to zero width.
    pub fn new(rmse: f64) -> Self {
        let rmse = if rmse.is_finite() { rmse.max(0.0) } else { 0.0 };
        Self { rmse }
    }

    pub fn rmse(&self) -> f64 {
        self.rmse
    }

    pub fn margin(&self, confidence_level: f64) -> f64 {
        let multiplier = if confidence_level >= HIGH_CONFIDENCE_LEVEL {
            HIGH_CONFIDENCE_MULTIPLIER
        } else {
            DEFAULT_MULTIPLIER
        };
        self.rmse * multiplier
    }

    pub fn interval(&self, prediction: f64, confidence_level: f64) -> ConfidenceInterval {
        let margin = self.margin(confidence_level);
        ConfidenceInterval {
            lower: (prediction - margin).max(0.0),
            upper: prediction + margin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_high_confidence_interval() {
        let estimator = ConfidenceEstimator::new(20.0);
        let interval = estimator.interval(820.0, 0.95);
        assert_eq!(interval.lower, 780.0);
        assert_eq!(interval.upper, 860.0);
    }

    #[test]
    fn test_lower_confidence_uses_narrow_margin() {
        let estimator = ConfidenceEstimator::new(20.0);
        assert_eq!(estimator.margin(0.9), 30.0);
        let interval = estimator.interval(100.0, 0.8);
        assert_eq!(interval.lower, 70.0);
        assert_eq!(interval.upper, 130.0);
    }

    #[test]
    fn test_lower_bound_clamped_at_zero() {
        let estimator = ConfidenceEstimator::new(50.0);
        let interval = estimator.interval(30.0, 0.95);
        assert_eq!(interval.lower, 0.0);
        assert_eq!(interval.upper, 130.0);
    }

    #[test]
    fn test_invalid_rmse_gives_zero_width() {
        assert_eq!(ConfidenceEstimator::new(f64::NAN).margin(0.95), 0.0);
        assert_eq!(ConfidenceEstimator::new(-4.0).margin(0.95), 0.0);
    }

    proptest! {
        #[test]
        fn prop_lower_never_negative(
            prediction in -1000.0f64..10_000.0,
            rmse in 0.0f64..1000.0,
            level in 0.0f64..1.0,
        ) {
            let interval = ConfidenceEstimator::new(rmse).interval(prediction, level);
            prop_assert!(interval.lower >= 0.0);
            prop_assert!(interval.upper >= interval.lower || interval.upper < 0.0);
        }

        #[test]
        fn prop_width_is_twice_margin_when_unclamped(
            prediction in 5000.0f64..10_000.0,
            rmse in 0.0f64..1000.0,
            level in 0.0f64..1.0,
        ) {
            let estimator = ConfidenceEstimator::new(rmse);
            let interval = estimator.interval(prediction, level);
            let margin = estimator.margin(level);
            prop_assert!((interval.width() - 2.0 * margin).abs() < 1e-9);
        }
    }
}
