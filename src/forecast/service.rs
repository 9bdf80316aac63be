//! Request-time forecasting: features -> model -> interval -> rounded result.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::domain::PredictionResult;
use crate::ml::TrainedModel;

/// Inputs of one forecast request, already validated
#[derive(Debug, Clone, Copy)]
pub struct LoadQuery<'a> {
    pub current_time: NaiveDateTime,
    pub current_load: f64,
    /// Oldest first
    pub historical_loads: &'a [f64],
}

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("model not loaded")]
    ModelNotLoaded,

    #[error("inference failed: {0:#}")]
    Inference(#[from] anyhow::Error),

    #[error("model produced a non-finite prediction ({0})")]
    NonFinite(f64),
}

/// Forecast the load one step ahead of `query.current_time`.
///
/// The point forecast is clamped at zero; the interval is derived from the
/// model's training RMSE and the result is rounded for the wire.
pub fn forecast(
    model: &TrainedModel,
    query: &LoadQuery<'_>,
    confidence_level: f64,
) -> Result<PredictionResult, PredictionError> {
    let features = model.extractor().extract(
        query.current_time,
        query.current_load,
        query.historical_loads,
    );

    let raw = model.predict(&features)?;
    if !raw.is_finite() {
        return Err(PredictionError::NonFinite(raw));
    }
    let predicted = raw.max(0.0);

    let interval = model.confidence().interval(predicted, confidence_level);
    tracing::debug!(
        predicted,
        lower = interval.lower,
        upper = interval.upper,
        confidence_level,
        "forecast computed"
    );

    Ok(PredictionResult::new(predicted, interval, model.r2()).rounded())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PredictionHorizon;
    use crate::forecast::{parse_timestamp, FeatureSchema};
    use crate::ml::models::MockScoredRegressor;
    use crate::ml::{ModelMetadata, ModelType, StandardScaler, ValidationMetrics};
    use chrono::Utc;

    fn model_returning(value: f64, rmse: f64) -> TrainedModel {
        let schema = FeatureSchema::default();
        let mut regressor = MockScoredRegressor::new();
        regressor.expect_n_features().return_const(schema.len());
        regressor.expect_predict().returning(move |_| Ok(value));

        let metadata = ModelMetadata {
            version: "20240101_000000".into(),
            model_type: ModelType::RandomForest,
            trained_at: Utc::now(),
            training_samples: 100,
            test_samples: 25,
            metrics: ValidationMetrics::new(rmse, 15.0, 0.912345, 5.0),
            feature_importance: Vec::new(),
            feature_order: schema.names(),
        };
        let scaler = StandardScaler {
            means: vec![0.0; schema.len()],
            stds: vec![1.0; schema.len()],
        };
        TrainedModel::new(Box::new(regressor), scaler, metadata, None).unwrap()
    }

    #[test]
    fn test_forecast_with_stub_regressor() {
        let model = model_returning(820.0, 20.0);
        let history = [650.0, 700.0, 720.0, 745.0];
        let query = LoadQuery {
            current_time: parse_timestamp("2024-01-07T14:30:00").unwrap(),
            current_load: 750.0,
            historical_loads: &history,
        };

        let result = forecast(&model, &query, 0.95).unwrap();
        assert_eq!(result.predicted_load, 820.0);
        assert_eq!(result.confidence_lower, 780.0);
        assert_eq!(result.confidence_upper, 860.0);
        assert_eq!(result.horizon, PredictionHorizon::ThirtyMinutes);
        assert_eq!(result.model_accuracy, 0.9123);
    }

    #[test]
    fn test_negative_prediction_is_clamped() {
        let model = model_returning(-12.5, 20.0);
        let query = LoadQuery {
            current_time: parse_timestamp("2024-01-07T03:00:00").unwrap(),
            current_load: 0.0,
            historical_loads: &[],
        };

        let result = forecast(&model, &query, 0.5).unwrap();
        assert_eq!(result.predicted_load, 0.0);
        assert_eq!(result.confidence_lower, 0.0);
        assert_eq!(result.confidence_upper, 30.0);
    }

    #[test]
    fn test_non_finite_prediction_is_an_error() {
        let model = model_returning(f64::NAN, 20.0);
        let query = LoadQuery {
            current_time: parse_timestamp("2024-01-07T03:00:00").unwrap(),
            current_load: 10.0,
            historical_loads: &[],
        };
        assert!(matches!(
            forecast(&model, &query, 0.95),
            Err(PredictionError::NonFinite(_))
        ));
    }

    #[test]
    fn test_regressor_failure_propagates() {
        let schema = FeatureSchema::parse(&["hour_of_day"]).unwrap();
        let mut regressor = MockScoredRegressor::new();
        regressor.expect_n_features().return_const(1usize);
        regressor
            .expect_predict()
            .returning(|_| Err(anyhow::anyhow!("tree walk failed")));
        let metadata = ModelMetadata {
            version: "v".into(),
            model_type: ModelType::RandomForest,
            trained_at: Utc::now(),
            training_samples: 1,
            test_samples: 1,
            metrics: ValidationMetrics::new(1.0, 1.0, 0.5, 1.0),
            feature_importance: Vec::new(),
            feature_order: schema.names(),
        };
        let scaler = StandardScaler {
            means: vec![0.0],
            stds: vec![1.0],
        };
        let model = TrainedModel::new(Box::new(regressor), scaler, metadata, None).unwrap();

        let query = LoadQuery {
            current_time: parse_timestamp("2024-01-07T03:00:00").unwrap(),
            current_load: 10.0,
            historical_loads: &[],
        };
        let err = forecast(&model, &query, 0.95).unwrap_err();
        assert!(matches!(err, PredictionError::Inference(_)));
        assert!(err.to_string().contains("tree walk failed"));
    }
}
