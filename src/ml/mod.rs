//! Machine Learning Module
//!
//! Offline training and online serving of the load forecasting model.
//!
//! # Architecture
//! - `training`: dataset assembly, chronological split, fitting and evaluation
//! - `artifacts`: persisted model / scaler / metadata and their validation
//! - `inference`: the loaded [`TrainedModel`] and its load lifecycle
//! - `models` / `smartcore`: concrete regressors behind [`ScoredRegressor`]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub mod artifacts;
pub mod inference;
pub mod models;
pub mod scaler;
pub mod smartcore;
pub mod training;

pub use artifacts::{ArtifactPaths, RegressorArtifact, StartupError};
pub use inference::{LifecycleError, ModelHandle, ModelHealth, ModelPhase, TrainedModel};
pub use models::{LinearRegressionModel, ScoredRegressor};
pub use scaler::StandardScaler;
pub use smartcore::{RandomForestModel, RandomForestParams};
pub use training::{ModelTrainer, TrainingConfig, TrainingDataset, TrainingOutcome};

/// ML Model Type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ModelType {
    RandomForest,
    LinearRegression,
}

/// Held-out test metrics recorded at training time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub rmse: f64, // Root Mean Square Error
    pub mae: f64,  // Mean Absolute Error
    pub r2: f64,   // R-squared
    pub mape: f64, // Mean Absolute Percentage Error
}

impl ValidationMetrics {
    pub fn new(rmse: f64, mae: f64, r2: f64, mape: f64) -> Self {
        Self { rmse, mae, r2, mape }
    }
}

impl From<&crate::forecast::ForecastMetrics> for ValidationMetrics {
    fn from(m: &crate::forecast::ForecastMetrics) -> Self {
        Self::new(m.rmse, m.mae, m.r2, m.mape)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Metadata persisted next to a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Version tag, `YYYYMMDD_HHMMSS` of the training run
    pub version: String,
    pub model_type: ModelType,
    pub trained_at: DateTime<Utc>,
    #[serde(default)]
    pub training_samples: usize,
    #[serde(default)]
    pub test_samples: usize,
    pub metrics: ValidationMetrics,
    /// Sorted by descending importance
    #[serde(default)]
    pub feature_importance: Vec<FeatureImportance>,
    /// Column order the model and scaler were fitted with
    #[serde(default)]
    pub feature_order: Vec<String>,
}

impl ModelMetadata {
    pub fn version_for(trained_at: DateTime<Utc>) -> String {
        trained_at.format("%Y%m%d_%H%M%S").to_string()
    }
}
