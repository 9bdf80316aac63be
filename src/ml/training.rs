//! ML Model Training Pipeline
//!
//! Offline path from a load series to a fitted model:
//! lagged rows -> chronological split -> scaler on the train part ->
//! regressor -> test metrics and permutation importance.

use anyhow::Result;
use chrono::Utc;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};

use super::artifacts::RegressorArtifact;
use super::models::LinearRegressionModel;
use super::scaler::StandardScaler;
use super::smartcore::{RandomForestModel, RandomForestParams};
use super::{FeatureImportance, ModelMetadata, ModelType, ValidationMetrics};
use crate::forecast::{FeatureExtractor, FeatureSchema, ForecastMetrics};
use crate::simulation::LaggedSample;

/// Training Dataset
///
/// Rows stay in time order; nothing here shuffles.
#[derive(Debug, Clone)]
pub struct TrainingDataset {
    pub schema: FeatureSchema,
    pub rows: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
}

impl TrainingDataset {
    pub fn new(schema: FeatureSchema, rows: Vec<Vec<f64>>, targets: Vec<f64>) -> Result<Self> {
        if rows.len() != targets.len() {
            anyhow::bail!(
                "Feature and target count mismatch: {} features, {} targets",
                rows.len(),
                targets.len()
            );
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != schema.len()) {
            anyhow::bail!(
                "Row width {} does not match schema width {}",
                bad.len(),
                schema.len()
            );
        }
        Ok(Self {
            schema,
            rows,
            targets,
        })
    }

    /// Lay out lagged samples with the given schema
    pub fn from_lagged(schema: FeatureSchema, samples: &[LaggedSample]) -> Self {
        let extractor = FeatureExtractor::new(schema.clone());
        let (rows, targets) = samples
            .iter()
            .map(|s| {
                let vector = extractor.extract_with_lags(s.sample.timestamp, s.lags);
                (vector.values, s.target)
            })
            .unzip();

        Self {
            schema,
            rows,
            targets,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Chronological split: the first `train_ratio` of rows train, the rest test
    pub fn split(&self, train_ratio: f64) -> Result<(TrainingDataset, TrainingDataset)> {
        if train_ratio <= 0.0 || train_ratio >= 1.0 {
            anyhow::bail!("Train ratio must be between 0 and 1");
        }

        let split_idx = (self.len() as f64 * train_ratio).floor() as usize;
        if split_idx == 0 || split_idx == self.len() {
            anyhow::bail!(
                "Split of {} rows at ratio {} leaves an empty side",
                self.len(),
                train_ratio
            );
        }

        let train = TrainingDataset {
            schema: self.schema.clone(),
            rows: self.rows[..split_idx].to_vec(),
            targets: self.targets[..split_idx].to_vec(),
        };

        let test = TrainingDataset {
            schema: self.schema.clone(),
            rows: self.rows[split_idx..].to_vec(),
            targets: self.targets[split_idx..].to_vec(),
        };

        Ok((train, test))
    }
}

/// Training Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub model_type: ModelType,
    pub train_ratio: f64,
    /// Columns to train on, in order
    pub features: FeatureSchema,
    pub forest: RandomForestParams,
    /// Linear baseline only
    pub learning_rate: f64,
    /// Linear baseline only
    pub max_iterations: usize,
    pub target_rmse: f64,
    pub target_r2: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            model_type: ModelType::RandomForest,
            train_ratio: 0.8,
            features: FeatureSchema::default(),
            forest: RandomForestParams::default(),
            learning_rate: 0.05,
            max_iterations: 1000,
            target_rmse: 100.0,
            target_r2: 0.85,
        }
    }
}

/// Everything produced by one training run
#[derive(Debug)]
pub struct TrainingOutcome {
    pub regressor: RegressorArtifact,
    pub scaler: StandardScaler,
    pub metadata: ModelMetadata,
    pub test_metrics: ForecastMetrics,
}

impl TrainingOutcome {
    pub fn meets_targets(&self, config: &TrainingConfig) -> bool {
        self.test_metrics
            .meets_targets(config.target_rmse, config.target_r2)
    }
}

/// Model Trainer
pub struct ModelTrainer {
    config: TrainingConfig,
}

impl ModelTrainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Build the dataset from lagged samples using the configured schema
    pub fn dataset(&self, samples: &[LaggedSample]) -> TrainingDataset {
        TrainingDataset::from_lagged(self.config.features.clone(), samples)
    }

    pub fn train(&self, dataset: &TrainingDataset) -> Result<TrainingOutcome> {
        if dataset.is_empty() {
            anyhow::bail!("Cannot train on empty dataset");
        }

        let (train, test) = dataset.split(self.config.train_ratio)?;
        tracing::info!(
            train_rows = train.len(),
            test_rows = test.len(),
            model_type = %self.config.model_type,
            "training model"
        );

        let scaler = StandardScaler::fit(&train.rows)?;
        let train_x = scale_rows(&scaler, &train.rows)?;
        let test_x = scale_rows(&scaler, &test.rows)?;

        let regressor = match self.config.model_type {
            ModelType::RandomForest => RegressorArtifact::RandomForest(RandomForestModel::train(
                &train_x,
                &train.targets,
                self.config.forest,
            )?),
            ModelType::LinearRegression => {
                RegressorArtifact::Linear(LinearRegressionModel::fit(
                    &train_x,
                    &train.targets,
                    self.config.learning_rate,
                    self.config.max_iterations,
                )?)
            }
        };

        let predictions = regressor.predict_rows(&test_x)?;
        let test_metrics = ForecastMetrics::calculate(&test.targets, &predictions)?;
        tracing::info!(%test_metrics, "test split evaluated");

        let feature_importance = self.permutation_importance(
            &regressor,
            &dataset.schema,
            &test_x,
            &test.targets,
            test_metrics.rmse,
        )?;

        let trained_at = Utc::now();
        let metadata = ModelMetadata {
            version: ModelMetadata::version_for(trained_at),
            model_type: self.config.model_type,
            trained_at,
            training_samples: train.len(),
            test_samples: test.len(),
            metrics: ValidationMetrics::from(&test_metrics),
            feature_importance,
            feature_order: dataset.schema.names(),
        };

        Ok(TrainingOutcome {
            regressor,
            scaler,
            metadata,
            test_metrics,
        })
    }

    /// Increase in test RMSE when one column is shuffled, normalized to sum 1.
    /// Sorted by descending importance.
    fn permutation_importance(
        &self,
        regressor: &RegressorArtifact,
        schema: &FeatureSchema,
        test_x: &[Vec<f64>],
        targets: &[f64],
        baseline_rmse: f64,
    ) -> Result<Vec<FeatureImportance>> {
        let mut rng = StdRng::seed_from_u64(self.config.forest.seed);
        let mut raw = Vec::with_capacity(schema.len());

        for (col, name) in schema.iter().enumerate() {
            let mut column: Vec<f64> = test_x.iter().map(|r| r[col]).collect();
            column.shuffle(&mut rng);

            let permuted: Vec<Vec<f64>> = test_x
                .iter()
                .zip(&column)
                .map(|(row, v)| {
                    let mut row = row.clone();
                    row[col] = *v;
                    row
                })
                .collect();

            let predictions = regressor.predict_rows(&permuted)?;
            let rmse = ForecastMetrics::calculate(targets, &predictions)?.rmse;
            raw.push((name.to_string(), (rmse - baseline_rmse).max(0.0)));
        }

        let total: f64 = raw.iter().map(|(_, v)| v).sum();
        let mut importance: Vec<FeatureImportance> = raw
            .into_iter()
            .map(|(feature, v)| FeatureImportance {
                feature,
                importance: if total > 0.0 { v / total } else { 0.0 },
            })
            .collect();
        importance.sort_by(|a, b| b.importance.total_cmp(&a.importance));

        Ok(importance)
    }
}

fn scale_rows(scaler: &StandardScaler, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
    rows.iter().map(|r| scaler.transform_row(r)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{lagged_samples, WorkloadSimulator, WorkloadSimulatorConfig};

    fn linear_dataset(n: usize) -> TrainingDataset {
        let schema = FeatureSchema::parse(&["hour_of_day", "load_1h_ago"]).unwrap();
        let rows: Vec<Vec<f64>> = (0..n)
            .map(|i| vec![(i % 24) as f64, 100.0 + i as f64])
            .collect();
        let targets = rows.iter().map(|r| 3.0 * r[1] + 10.0).collect();
        TrainingDataset::new(schema, rows, targets).unwrap()
    }

    #[test]
    fn test_dataset_split_is_chronological() {
        let dataset = linear_dataset(10);
        let (train, test) = dataset.split(0.8).unwrap();

        assert_eq!(train.len(), 8);
        assert_eq!(test.len(), 2);
        assert_eq!(test.rows[0], dataset.rows[8]);
        assert!(dataset.split(1.0).is_err());
        assert!(linear_dataset(1).split(0.5).is_err());
    }

    #[test]
    fn test_dataset_rejects_wrong_width() {
        let schema = FeatureSchema::parse(&["hour_of_day"]).unwrap();
        assert!(TrainingDataset::new(schema, vec![vec![1.0, 2.0]], vec![1.0]).is_err());
    }

    #[test]
    fn test_train_linear_regression() {
        let config = TrainingConfig {
            model_type: ModelType::LinearRegression,
            features: FeatureSchema::parse(&["hour_of_day", "load_1h_ago"]).unwrap(),
            learning_rate: 0.1,
            max_iterations: 3000,
            ..Default::default()
        };
        let trainer = ModelTrainer::new(config);
        let outcome = trainer.train(&linear_dataset(200)).unwrap();

        assert_eq!(outcome.metadata.model_type, ModelType::LinearRegression);
        assert_eq!(outcome.metadata.training_samples, 160);
        assert_eq!(outcome.metadata.test_samples, 40);
        assert_eq!(outcome.metadata.feature_order, vec!["hour_of_day", "load_1h_ago"]);
        assert!(outcome.test_metrics.r2 > 0.9, "r2 = {}", outcome.test_metrics.r2);

        // The target only depends on load_1h_ago
        assert_eq!(outcome.metadata.feature_importance[0].feature, "load_1h_ago");
        let total: f64 = outcome
            .metadata
            .feature_importance
            .iter()
            .map(|f| f.importance)
            .sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_train_forest_on_simulated_series() {
        let sim = WorkloadSimulator::new(WorkloadSimulatorConfig {
            months: 1,
            ..Default::default()
        });
        let samples = lagged_samples(&sim.generate());

        let config = TrainingConfig {
            forest: RandomForestParams {
                n_trees: 10,
                max_depth: Some(8),
                ..Default::default()
            },
            ..Default::default()
        };
        let trainer = ModelTrainer::new(config);
        let dataset = trainer.dataset(&samples);
        assert_eq!(dataset.schema.len(), 8);

        let outcome = trainer.train(&dataset).unwrap();
        assert_eq!(outcome.scaler.n_features(), 8);
        assert!(outcome.metadata.metrics.rmse.is_finite());
        assert!(outcome.metadata.metrics.rmse >= 0.0);
        assert_eq!(outcome.metadata.feature_importance.len(), 8);
        assert!(outcome
            .metadata
            .feature_importance
            .windows(2)
            .all(|w| w[0].importance >= w[1].importance));
    }
}
