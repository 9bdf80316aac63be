//! SmartCore RandomForest wrapper
//!
//! Thin adapter from smartcore's `RandomForestRegressor` to [`ScoredRegressor`].
//! The fitted forest is serde-serializable, so it persists through bincode as-is.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

use super::models::ScoredRegressor;
use crate::forecast::FeatureVector;

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Forest hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomForestParams {
    pub n_trees: usize,
    pub max_depth: Option<u16>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: Some(20),
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

impl From<RandomForestParams> for RandomForestRegressorParameters {
    fn from(p: RandomForestParams) -> Self {
        RandomForestRegressorParameters {
            max_depth: p.max_depth,
            min_samples_leaf: p.min_samples_leaf,
            min_samples_split: p.min_samples_split,
            n_trees: p.n_trees,
            m: None,             // sqrt(n_features)
            keep_samples: false, // Don't store training samples
            seed: p.seed,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RandomForestModel {
    forest: Forest,
    n_features: usize,
    pub params: RandomForestParams,
}

impl RandomForestModel {
    /// Train on row-major, already scaled data
    pub fn train(x: &[Vec<f64>], y: &[f64], params: RandomForestParams) -> Result<Self> {
        if x.is_empty() || y.is_empty() {
            anyhow::bail!("Cannot train on empty dataset");
        }

        if x.len() != y.len() {
            anyhow::bail!(
                "Feature and target count mismatch: {} features, {} targets",
                x.len(),
                y.len()
            );
        }

        let x_matrix = to_matrix(x)?;
        let forest = RandomForestRegressor::fit(&x_matrix, &y.to_vec(), params.into())
            .map_err(|e| anyhow::anyhow!("RandomForest training failed: {:?}", e))?;

        Ok(Self {
            forest,
            n_features: x[0].len(),
            params,
        })
    }

    /// Predict many rows at once
    pub fn predict_rows(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        if x.is_empty() {
            return Ok(Vec::new());
        }
        let x_matrix = to_matrix(x)?;
        self.forest
            .predict(&x_matrix)
            .map_err(|e| anyhow::anyhow!("Prediction failed: {:?}", e))
    }
}

impl ScoredRegressor for RandomForestModel {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        if features.len() != self.n_features {
            anyhow::bail!(
                "Feature count mismatch: expected {}, got {}",
                self.n_features,
                features.len()
            );
        }

        // One row, n features
        let x = DenseMatrix::new(1, self.n_features, features.values.clone(), false);
        let predictions = self
            .forest
            .predict(&x)
            .map_err(|e| anyhow::anyhow!("Prediction failed: {:?}", e))?;

        predictions
            .first()
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Model returned empty predictions"))
    }

    fn n_features(&self) -> usize {
        self.n_features
    }
}

fn to_matrix(x: &[Vec<f64>]) -> Result<DenseMatrix<f64>> {
    let n_samples = x.len();
    let n_features = x[0].len();

    let mut flat_data = Vec::with_capacity(n_samples * n_features);
    for row in x {
        if row.len() != n_features {
            anyhow::bail!("All feature vectors must have the same length");
        }
        flat_data.extend_from_slice(row);
    }

    Ok(DenseMatrix::new(n_samples, n_features, flat_data, false))
}
