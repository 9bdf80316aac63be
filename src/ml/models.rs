//! ML Model Definitions
//!
//! The narrow regressor interface the serving path depends on, plus a linear
//! baseline implementation.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::forecast::FeatureVector;

/// A fitted regressor: scaled features in, scalar forecast out
#[cfg_attr(test, mockall::automock)]
pub trait ScoredRegressor: Send + Sync {
    /// Predict a value from (already scaled) features
    fn predict(&self, features: &FeatureVector) -> Result<f64>;

    /// Number of input columns the regressor was fitted on
    fn n_features(&self) -> usize;
}

/// Simple Linear Regression Model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegressionModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LinearRegressionModel {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            coefficients,
            intercept,
        }
    }

    /// Fit by batch gradient descent on standardized inputs
    pub fn fit(x: &[Vec<f64>], y: &[f64], learning_rate: f64, iterations: usize) -> Result<Self> {
        if x.is_empty() || x.len() != y.len() {
            anyhow::bail!(
                "Cannot fit on {} rows with {} targets",
                x.len(),
                y.len()
            );
        }

        let n_features = x[0].len();
        let n = x.len() as f64;
        let mut coefficients = vec![0.0; n_features];
        let mut intercept = 0.0;

        for _ in 0..iterations {
            let mut coef_gradients = vec![0.0; n_features];
            let mut intercept_gradient = 0.0;

            for (row, target) in x.iter().zip(y.iter()) {
                let error = dot(row, &coefficients) + intercept - target;
                for (g, v) in coef_gradients.iter_mut().zip(row.iter()) {
                    *g += error * v / n;
                }
                intercept_gradient += error / n;
            }

            for (c, g) in coefficients.iter_mut().zip(coef_gradients.iter()) {
                *c -= learning_rate * g;
            }
            intercept -= learning_rate * intercept_gradient;
        }

        Ok(Self::new(coefficients, intercept))
    }

    /// Batch prediction over scaled rows; every row must match the fitted width
    pub fn predict_rows(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        rows.iter().map(|row| self.predict_row(row)).collect()
    }

    fn predict_row(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.coefficients.len() {
            anyhow::bail!(
                "Feature count mismatch: expected {}, got {}",
                self.coefficients.len(),
                row.len()
            );
        }

        Ok(dot(row, &self.coefficients) + self.intercept)
    }
}

impl ScoredRegressor for LinearRegressionModel {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        self.predict_row(&features.values)
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
