//! Z-score standardization fitted on the training split.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::forecast::FeatureVector;

/// Per-column mean and population standard deviation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

impl StandardScaler {
    /// Fit on row-major data. All rows must share the first row's width.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let Some(first) = rows.first() else {
            anyhow::bail!("Cannot fit scaler on empty data");
        };
        let width = first.len();
        if rows.iter().any(|r| r.len() != width) {
            anyhow::bail!("All feature rows must have the same length");
        }

        let n = rows.len() as f64;
        let mut means = vec![0.0; width];
        for row in rows {
            for (m, v) in means.iter_mut().zip(row) {
                *m += v / n;
            }
        }

        let mut stds = vec![0.0; width];
        for row in rows {
            for ((s, v), m) in stds.iter_mut().zip(row).zip(&means) {
                *s += (v - m).powi(2) / n;
            }
        }
        stds.iter_mut().for_each(|s| *s = s.sqrt());

        Ok(Self { means, stds })
    }

    pub fn n_features(&self) -> usize {
        self.means.len()
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.means.len() || self.stds.len() != self.means.len() {
            anyhow::bail!(
                "Standardization parameter count mismatch: scaler has {}, row has {}",
                self.means.len(),
                row.len()
            );
        }

        Ok(row
            .iter()
            .zip(self.means.iter().zip(self.stds.iter()))
            .map(|(f, (mean, std))| {
                if std.abs() < 1e-10 {
                    0.0 // Constant column
                } else {
                    (f - mean) / std
                }
            })
            .collect())
    }

    pub fn transform(&self, features: &FeatureVector) -> Result<FeatureVector> {
        Ok(features.with_values(self.transform_row(&features.values)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_and_transform() {
        let rows = vec![vec![1.0, 10.0], vec![3.0, 10.0]];
        let scaler = StandardScaler::fit(&rows).unwrap();

        assert_eq!(scaler.means, vec![2.0, 10.0]);
        assert_eq!(scaler.stds, vec![1.0, 0.0]);
        // Constant column maps to zero
        assert_eq!(scaler.transform_row(&[3.0, 10.0]).unwrap(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_width_mismatch_rejected() {
        let scaler = StandardScaler::fit(&[vec![1.0, 2.0]]).unwrap();
        assert!(scaler.transform_row(&[1.0]).is_err());
        assert!(StandardScaler::fit(&[vec![1.0], vec![1.0, 2.0]]).is_err());
        assert!(StandardScaler::fit(&[]).is_err());
    }
}
