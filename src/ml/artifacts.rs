//! Persisted model artifacts
//!
//! Layout of an artifact directory:
//!
//! ```text
//! model.bin              bincode RegressorArtifact
//! model_<version>.bin    versioned copy of model.bin
//! scaler.bin             bincode StandardScaler
//! model_metadata.json    ModelMetadata
//! ```

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::inference::LifecycleError;
use super::models::{LinearRegressionModel, ScoredRegressor};
use super::scaler::StandardScaler;
use super::smartcore::RandomForestModel;
use super::{ModelMetadata, ModelType};
use crate::forecast::{FeatureVector, SchemaError};

pub const MODEL_FILE: &str = "model.bin";
pub const SCALER_FILE: &str = "scaler.bin";
pub const METADATA_FILE: &str = "model_metadata.json";

/// Fatal problems with the artifacts a server starts from
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("{artifact} not found at {}", path.display())]
    Missing { artifact: &'static str, path: PathBuf },

    #[error("failed to read {artifact} from {}: {reason}", path.display())]
    Corrupt {
        artifact: &'static str,
        path: PathBuf,
        reason: String,
    },

    #[error("invalid feature_order in metadata: {0}")]
    FeatureOrder(#[from] SchemaError),

    #[error("feature_order {actual:?} does not match configured order {expected:?}")]
    FeatureOrderMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("{component} expects {actual} features, schema has {expected}")]
    WidthMismatch {
        component: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("feature importance names unknown feature '{0}'")]
    UnknownImportanceFeature(String),

    #[error("metadata rmse {0} is not a finite non-negative number")]
    InvalidRmse(f64),

    #[error("metadata declares {declared} but model.bin holds {stored}")]
    ModelTypeMismatch { declared: ModelType, stored: ModelType },

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// A persisted regressor of any supported type
#[derive(Debug, Serialize, Deserialize)]
pub enum RegressorArtifact {
    RandomForest(RandomForestModel),
    Linear(LinearRegressionModel),
}

impl RegressorArtifact {
    pub fn model_type(&self) -> ModelType {
        match self {
            Self::RandomForest(_) => ModelType::RandomForest,
            Self::Linear(_) => ModelType::LinearRegression,
        }
    }

    /// Batch prediction over scaled rows
    pub fn predict_rows(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        match self {
            Self::RandomForest(forest) => forest.predict_rows(rows),
            Self::Linear(linear) => linear.predict_rows(rows),
        }
    }
}

impl ScoredRegressor for RegressorArtifact {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        match self {
            Self::RandomForest(forest) => forest.predict(features),
            Self::Linear(linear) => linear.predict(features),
        }
    }

    fn n_features(&self) -> usize {
        match self {
            Self::RandomForest(forest) => forest.n_features(),
            Self::Linear(linear) => linear.n_features(),
        }
    }
}

/// File locations inside one artifact directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    dir: PathBuf,
}

impl ArtifactPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }

    pub fn scaler(&self) -> PathBuf {
        self.dir.join(SCALER_FILE)
    }

    pub fn metadata(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    pub fn versioned_model(&self, version: &str) -> PathBuf {
        self.dir.join(format!("model_{version}.bin"))
    }

    /// Write all artifacts, replacing any previous set
    pub fn save(
        &self,
        regressor: &RegressorArtifact,
        scaler: &StandardScaler,
        metadata: &ModelMetadata,
    ) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating artifact dir {}", self.dir.display()))?;

        write_bincode(&self.model(), regressor)?;
        write_bincode(&self.scaler(), scaler)?;

        let versioned = self.versioned_model(&metadata.version);
        fs::copy(self.model(), &versioned)
            .with_context(|| format!("writing {}", versioned.display()))?;

        write_with(&self.metadata(), |writer| {
            serde_json::to_writer_pretty(writer, metadata).map_err(Into::into)
        })?;

        tracing::info!(
            dir = %self.dir.display(),
            version = %metadata.version,
            "model artifacts saved"
        );
        Ok(())
    }

    pub fn read_regressor(&self) -> Result<RegressorArtifact, StartupError> {
        read_bincode(&self.model(), "model")
    }

    pub fn read_scaler(&self) -> Result<StandardScaler, StartupError> {
        read_bincode(&self.scaler(), "scaler")
    }

    pub fn read_metadata(&self) -> Result<ModelMetadata, StartupError> {
        let path = self.metadata();
        let file = open(&path, "metadata")?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| StartupError::Corrupt {
            artifact: "metadata",
            path,
            reason: e.to_string(),
        })
    }
}

fn write_bincode<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    write_with(path, |writer| bincode::serialize_into(writer, value).map_err(Into::into))
}

/// Buffered write that only succeeds once the final flush does
fn write_with<F>(path: &Path, encode: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    encode(&mut writer).with_context(|| format!("encoding {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("flushing {}", path.display()))
}

fn read_bincode<T: for<'de> Deserialize<'de>>(
    path: &Path,
    artifact: &'static str,
) -> Result<T, StartupError> {
    let file = open(path, artifact)?;
    bincode::deserialize_from(BufReader::new(file)).map_err(|e| StartupError::Corrupt {
        artifact,
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn open(path: &Path, artifact: &'static str) -> Result<File, StartupError> {
    File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StartupError::Missing {
                artifact,
                path: path.to_path_buf(),
            }
        } else {
            StartupError::Corrupt {
                artifact,
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::ValidationMetrics;
    use chrono::Utc;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("load-forecaster-artifacts-{}", uuid::Uuid::new_v4()))
    }

    fn metadata() -> ModelMetadata {
        let trained_at = Utc::now();
        ModelMetadata {
            version: ModelMetadata::version_for(trained_at),
            model_type: ModelType::LinearRegression,
            trained_at,
            training_samples: 8,
            test_samples: 2,
            metrics: ValidationMetrics::new(20.0, 15.0, 0.9, 3.0),
            feature_importance: Vec::new(),
            feature_order: vec!["hour_of_day".into(), "load_1h_ago".into()],
        }
    }

    #[test]
    fn test_save_then_read_back() {
        let dir = temp_dir();
        let paths = ArtifactPaths::new(&dir);
        let regressor = RegressorArtifact::Linear(LinearRegressionModel::new(vec![1.0, 2.0], 3.0));
        let scaler = StandardScaler {
            means: vec![12.0, 500.0],
            stds: vec![6.0, 100.0],
        };
        let meta = metadata();

        paths.save(&regressor, &scaler, &meta).unwrap();

        assert!(paths.versioned_model(&meta.version).exists());
        assert_eq!(paths.read_scaler().unwrap(), scaler);
        assert_eq!(paths.read_metadata().unwrap(), meta);
        let restored = paths.read_regressor().unwrap();
        assert_eq!(restored.model_type(), ModelType::LinearRegression);
        assert_eq!(restored.n_features(), 2);

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_missing_and_corrupt_files() {
        let dir = temp_dir();
        let paths = ArtifactPaths::new(&dir);
        assert!(matches!(
            paths.read_regressor(),
            Err(StartupError::Missing { artifact: "model", .. })
        ));

        fs::create_dir_all(&dir).unwrap();
        fs::write(paths.metadata(), "{not json").unwrap();
        assert!(matches!(
            paths.read_metadata(),
            Err(StartupError::Corrupt { artifact: "metadata", .. })
        ));

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_linear_batch_matches_single() {
        let linear = LinearRegressionModel::new(vec![2.0, -1.0], 0.5);
        let artifact = RegressorArtifact::Linear(linear);
        let rows = artifact.predict_rows(&[vec![1.0, 1.0], vec![0.0, 2.0]]).unwrap();
        assert_eq!(rows, vec![1.5, -1.5]);
        assert!(artifact.predict_rows(&[vec![1.0]]).is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_write_surfaces_failed_flush() {
        // Writes to /dev/full fail with ENOSPC once the buffer is flushed
        let full = Path::new("/dev/full");
        assert!(write_bincode(full, &vec![1.0f64; 4]).is_err());
        let json = write_with(full, |writer| {
            serde_json::to_writer(writer, &metadata()).map_err(Into::into)
        });
        assert!(json.is_err());
    }
}
