//! ML Model Inference
//!
//! [`TrainedModel`] bundles a validated regressor, its scaler and metadata.
//! [`ModelHandle`] owns the one-shot load lifecycle:
//!
//! ```text
//! Unloaded -> Loading -> Ready
//!                     \-> Failed
//! ```
//!
//! There is no way back out of `Ready` or `Failed` short of a restart.

use std::sync::Arc;

use anyhow::Result;
use parking_lot::RwLock;
use serde::Serialize;
use strum::Display;
use thiserror::Error;

use super::artifacts::{ArtifactPaths, StartupError};
use super::models::ScoredRegressor;
use super::scaler::StandardScaler;
use super::ModelMetadata;
use crate::forecast::{
    ConfidenceEstimator, FeatureExtractor, FeatureName, FeatureSchema, FeatureVector,
};

/// A loaded model ready to serve
pub struct TrainedModel {
    regressor: Box<dyn ScoredRegressor>,
    scaler: StandardScaler,
    metadata: ModelMetadata,
    extractor: FeatureExtractor,
    confidence: ConfidenceEstimator,
}

impl std::fmt::Debug for TrainedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainedModel")
            .field("version", &self.metadata.version)
            .field("model_type", &self.metadata.model_type)
            .field("schema", self.extractor.schema())
            .finish_non_exhaustive()
    }
}

impl TrainedModel {
    /// Assemble and cross-check the three artifacts.
    ///
    /// `expected` pins the feature order from configuration, if set.
    pub fn new(
        regressor: Box<dyn ScoredRegressor>,
        scaler: StandardScaler,
        metadata: ModelMetadata,
        expected: Option<&FeatureSchema>,
    ) -> Result<Self, StartupError> {
        let schema = FeatureSchema::parse(&metadata.feature_order)?;

        if let Some(expected) = expected {
            if expected != &schema {
                return Err(StartupError::FeatureOrderMismatch {
                    expected: expected.names(),
                    actual: schema.names(),
                });
            }
        }

        check_width("scaler", schema.len(), scaler.n_features())?;
        check_width("scaler", schema.len(), scaler.stds.len())?;
        check_width("regressor", schema.len(), regressor.n_features())?;

        for entry in &metadata.feature_importance {
            let known = entry
                .feature
                .parse::<FeatureName>()
                .map(|name| schema.contains(name))
                .unwrap_or(false);
            if !known {
                return Err(StartupError::UnknownImportanceFeature(entry.feature.clone()));
            }
        }

        let rmse = metadata.metrics.rmse;
        if !rmse.is_finite() || rmse < 0.0 {
            return Err(StartupError::InvalidRmse(rmse));
        }

        Ok(Self {
            regressor,
            scaler,
            confidence: ConfidenceEstimator::new(rmse),
            extractor: FeatureExtractor::new(schema),
            metadata,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.extractor.schema()
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn confidence(&self) -> &ConfidenceEstimator {
        &self.confidence
    }

    pub fn version(&self) -> &str {
        &self.metadata.version
    }

    pub fn rmse(&self) -> f64 {
        self.metadata.metrics.rmse
    }

    pub fn r2(&self) -> f64 {
        self.metadata.metrics.r2
    }

    /// True when the schema feeds the same-as-current stand-in for `load_24h_ago`
    pub fn uses_day_ago_proxy(&self) -> bool {
        self.schema().contains(FeatureName::Load24hAgo)
    }

    /// Scale raw features and run the regressor
    pub fn predict(&self, features: &FeatureVector) -> Result<f64> {
        if &features.schema != self.schema() {
            anyhow::bail!(
                "feature vector laid out as {:?}, model expects {:?}",
                features.schema.names(),
                self.schema().names()
            );
        }
        let scaled = self.scaler.transform(features)?;
        self.regressor.predict(&scaled)
    }
}

fn check_width(
    component: &'static str,
    expected: usize,
    actual: usize,
) -> Result<(), StartupError> {
    if expected == actual {
        Ok(())
    } else {
        Err(StartupError::WidthMismatch {
            component,
            expected,
            actual,
        })
    }
}

/// Externally visible lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ModelPhase {
    Unloaded,
    Loading,
    Ready,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("invalid model lifecycle transition from {from} to {to}")]
    InvalidTransition { from: ModelPhase, to: ModelPhase },
}

/// What was in place when a load gave up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadFailure {
    pub reason: String,
    pub model_loaded: bool,
    pub scaler_loaded: bool,
}

enum ModelState {
    Unloaded,
    Loading,
    Ready(Arc<TrainedModel>),
    Failed(LoadFailure),
}

impl ModelState {
    fn phase(&self) -> ModelPhase {
        match self {
            Self::Unloaded => ModelPhase::Unloaded,
            Self::Loading => ModelPhase::Loading,
            Self::Ready(_) => ModelPhase::Ready,
            Self::Failed(_) => ModelPhase::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelHealth {
    pub phase: ModelPhase,
    pub model_loaded: bool,
    pub scaler_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ModelHealth {
    pub fn is_healthy(&self) -> bool {
        self.phase == ModelPhase::Ready
    }
}

/// Shared slot holding the served model
pub struct ModelHandle {
    state: RwLock<ModelState>,
}

impl Default for ModelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelHandle {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ModelState::Unloaded),
        }
    }

    /// A handle already in `Ready`
    pub fn ready(model: TrainedModel) -> Self {
        Self {
            state: RwLock::new(ModelState::Ready(Arc::new(model))),
        }
    }

    pub fn phase(&self) -> ModelPhase {
        self.state.read().phase()
    }

    /// The served model, if loaded
    pub fn current(&self) -> Option<Arc<TrainedModel>> {
        match &*self.state.read() {
            ModelState::Ready(model) => Some(Arc::clone(model)),
            _ => None,
        }
    }

    pub fn health(&self) -> ModelHealth {
        match &*self.state.read() {
            ModelState::Ready(_) => ModelHealth {
                phase: ModelPhase::Ready,
                model_loaded: true,
                scaler_loaded: true,
                reason: None,
            },
            ModelState::Failed(failure) => ModelHealth {
                phase: ModelPhase::Failed,
                model_loaded: failure.model_loaded,
                scaler_loaded: failure.scaler_loaded,
                reason: Some(failure.reason.clone()),
            },
            other => ModelHealth {
                phase: other.phase(),
                model_loaded: false,
                scaler_loaded: false,
                reason: None,
            },
        }
    }

    /// `Unloaded -> Loading`
    pub fn begin_loading(&self) -> Result<(), LifecycleError> {
        let mut state = self.state.write();
        if !matches!(*state, ModelState::Unloaded) {
            return Err(LifecycleError::InvalidTransition {
                from: state.phase(),
                to: ModelPhase::Loading,
            });
        }
        *state = ModelState::Loading;
        Ok(())
    }

    /// `Loading -> Ready`
    pub fn complete(&self, model: TrainedModel) -> Result<Arc<TrainedModel>, LifecycleError> {
        let model = Arc::new(model);
        self.transition_from_loading(ModelState::Ready(Arc::clone(&model)))?;
        Ok(model)
    }

    /// `Loading -> Failed`
    pub fn fail(&self, failure: LoadFailure) -> Result<(), LifecycleError> {
        self.transition_from_loading(ModelState::Failed(failure))
    }

    fn transition_from_loading(&self, next: ModelState) -> Result<(), LifecycleError> {
        let mut state = self.state.write();
        if !matches!(*state, ModelState::Loading) {
            return Err(LifecycleError::InvalidTransition {
                from: state.phase(),
                to: next.phase(),
            });
        }
        *state = next;
        Ok(())
    }

    /// Read, validate and install artifacts from `paths`.
    ///
    /// On failure the handle ends in `Failed`, recording which of the model
    /// and scaler had been read.
    pub fn load(
        &self,
        paths: &ArtifactPaths,
        expected: Option<&FeatureSchema>,
    ) -> Result<Arc<TrainedModel>, StartupError> {
        self.begin_loading()?;
        tracing::info!(dir = %paths.dir().display(), "loading model artifacts");

        let mut progress = LoadProgress::default();
        match read_artifacts(paths, expected, &mut progress) {
            Ok(model) => {
                let model = self.complete(model)?;
                tracing::info!(
                    version = %model.version(),
                    model_type = %model.metadata().model_type,
                    rmse = model.rmse(),
                    r2 = model.r2(),
                    "model loaded"
                );
                Ok(model)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    model_loaded = progress.model_loaded,
                    scaler_loaded = progress.scaler_loaded,
                    "model load failed"
                );
                self.fail(LoadFailure {
                    reason: e.to_string(),
                    model_loaded: progress.model_loaded,
                    scaler_loaded: progress.scaler_loaded,
                })?;
                Err(e)
            }
        }
    }
}

#[derive(Debug, Default)]
struct LoadProgress {
    model_loaded: bool,
    scaler_loaded: bool,
}

/// Reads model, scaler, then metadata, so a failure stage tells what was loaded
fn read_artifacts(
    paths: &ArtifactPaths,
    expected: Option<&FeatureSchema>,
    progress: &mut LoadProgress,
) -> Result<TrainedModel, StartupError> {
    let regressor = paths.read_regressor()?;
    progress.model_loaded = true;
    let scaler = paths.read_scaler()?;
    progress.scaler_loaded = true;
    let metadata = paths.read_metadata()?;

    if metadata.model_type != regressor.model_type() {
        return Err(StartupError::ModelTypeMismatch {
            declared: metadata.model_type,
            stored: regressor.model_type(),
        });
    }
    TrainedModel::new(Box::new(regressor), scaler, metadata, expected)
}
