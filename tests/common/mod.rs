#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::{body::Body, http::Request, Router};
use chrono::Utc;
use load_forecaster::api;
use load_forecaster::config::Config;
use load_forecaster::forecast::FeatureSchema;
use load_forecaster::ml::{
    LinearRegressionModel, ModelHandle, ModelMetadata, ModelType, StandardScaler, TrainedModel,
    ValidationMetrics,
};
use load_forecaster::state::AppState;

/// A model that always predicts `value`, with the given training RMSE
pub fn constant_model(value: f64, rmse: f64) -> TrainedModel {
    let schema = FeatureSchema::default();
    let width = schema.len();
    let regressor = LinearRegressionModel::new(vec![0.0; width], value);
    let metadata = ModelMetadata {
        version: "20240101_120000".into(),
        model_type: ModelType::LinearRegression,
        trained_at: Utc::now(),
        training_samples: 800,
        test_samples: 200,
        metrics: ValidationMetrics::new(rmse, 15.0, 0.91234, 6.5),
        feature_importance: Vec::new(),
        feature_order: schema.names(),
    };
    let scaler = StandardScaler {
        means: vec![0.0; width],
        stds: vec![1.0; width],
    };
    TrainedModel::new(Box::new(regressor), scaler, metadata, None).expect("valid test model")
}

pub fn state_with(model: ModelHandle) -> AppState {
    AppState::new(Config::default(), Arc::new(model))
}

pub fn app_with(model: ModelHandle) -> Router {
    api::router(state_with(model))
}

pub fn ready_app() -> Router {
    app_with(ModelHandle::ready(constant_model(820.0, 20.0)))
}

pub fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn temp_artifact_dir() -> PathBuf {
    std::env::temp_dir().join(format!("load-forecaster-test-{}", uuid::Uuid::new_v4()))
}
