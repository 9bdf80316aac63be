//! Load Testing Suite
//!
//! Verifies the serving path under concurrent traffic:
//! - many clients hitting /predict at once
//! - record_actual writers racing /metrics readers
//!
//! Key Performance Requirements:
//! - p99 predict latency stays well under the request timeout
//! - no outcome recorded concurrently is lost
//! - the accuracy window never exceeds its capacity

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use load_forecaster::api;
use load_forecaster::ml::ModelHandle;
use serde_json::json;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tower::ServiceExt;

use crate::common::{body_json, constant_model, get, json_post, state_with};

/// Test: predict latency under 50 concurrent clients
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore] // Ignore by default as this is a slow test
async fn test_predict_latency_under_concurrent_load() {
    let app = api::router(state_with(ModelHandle::ready(constant_model(820.0, 20.0))));
    let latencies = Arc::new(Mutex::new(Vec::new()));

    let mut clients = JoinSet::new();
    for i in 0..50 {
        let app = app.clone();
        let latencies = Arc::clone(&latencies);
        clients.spawn(async move {
            for j in 0..20 {
                let history: Vec<f64> = (0..(i + j) % 48).map(|h| 500.0 + h as f64).collect();
                let current_time = format!("2024-01-{:02}T{:02}:00:00", 1 + i % 28, j % 24);
                let start = Instant::now();
                let response = app
                    .clone()
                    .oneshot(json_post(
                        "/predict",
                        json!({
                            "current_time": current_time,
                            "current_load": 600.0 + i as f64,
                            "historical_loads": history,
                        }),
                    ))
                    .await
                    .unwrap();
                latencies.lock().await.push(start.elapsed());
                assert_eq!(response.status(), StatusCode::OK);
            }
        });
    }
    while let Some(result) = clients.join_next().await {
        result.unwrap();
    }

    let mut measurements = latencies.lock().await.clone();
    measurements.sort();
    let p99 = measurements[measurements.len() * 99 / 100];
    let avg: Duration = measurements.iter().sum::<Duration>() / measurements.len() as u32;

    println!("Predict latency - p99: {:?}, Avg: {:?}", p99, avg);
    assert_eq!(measurements.len(), 1000);
    assert!(p99 < Duration::from_secs(1), "p99 latency exceeded 1s: {:?}", p99);

    let body = body_json(app.oneshot(get("/metrics")).await.unwrap()).await;
    assert_eq!(body["forecasts_issued"], 1000);
}

/// Test: concurrent record_actual writers and metrics readers
///
/// Writers must not lose outcomes and readers must never observe a window
/// larger than its capacity.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore] // Ignore by default as this is a slow test
async fn test_concurrent_record_and_metrics() {
    let state = state_with(ModelHandle::ready(constant_model(820.0, 20.0)));
    let capacity = state.tracker.capacity();
    let app = api::router(state.clone());

    let mut tasks = JoinSet::new();

    // Spawn 10 writers
    for w in 0..10 {
        let app = app.clone();
        tasks.spawn(async move {
            for k in 0..200 {
                let response = app
                    .clone()
                    .oneshot(json_post(
                        "/record_actual",
                        json!({"predicted_load": 500.0 + w as f64, "actual_load": 500.0 + k as f64}),
                    ))
                    .await
                    .unwrap();
                assert_eq!(response.status(), StatusCode::OK);
            }
        });
    }

    // Spawn 10 readers
    for _ in 0..10 {
        let app = app.clone();
        tasks.spawn(async move {
            for _ in 0..50 {
                let body = body_json(app.clone().oneshot(get("/metrics")).await.unwrap()).await;
                let window = body["window_size"].as_u64().unwrap() as usize;
                assert!(window <= capacity, "window {} over capacity", window);
                tokio::time::sleep(Duration::from_micros(100)).await;
            }
        });
    }

    while let Some(result) = tasks.join_next().await {
        result.unwrap();
    }

    let snapshot = state.tracker.snapshot();
    assert_eq!(snapshot.predictions_served, 2000);
    assert_eq!(snapshot.window_size, capacity);
}
