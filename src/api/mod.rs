pub mod error;
pub mod fields;
pub mod health;
pub mod metrics;
pub mod predict;
pub mod record;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let cfg = state.cfg.clone();

    let mut router = Router::new()
        .route("/predict", post(predict::predict))
        .route("/record_actual", post(record::record_actual))
        .route("/metrics", get(metrics::metrics))
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness_check))
        .route("/health/ready", get(health::readiness_check))
        .with_state(state);

    if let Some(origin) = &cfg.server.cors_origin {
        match origin.parse::<HeaderValue>() {
            Ok(origin) => {
                let cors = CorsLayer::new()
                    .allow_origin(origin)
                    .allow_methods([Method::GET, Method::POST])
                    .allow_headers([header::CONTENT_TYPE]);
                router = router.layer(cors);
            }
            Err(e) => tracing::warn!(%origin, error = %e, "ignoring invalid CORS origin"),
        }
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(axum::extract::DefaultBodyLimit::max(1024 * 1024))
                .layer(TimeoutLayer::new(cfg.server.request_timeout())),
        )
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
}

#[cfg(feature = "metrics")]
pub fn with_metrics(app: Router) -> Router {
    use axum_prometheus::PrometheusMetricLayer;
    let (layer, handle) = PrometheusMetricLayer::pair();

    let metrics_router = Router::new().route(
        "/prometheus",
        get(move || async move { handle.render() }),
    );

    app.layer(layer).merge(metrics_router)
}
