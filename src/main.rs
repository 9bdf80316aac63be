use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use itertools::Itertools;
use load_forecaster::{api, config, ml::ModelHandle, state::AppState, telemetry};
use config::Config;
use telemetry::init_tracing;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;
    init_tracing(cfg.logging.format);

    let model = Arc::new(ModelHandle::new());
    let paths = cfg.model.paths();
    let expected = cfg.model.expected_feature_order.clone();

    let load_handle = Arc::clone(&model);
    let loaded =
        tokio::task::spawn_blocking(move || load_handle.load(&paths, expected.as_ref())).await?;

    match loaded {
        Ok(model) => {
            info!(
                version = %model.version(),
                features = %model.schema().iter().join(","),
                "serving model"
            );
            if model.uses_day_ago_proxy() {
                warn!(
                    "model uses load_24h_ago; requests only carry recent history, \
                    so it is served as current_load"
                );
            }
        }
        Err(e) => {
            error!(error = %e, "model artifacts unusable; serving as unhealthy");
        }
    }

    let app_state = AppState::new(cfg.clone(), model);

    #[allow(unused_mut)]
    let mut app: Router = api::router(app_state);

    #[cfg(feature = "metrics")]
    {
        app = api::with_metrics(app);
    }

    let addr = cfg.server.socket_addr()?;

    if cfg.server.host == "0.0.0.0" {
        warn!("server binding to 0.0.0.0 - service will be reachable from the network");
    }

    info!(%addr, "starting load forecaster");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    warn!("shutdown complete");
    Ok(())
}
