//! Offline training: simulate a workload, fit a model, write artifacts.

use anyhow::Result;
use itertools::Itertools;
use load_forecaster::{
    config::Config,
    ml::ModelTrainer,
    simulation::{lagged_samples, SeriesSummary, WorkloadSimulator},
    telemetry::init_tracing,
};
use tracing::{info, warn};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;
    init_tracing(cfg.logging.format);

    let series = WorkloadSimulator::new(cfg.simulation.clone()).generate();
    if let Some(summary) = SeriesSummary::from_series(&series) {
        info!(
            samples = summary.samples,
            mean_load = summary.mean_load,
            peak_ratio = summary.peak_ratio(),
            weekend_reduction = summary.weekend_reduction(),
            "workload simulated"
        );
    }

    let trainer = ModelTrainer::new(cfg.training.clone());
    let dataset = trainer.dataset(&lagged_samples(&series));
    info!(
        rows = dataset.len(),
        features = %dataset.schema.iter().join(","),
        "dataset built"
    );

    let outcome = trainer.train(&dataset)?;

    for entry in outcome.metadata.feature_importance.iter().take(5) {
        info!(feature = %entry.feature, importance = entry.importance, "feature importance");
    }

    if outcome.meets_targets(trainer.config()) {
        info!(
            rmse = outcome.test_metrics.rmse,
            r2 = outcome.test_metrics.r2,
            "quality targets met"
        );
    } else {
        warn!(
            rmse = outcome.test_metrics.rmse,
            r2 = outcome.test_metrics.r2,
            target_rmse = cfg.training.target_rmse,
            target_r2 = cfg.training.target_r2,
            "quality targets missed"
        );
    }

    cfg.model
        .paths()
        .save(&outcome.regressor, &outcome.scaler, &outcome.metadata)?;

    info!(version = %outcome.metadata.version, "training complete");
    Ok(())
}
