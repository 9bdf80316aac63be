//! # Workload Simulation Module
//!
//! Synthetic request-load series used to build training data offline.
//!
//! ## Usage
//!
//! ```rust
//! use load_forecaster::simulation::{lagged_samples, WorkloadSimulator, WorkloadSimulatorConfig};
//!
//! let config = WorkloadSimulatorConfig {
//!     months: 1,
//!     seed: 7,
//!     ..Default::default()
//! };
//!
//! let series = WorkloadSimulator::new(config).generate();
//! assert_eq!(series.len(), 24 * 30);
//!
//! // Rows with past-only lags and a next-hour target
//! let rows = lagged_samples(&series);
//! assert_eq!(rows.len(), series.len() - 25);
//! ```

pub mod workload;

pub use workload::{
    lagged_samples, LaggedSample, LoadRange, SeriesSummary, TimeBucket, WorkloadProfile,
    WorkloadSimulator, WorkloadSimulatorConfig,
};
