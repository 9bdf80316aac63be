//! Near-term request load forecasting for storage capacity planning.
//!
//! - [`simulation`]: synthetic hourly workload for training data
//! - [`forecast`]: feature extraction, confidence bands, accuracy tracking
//! - [`ml`]: training, persisted artifacts and the served model
//! - [`api`]: HTTP surface

pub mod api;
pub mod config;
pub mod domain;
pub mod forecast;
pub mod ml;
pub mod simulation;
pub mod state;
pub mod telemetry;
