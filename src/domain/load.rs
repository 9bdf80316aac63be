use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// One hourly observation of request load
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadSample {
    /// Wall-clock time of the sample
    pub timestamp: NaiveDateTime,
    /// Requests per hour (never negative)
    pub load: f64,
}

impl LoadSample {
    pub fn new(timestamp: NaiveDateTime, load: f64) -> Self {
        Self {
            timestamp,
            load: load.max(0.0),
        }
    }
}

/// Absolute error between a served forecast and the load later observed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorObservation {
    pub absolute_error: f64,
    pub recorded_at: DateTime<Utc>,
}

impl ErrorObservation {
    pub fn between(predicted: f64, actual: f64) -> Self {
        Self {
            absolute_error: (predicted - actual).abs(),
            recorded_at: Utc::now(),
        }
    }
}
