//! Rolling accuracy of served forecasts.
//!
//! Concurrency: the error window sits behind a `parking_lot::Mutex`; a record
//! pushes, evicts and bumps the lifetime counter while holding it, so a
//! snapshot taken under the same lock never sees a half-applied record. The
//! forecast counter is a standalone atomic and is only eventually consistent
//! with the window.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Serialize;

use crate::domain::ErrorObservation;

pub const DEFAULT_WINDOW_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AccuracySnapshot {
    /// Lifetime number of recorded outcomes, unaffected by eviction
    pub predictions_served: u64,
    /// Mean absolute error over the window (0 when empty)
    pub avg_error: f64,
    /// Root mean square of the windowed errors (0 when empty)
    pub window_rmse: f64,
    pub window_size: usize,
    /// Successful predict calls since start
    pub forecasts_issued: u64,
}

#[derive(Debug)]
pub struct AccuracyTracker {
    window: Mutex<VecDeque<ErrorObservation>>,
    capacity: usize,
    predictions_served: AtomicU64,
    forecasts_issued: AtomicU64,
}

impl Default for AccuracyTracker {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

impl AccuracyTracker {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            predictions_served: AtomicU64::new(0),
            forecasts_issued: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record the observed load for an earlier forecast; returns the absolute error
    pub fn record(&self, predicted: f64, actual: f64) -> f64 {
        let observation = ErrorObservation::between(predicted, actual);

        let mut window = self.window.lock();
        if window.len() == self.capacity {
            window.pop_front();
        }
        window.push_back(observation);
        self.predictions_served.fetch_add(1, Ordering::Relaxed);

        observation.absolute_error
    }

    /// Count a forecast handed out to a caller
    pub fn note_forecast(&self) -> u64 {
        self.forecasts_issued.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn snapshot(&self) -> AccuracySnapshot {
        let window = self.window.lock();
        let n = window.len();
        let (sum, sum_sq) = window.iter().fold((0.0, 0.0), |(s, sq), o| {
            (s + o.absolute_error, sq + o.absolute_error * o.absolute_error)
        });
        let (avg_error, window_rmse) = if n == 0 {
            (0.0, 0.0)
        } else {
            (sum / n as f64, (sum_sq / n as f64).sqrt())
        };

        AccuracySnapshot {
            predictions_served: self.predictions_served.load(Ordering::Relaxed),
            avg_error,
            window_rmse,
            window_size: n,
            forecasts_issued: self.forecasts_issued.load(Ordering::Relaxed),
        }
    }
}
