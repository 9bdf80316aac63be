use std::sync::Arc;

use crate::config::Config;
use crate::forecast::AccuracyTracker;
use crate::ml::ModelHandle;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub model: Arc<ModelHandle>,
    pub tracker: Arc<AccuracyTracker>,
}

impl AppState {
    pub fn new(cfg: Config, model: Arc<ModelHandle>) -> Self {
        let tracker = Arc::new(AccuracyTracker::new(cfg.accuracy.window_capacity));
        Self {
            cfg: Arc::new(cfg),
            model,
            tracker,
        }
    }
}
