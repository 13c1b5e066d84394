use std::time::Duration;

use crate::constants::DEFAULT_POLL_INTERVAL;

/// Runtime knobs of an upload tracker.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Time between consecutive status reads for one acknowledged task.
    pub poll_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}
