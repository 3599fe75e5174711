//! Polling cadence configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cadence of one [`PollingDriver`](super::PollingDriver)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Delay between samples inside a batch, and between batches
    pub speed_ms: u64,
    /// Samples pulled per tick
    pub batch_size: usize,
    /// Tool whose pose device-backed sources report
    pub tool_index: usize,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            speed_ms: 200,
            batch_size: 10,
            tool_index: 0,
        }
    }
}

impl PollingConfig {
    /// No sleeping at all; one sample per call is still bounded by `batch_size`
    pub fn immediate(batch_size: usize) -> Self {
        Self {
            speed_ms: 0,
            batch_size,
            ..Default::default()
        }
    }

    pub fn speed(&self) -> Duration {
        Duration::from_millis(self.speed_ms)
    }
}
