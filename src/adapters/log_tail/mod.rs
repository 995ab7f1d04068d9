mod reader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use reader::{read_with_retry, LogTailReader};

/// Debounce and retry timings for the log tail reader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TailSettings {
    pub debounce_ms: u64,
    pub retry_count: u32,
    pub retry_delay_ms: u64,
}

impl TailSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for TailSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            retry_count: 5,
            retry_delay_ms: 100,
        }
    }
}
