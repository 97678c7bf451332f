//! Retrieval telemetry: per-query metrics and queries without results.

pub mod recorder;
pub mod types;

#[cfg(test)]
mod tests;

#[cfg(any(test, feature = "mock"))]
pub use recorder::MemoryTelemetrySink;
pub use recorder::{TelemetryRecorder, TelemetrySink};
pub use types::{QueryWithoutResults, RetrievalMetrics, TelemetryRecord};

use crate::config::ConfigError;
use crate::constants::DEFAULT_TELEMETRY_QUEUE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Records queued before new ones are dropped.
    pub queue_capacity: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_TELEMETRY_QUEUE,
        }
    }
}

impl TelemetryConfig {
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::OutOfRange {
                name: "RUBRICA_TELEMETRY_QUEUE",
                reason: "queue capacity must be positive".to_string(),
            });
        }
        Ok(())
    }
}
