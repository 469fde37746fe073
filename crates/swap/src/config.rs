// Chunk: docs/chunks/swap_journal - Crash-recovery journal for buffer edits

//! Writer timing knobs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing for the background writer.
///
/// Missing fields take their defaults when deserialized, so the struct can
/// sit inside a larger settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapConfig {
    /// How long the writer sleeps on an empty queue before re-checking.
    pub flush_interval_ms: u64,
    /// Minimum time between durable flushes of an open sidecar.
    pub fsync_interval_ms: u64,
}

impl SwapConfig {
    /// Never shorter than 1 ms, so an idle writer does not spin.
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms.max(1))
    }

    pub fn fsync_interval(&self) -> Duration {
        Duration::from_millis(self.fsync_interval_ms)
    }
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: 200,
            fsync_interval_ms: 1000,
        }
    }
}
