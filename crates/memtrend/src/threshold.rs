//! Live RSS ceiling checks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sample::{Sample, bytes_to_mb};

/// Raised when a sample's RSS exceeds the configured ceiling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub timestamp: DateTime<Utc>,
    pub observed_rss_bytes: u64,
    pub threshold_bytes: u64,
}

impl std::fmt::Display for AlertEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] RSS {:.1} MB exceeds threshold {:.1} MB",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            bytes_to_mb(self.observed_rss_bytes),
            bytes_to_mb(self.threshold_bytes)
        )
    }
}

/// Stateless threshold evaluator
///
/// Every breaching sample produces an event; there is no hysteresis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdMonitor {
    threshold_bytes: u64,
}

impl ThresholdMonitor {
    #[must_use]
    pub const fn new(threshold_bytes: u64) -> Self {
        Self { threshold_bytes }
    }

    /// Evaluate one sample
    #[must_use]
    pub fn observe(&self, sample: &Sample) -> Option<AlertEvent> {
        (sample.rss_bytes() > self.threshold_bytes).then(|| AlertEvent {
            timestamp: *sample.timestamp(),
            observed_rss_bytes: sample.rss_bytes(),
            threshold_bytes: self.threshold_bytes,
        })
    }
}
