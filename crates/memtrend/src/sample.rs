//! Memory samples and raw process readings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::BYTES_PER_MB;

/// One memory reading returned by a [`crate::ProcessTable`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryReading {
    /// Resident set size in bytes
    pub rss_bytes: u64,

    /// Virtual size in bytes
    pub vsz_bytes: u64,

    /// Share of total system memory, when the platform reports it
    pub percent_mem: Option<f64>,
}

impl MemoryReading {
    #[must_use]
    pub const fn new(rss_bytes: u64, vsz_bytes: u64, percent_mem: Option<f64>) -> Self {
        Self {
            rss_bytes,
            vsz_bytes,
            percent_mem,
        }
    }
}

/// A timestamped memory reading for the monitored process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Wall-clock instant the reading was taken
    timestamp: DateTime<Utc>,

    /// Offset from the start of sampling
    elapsed: Duration,

    /// Memory figures
    reading: MemoryReading,
}

impl Sample {
    #[must_use]
    pub const fn new(timestamp: DateTime<Utc>, elapsed: Duration, reading: MemoryReading) -> Self {
        Self {
            timestamp,
            elapsed,
            reading,
        }
    }

    #[must_use]
    pub const fn timestamp(&self) -> &DateTime<Utc> {
        &self.timestamp
    }

    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    #[must_use]
    pub const fn rss_bytes(&self) -> u64 {
        self.reading.rss_bytes
    }

    #[must_use]
    pub const fn vsz_bytes(&self) -> u64 {
        self.reading.vsz_bytes
    }

    #[must_use]
    pub const fn percent_mem(&self) -> Option<f64> {
        self.reading.percent_mem
    }

    /// RSS in kilobytes, as written to the CSV log
    #[must_use]
    pub const fn rss_kb(&self) -> u64 {
        self.reading.rss_bytes / 1024
    }

    /// VSZ in kilobytes, as written to the CSV log
    #[must_use]
    pub const fn vsz_kb(&self) -> u64 {
        self.reading.vsz_bytes / 1024
    }
}

/// Convert bytes to fractional megabytes for display
#[must_use]
#[allow(clippy::cast_precision_loss)] // Acceptable precision loss for display purposes
pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB as f64
}

/// Convert a signed byte delta to fractional megabytes for display
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn signed_bytes_to_mb(bytes: i64) -> f64 {
    bytes as f64 / BYTES_PER_MB as f64
}
