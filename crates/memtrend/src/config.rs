//! Configuration for a monitoring session

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Bytes per mebibyte
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Default total sampling time
pub const DEFAULT_DURATION_SECS: u64 = 300;

/// Default time between samples
pub const DEFAULT_INTERVAL_SECS: u64 = 10;

/// Default RSS ceiling before an alert fires
pub const DEFAULT_THRESHOLD_MB: u64 = 1024;

/// Default artifact directory
pub const DEFAULT_OUTPUT_DIR: &str = "./memory-check-output";

/// Default vertical resolution of the trend chart
pub const DEFAULT_CHART_ROWS: usize = 20;

/// Default total-growth floor for the leak classifier
pub const DEFAULT_GROWTH_FLOOR_MB: u64 = 50;

/// Default split-half growth floor for the leak classifier
pub const DEFAULT_CONSISTENCY_FLOOR_MB: u64 = 25;

/// Floors used by the leak classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeakThresholds {
    /// Total growth (max - min) below this is treated as noise
    pub growth_floor_bytes: u64,

    /// Second-half minus first-half average below this is treated as a spike
    pub consistency_floor_bytes: u64,
}

impl LeakThresholds {
    /// Build thresholds from megabyte values
    #[must_use]
    pub const fn from_mb(growth_floor_mb: u64, consistency_floor_mb: u64) -> Self {
        Self {
            growth_floor_bytes: growth_floor_mb.saturating_mul(BYTES_PER_MB),
            consistency_floor_bytes: consistency_floor_mb.saturating_mul(BYTES_PER_MB),
        }
    }
}

impl Default for LeakThresholds {
    fn default() -> Self {
        Self::from_mb(DEFAULT_GROWTH_FLOOR_MB, DEFAULT_CONSISTENCY_FLOOR_MB)
    }
}

/// Configuration for one monitoring run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Interval between RSS measurements
    interval: Duration,

    /// Total time to sample for
    duration: Duration,

    /// RSS ceiling in bytes
    threshold_bytes: u64,

    /// Whether breaches are surfaced live
    alerts_enabled: bool,

    /// Where artifacts are written
    output_dir: PathBuf,

    /// Leak classifier floors
    leak: LeakThresholds,

    /// Chart height in rows
    chart_rows: usize,
}

impl MonitorConfig {
    /// Create a validated configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if:
    /// - `interval` is zero
    /// - `duration` is shorter than `interval`
    ///
    /// # Examples
    ///
    /// ```
    /// # use memtrend::MonitorConfig;
    /// # use std::time::Duration;
    /// let config = MonitorConfig::new(
    ///     Duration::from_secs(10),
    ///     Duration::from_secs(300),
    ///     1024 * 1024 * 1024,
    /// );
    /// assert!(config.is_ok());
    /// ```
    pub fn new(interval: Duration, duration: Duration, threshold_bytes: u64) -> Result<Self> {
        Self::validate_timing(interval, duration)?;

        Ok(Self {
            interval,
            duration,
            threshold_bytes,
            alerts_enabled: true,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            leak: LeakThresholds::default(),
            chart_rows: DEFAULT_CHART_ROWS,
        })
    }

    /// Configuration matching the CLI defaults
    ///
    /// # Errors
    ///
    /// Never fails in practice; validation still runs
    pub fn defaults() -> Result<Self> {
        Self::new(
            Duration::from_secs(DEFAULT_INTERVAL_SECS),
            Duration::from_secs(DEFAULT_DURATION_SECS),
            DEFAULT_THRESHOLD_MB.saturating_mul(BYTES_PER_MB),
        )
    }

    /// Enable or disable live alert emission
    #[must_use]
    pub const fn with_alerts(mut self, enabled: bool) -> Self {
        self.alerts_enabled = enabled;
        self
    }

    /// Set the artifact directory
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Override the leak classifier floors
    #[must_use]
    pub const fn with_leak_thresholds(mut self, leak: LeakThresholds) -> Self {
        self.leak = leak;
        self
    }

    /// Set the chart height
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `rows` is zero
    pub fn with_chart_rows(mut self, rows: usize) -> Result<Self> {
        if rows == 0 {
            return Err(Error::configuration("chart rows must be greater than 0"));
        }
        self.chart_rows = rows;
        Ok(self)
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    #[must_use]
    pub const fn threshold_bytes(&self) -> u64 {
        self.threshold_bytes
    }

    #[must_use]
    pub const fn alerts_enabled(&self) -> bool {
        self.alerts_enabled
    }

    #[must_use]
    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }

    #[must_use]
    pub const fn leak_thresholds(&self) -> LeakThresholds {
        self.leak
    }

    #[must_use]
    pub const fn chart_rows(&self) -> usize {
        self.chart_rows
    }

    /// Number of ticks a full run takes: `ceil(duration / interval)`
    #[must_use]
    pub fn planned_ticks(&self) -> u64 {
        let interval = self.interval.as_nanos().max(1);
        let ticks = self.duration.as_nanos().div_ceil(interval);
        u64::try_from(ticks).unwrap_or(u64::MAX)
    }

    /// Re-run validation, for configs built through deserialization
    ///
    /// # Errors
    ///
    /// Same conditions as [`MonitorConfig::new`], plus a zero chart height
    pub fn validate(&self) -> Result<()> {
        Self::validate_timing(self.interval, self.duration)?;
        if self.chart_rows == 0 {
            return Err(Error::configuration("chart rows must be greater than 0"));
        }
        Ok(())
    }

    fn validate_timing(interval: Duration, duration: Duration) -> Result<()> {
        if interval.is_zero() {
            Err(Error::configuration("interval must be greater than 0"))
        } else if duration < interval {
            Err(Error::configuration(format!(
                "duration ({}s) must be at least the interval ({}s)",
                duration.as_secs_f64(),
                interval.as_secs_f64()
            )))
        } else {
            Ok(())
        }
    }
}
