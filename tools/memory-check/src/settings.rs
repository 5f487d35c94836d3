//! Layered settings: defaults, then the optional TOML file, then CLI flags

use memtrend::config::{
    DEFAULT_CHART_ROWS, DEFAULT_CONSISTENCY_FLOOR_MB, DEFAULT_DURATION_SECS,
    DEFAULT_GROWTH_FLOOR_MB, DEFAULT_INTERVAL_SECS, DEFAULT_OUTPUT_DIR, DEFAULT_THRESHOLD_MB,
};
use memtrend::{BYTES_PER_MB, Error, LeakThresholds, MonitorConfig, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::Cli;

/// Contents of a `--config` TOML file
///
/// Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileSettings {
    pub app: Option<String>,
    pub duration: Option<u64>,
    pub interval: Option<u64>,
    pub threshold_mb: Option<u64>,
    pub output: Option<PathBuf>,
    pub alerts: Option<bool>,
    pub growth_floor_mb: Option<u64>,
    pub consistency_floor_mb: Option<u64>,
    pub chart_rows: Option<usize>,
}

impl FileSettings {
    /// Load settings from a TOML file
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigFile`] if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        let text =
            std::fs::read_to_string(path).map_err(|e| Error::config_file(path, e.to_string()))?;
        Self::parse(path, &text)
    }

    fn parse(path: &Path, text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::config_file(path, e.to_string()))
    }
}

/// Fully resolved run settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub target: String,
    pub config: MonitorConfig,
}

/// Merge CLI flags over file settings over defaults
///
/// # Errors
///
/// Returns [`Error::Configuration`] if no target was given or the merged
/// values fail validation
pub fn resolve(cli: &Cli, file: FileSettings) -> Result<RunSettings> {
    let target = cli
        .app
        .clone()
        .or(file.app)
        .filter(|app| !app.trim().is_empty())
        .ok_or_else(|| Error::configuration("--app is required"))?;

    let interval = cli
        .interval
        .or(file.interval)
        .unwrap_or(DEFAULT_INTERVAL_SECS);
    let duration = cli
        .duration
        .or(file.duration)
        .unwrap_or(DEFAULT_DURATION_SECS);
    let threshold_mb = cli
        .threshold
        .or(file.threshold_mb)
        .unwrap_or(DEFAULT_THRESHOLD_MB);
    let output = cli
        .output
        .clone()
        .or(file.output)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    let alerts = !cli.no_alert && file.alerts.unwrap_or(true);
    let leak = LeakThresholds::from_mb(
        cli.growth_floor
            .or(file.growth_floor_mb)
            .unwrap_or(DEFAULT_GROWTH_FLOOR_MB),
        cli.consistency_floor
            .or(file.consistency_floor_mb)
            .unwrap_or(DEFAULT_CONSISTENCY_FLOOR_MB),
    );
    let chart_rows = cli
        .chart_rows
        .or(file.chart_rows)
        .unwrap_or(DEFAULT_CHART_ROWS);

    let config = MonitorConfig::new(
        Duration::from_secs(interval),
        Duration::from_secs(duration),
        threshold_mb.saturating_mul(BYTES_PER_MB),
    )?
    .with_alerts(alerts)
    .with_output_dir(output)
    .with_leak_thresholds(leak)
    .with_chart_rows(chart_rows)?;

    Ok(RunSettings { target, config })
}
