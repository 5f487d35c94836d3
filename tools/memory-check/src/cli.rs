//! CLI argument definitions using clap

use clap::Parser;
use std::path::PathBuf;

const LONG_ABOUT: &str = "\
Samples RSS/VSZ of a running process at a fixed interval, raises live alerts
when RSS exceeds a threshold, and classifies the trend as a leak or noise.
Writes a CSV sample log, an ASCII chart and a summary report per run.

Exit codes: 0 no leak, 1 leak detected / process not found / threshold still
exceeded at the end, 2 invalid arguments.";

/// memory-check - watch a process's memory and flag leaks
#[derive(Parser, Debug)]
#[command(name = "memory-check")]
#[command(version)]
#[command(about = "Sample a running process's memory over time and flag leaks")]
#[command(long_about = LONG_ABOUT)]
pub struct Cli {
    /// Process name or command-line pattern to monitor
    #[arg(long, value_name = "NAME")]
    pub app: Option<String>,

    /// Total sampling time in seconds [default: 300]
    #[arg(long, value_name = "SECS")]
    pub duration: Option<u64>,

    /// Seconds between samples [default: 10]
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// RSS alert threshold in MB [default: 1024]
    #[arg(long, value_name = "MB")]
    pub threshold: Option<u64>,

    /// Directory for the CSV log, chart and summary [default: ./memory-check-output]
    #[arg(long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Do not print threshold alerts while sampling
    #[arg(long, default_value_t = false)]
    pub no_alert: bool,

    /// TOML file with defaults for any of these options
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Total growth in MB below which memory counts as stable [default: 50]
    #[arg(long, value_name = "MB")]
    pub growth_floor: Option<u64>,

    /// Second-half over first-half growth in MB required to call a leak [default: 25]
    #[arg(long, value_name = "MB")]
    pub consistency_floor: Option<u64>,

    /// Chart height in rows [default: 20]
    #[arg(long, value_name = "ROWS")]
    pub chart_rows: Option<usize>,

    /// Also print the statistics and verdict as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
