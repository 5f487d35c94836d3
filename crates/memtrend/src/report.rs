//! Rendering a finished session into summary, chart and CSV artifacts
//!
//! Everything here is pure; persisting the result is the job of
//! [`crate::ArtifactWriter`].

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::analyzer::{LeakVerdict, TrendStatistics, VerdictReason};
use crate::config::DEFAULT_CHART_ROWS;
use crate::sample::{Sample, bytes_to_mb, signed_bytes_to_mb};
use crate::session::SessionRecord;

const CHART_BAR: char = '#';
const CHART_EMPTY: char = ' ';
/// Width of the y-axis label column, left of the axis line
const LABEL_WIDTH: usize = 8;

/// The three artifacts persisted per run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Csv,
    Chart,
    Summary,
}

impl ArtifactKind {
    /// File name for this artifact under a run stamp
    #[must_use]
    pub fn file_name(self, stamp: &str) -> String {
        match self {
            Self::Csv => format!("memory-samples-{stamp}.csv"),
            Self::Chart => format!("memory-chart-{stamp}.txt"),
            Self::Summary => format!("memory-summary-{stamp}.txt"),
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Chart => write!(f, "chart"),
            Self::Summary => write!(f, "summary"),
        }
    }
}

/// One line of the CSV sample log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvRow {
    pub timestamp: String,
    pub rss_kb: u64,
    pub vsz_kb: u64,
    pub percent_mem: Option<String>,
}

impl From<&Sample> for CsvRow {
    fn from(sample: &Sample) -> Self {
        Self {
            timestamp: sample.timestamp().to_rfc3339(),
            rss_kb: sample.rss_kb(),
            vsz_kb: sample.vsz_kb(),
            percent_mem: sample.percent_mem().map(|p| format!("{p:.2}")),
        }
    }
}

/// Rendered output of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    pub summary_text: String,
    pub chart_text: String,
    pub csv_rows: Vec<CsvRow>,
}

/// Renders session reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reporter {
    chart_rows: usize,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(DEFAULT_CHART_ROWS)
    }
}

impl Reporter {
    #[must_use]
    pub const fn new(chart_rows: usize) -> Self {
        Self { chart_rows }
    }

    /// Render all artifacts for a finished session
    #[must_use]
    pub fn render(
        &self,
        record: &SessionRecord,
        stats: &TrendStatistics,
        verdict: &LeakVerdict,
    ) -> ReportArtifact {
        ReportArtifact {
            summary_text: render_summary(record, stats, verdict),
            chart_text: render_chart(&record.samples, self.chart_rows),
            csv_rows: record.samples.iter().map(CsvRow::from).collect(),
        }
    }
}

/// Bar height for each sample: `round(rss / (max / rows))`, clamped to `rows`
///
/// An all-zero series yields all-zero heights.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn bar_heights(samples: &[Sample], rows: usize) -> Vec<usize> {
    let max = samples.iter().map(Sample::rss_bytes).max().unwrap_or(0);
    if max == 0 || rows == 0 {
        return vec![0; samples.len()];
    }

    let per_row = max as f64 / rows as f64;
    samples
        .iter()
        .map(|s| {
            let height = (s.rss_bytes() as f64 / per_row).round() as usize;
            height.min(rows)
        })
        .collect()
}

/// ASCII trend chart, one column per sample, oldest on the left
#[must_use]
pub fn render_chart(samples: &[Sample], rows: usize) -> String {
    let heights = bar_heights(samples, rows);
    let max_mb = bytes_to_mb(samples.iter().map(Sample::rss_bytes).max().unwrap_or(0));
    let mut out = String::new();

    let _ = writeln!(out, "Memory usage trend (RSS, MB)");
    for row in (1..=rows).rev() {
        let label = if row == rows || row == 1 || row == rows.div_ceil(2) {
            #[allow(clippy::cast_precision_loss)]
            let value = max_mb * row as f64 / rows as f64;
            format!("{value:>8.1}")
        } else {
            String::new()
        };
        let bars: String = heights
            .iter()
            .map(|h| if *h >= row { CHART_BAR } else { CHART_EMPTY })
            .collect();
        let _ = writeln!(out, "{label:>w$} |{bars}", w = LABEL_WIDTH);
    }
    let _ = writeln!(out, "{:>w$} +{}", "", "-".repeat(samples.len()), w = LABEL_WIDTH);
    let _ = writeln!(out, "{:>w$}  {} samples", "", samples.len(), w = LABEL_WIDTH);
    out
}

fn recommendation(reason: VerdictReason) -> &'static [&'static str] {
    match reason {
        VerdictReason::ConfirmedConsistentGrowth => &[
            "Memory grows steadily across the observation window.",
            "- Capture heap snapshots at intervals and compare retained objects",
            "- Review caches, listeners and global collections for unbounded growth",
            "- Re-run with a longer duration to confirm the slope",
        ],
        VerdictReason::GrowthBelowConsistencyFloor => &[
            "Growth looks like a transient spike rather than a leak.",
            "- Correlate the spike with workload or traffic at that time",
            "- Continue monitoring; re-run if spikes become more frequent",
        ],
        VerdictReason::GrowthWithinTolerance => {
            &["Memory usage is stable. Continue monitoring."]
        }
        VerdictReason::InsufficientSamples => &[
            "Not enough samples to judge a trend.",
            "- Re-run with a longer duration or a shorter interval",
        ],
    }
}

fn render_summary(
    record: &SessionRecord,
    stats: &TrendStatistics,
    verdict: &LeakVerdict,
) -> String {
    let mut out = String::new();
    let verdict_line = if verdict.leak_detected {
        "LEAK DETECTED"
    } else {
        "no leak detected"
    };

    let _ = writeln!(out, "=== Memory Check Summary ===");
    let _ = writeln!(out, "Target:            {} (pid {})", record.target.name, record.target.pid);
    let _ = writeln!(out, "Termination:       {}", record.termination);
    let _ = writeln!(out, "Interval:          {}s", record.interval.as_secs_f64());
    let _ = writeln!(out, "Samples:           {}", stats.sample_count);
    if record.missed_ticks > 0 {
        let _ = writeln!(out, "Missed ticks:      {}", record.missed_ticks);
    }
    if let (Some(first), Some(last)) = (record.samples.first(), record.samples.last()) {
        let _ = writeln!(
            out,
            "Window:            {} .. {}",
            first.timestamp().format("%Y-%m-%d %H:%M:%S"),
            last.timestamp().format("%Y-%m-%d %H:%M:%S")
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "--- Statistics ---");
    let _ = writeln!(out, "Min RSS:           {:.1} MB", bytes_to_mb(stats.min_rss));
    let _ = writeln!(out, "Max RSS:           {:.1} MB", bytes_to_mb(stats.max_rss));
    let _ = writeln!(out, "Avg RSS:           {:.1} MB", bytes_to_mb(stats.avg_rss));
    let _ = writeln!(out, "Growth:            {:.1} MB", bytes_to_mb(stats.growth_bytes));
    let _ = writeln!(out, "First-half avg:    {:.1} MB", bytes_to_mb(stats.first_half_avg));
    let _ = writeln!(out, "Second-half avg:   {:.1} MB", bytes_to_mb(stats.second_half_avg));
    let _ = writeln!(
        out,
        "Consistent growth: {:.1} MB",
        signed_bytes_to_mb(stats.consistent_growth_bytes)
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "--- Verdict ---");
    let _ = writeln!(out, "Result:            {verdict_line}");
    let _ = writeln!(out, "Reason:            {}", verdict.reason);
    let _ = writeln!(
        out,
        "Threshold:         {:.1} MB ({} breaches)",
        bytes_to_mb(record.threshold_bytes),
        record.alerts.len()
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "--- Recommendations ---");
    for line in recommendation(verdict.reason) {
        let _ = writeln!(out, "{line}");
    }
    if !record.alerts.is_empty() {
        let _ = writeln!(
            out,
            "- RSS exceeded the threshold {} times; check the peak against available memory",
            record.alerts.len()
        );
    }

    out
}
