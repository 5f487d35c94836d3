//! Session orchestration: resolve, sample, analyze, report, persist
//!
//! A session walks `Idle → Resolving → Sampling → Analyzing → Reported →
//! Done`, or drops to `Failed` on a configuration error or a target that
//! never produced a sample. Cancellation during sampling skips straight to
//! analysis with whatever was collected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::analyzer::{LeakVerdict, TrendAnalyzer, TrendStatistics};
use crate::artifacts::{ArtifactWriter, PersistOutcome};
use crate::config::MonitorConfig;
use crate::error::{EXIT_FAILURE, EXIT_OK, Error, Result};
use crate::process::ProcessTable;
use crate::report::{ReportArtifact, Reporter};
use crate::sample::Sample;
use crate::sampler::{ResolvedTarget, Sampler, TerminationReason};
use crate::threshold::{AlertEvent, ThresholdMonitor};

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Resolving,
    Sampling,
    Analyzing,
    Reported,
    Done,
    Failed,
}

/// Everything observed during a run, frozen once sampling stops
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub target: ResolvedTarget,
    pub started_at: DateTime<Utc>,
    pub interval: Duration,
    pub threshold_bytes: u64,
    pub samples: Vec<Sample>,
    pub alerts: Vec<AlertEvent>,
    pub termination: TerminationReason,
    pub missed_ticks: u64,
}

/// Result of a completed session
#[derive(Debug)]
pub struct SessionOutcome {
    pub record: SessionRecord,
    pub statistics: TrendStatistics,
    pub verdict: LeakVerdict,
    pub report: ReportArtifact,
    pub artifacts: PersistOutcome,
    pub exit_code: i32,
}

impl SessionOutcome {
    #[must_use]
    pub fn leak_detected(&self) -> bool {
        self.verdict.leak_detected
    }
}

/// One monitoring run against one target
pub struct Session<T> {
    target: String,
    config: MonitorConfig,
    table: T,
}

impl<T: ProcessTable> Session<T> {
    #[must_use]
    pub fn new(target: impl Into<String>, config: MonitorConfig, table: T) -> Self {
        Self {
            target: target.into(),
            config,
            table,
        }
    }

    /// Run the session to completion
    ///
    /// `on_alert` is called for each threshold breach as it happens, unless
    /// alerts are disabled in the config. Breaches are recorded either way.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - [`Error::Configuration`] if the config fails validation
    /// - [`Error::ProcessNotFound`] if the target never resolves or no
    ///   sample was taken before sampling stopped
    ///
    /// Artifact write failures are not errors here; they are reported in
    /// [`SessionOutcome::artifacts`].
    pub async fn run<F>(
        self,
        cancel: watch::Receiver<bool>,
        mut on_alert: F,
    ) -> Result<SessionOutcome>
    where
        F: FnMut(&AlertEvent),
    {
        let Self {
            target: name,
            config,
            table,
        } = self;
        let mut state = SessionState::Idle;

        advance(&mut state, SessionState::Resolving);
        if let Err(e) = config.validate() {
            advance(&mut state, SessionState::Failed);
            return Err(e);
        }

        let started_at = Utc::now();
        let mut sampler = Sampler::for_duration(table, config.interval(), config.duration());
        let target = match sampler.resolve(&name) {
            Ok(target) => target,
            Err(e) => {
                advance(&mut state, SessionState::Failed);
                return Err(e);
            }
        };
        info!(target_name = %target.name, pid = target.pid, "target resolved");

        advance(&mut state, SessionState::Sampling);
        let monitor = ThresholdMonitor::new(config.threshold_bytes());
        let alerts_enabled = config.alerts_enabled();
        let mut alerts = Vec::new();
        let run = sampler
            .sample_pid(target.pid, cancel, |sample| {
                let Some(alert) = monitor.observe(sample) else {
                    return;
                };
                if alerts_enabled {
                    warn!(
                        rss_bytes = alert.observed_rss_bytes,
                        threshold_bytes = alert.threshold_bytes,
                        "memory threshold exceeded"
                    );
                    on_alert(&alert);
                } else {
                    debug!(
                        rss_bytes = alert.observed_rss_bytes,
                        "threshold breach, alerts disabled"
                    );
                }
                alerts.push(alert);
            })
            .await;

        if run.samples.is_empty() {
            warn!(reason = %run.termination, "sampling ended without a single sample");
            advance(&mut state, SessionState::Failed);
            return Err(Error::process_not_found(name));
        }

        let record = SessionRecord {
            target,
            started_at,
            interval: config.interval(),
            threshold_bytes: config.threshold_bytes(),
            samples: run.samples,
            alerts,
            termination: run.termination,
            missed_ticks: run.missed_ticks,
        };

        advance(&mut state, SessionState::Analyzing);
        let (statistics, verdict) =
            TrendAnalyzer::new(config.leak_thresholds()).analyze(&record.samples)?;
        info!(
            leak = verdict.leak_detected,
            reason = %verdict.reason,
            growth_bytes = statistics.growth_bytes,
            "trend analyzed"
        );

        let report = Reporter::new(config.chart_rows()).render(&record, &statistics, &verdict);
        advance(&mut state, SessionState::Reported);

        let stamp = started_at.format("%Y%m%d-%H%M%S").to_string();
        let artifacts = ArtifactWriter::new(config.output_dir()).persist(&report, &stamp);

        let exit_code = exit_code_for(&record, &verdict, alerts_enabled);
        advance(&mut state, SessionState::Done);

        Ok(SessionOutcome {
            record,
            statistics,
            verdict,
            report,
            artifacts,
            exit_code,
        })
    }
}

fn advance(state: &mut SessionState, next: SessionState) {
    debug!(from = ?*state, to = ?next, "session state changed");
    *state = next;
}

/// Whether the run ended with RSS still above the ceiling
#[must_use]
pub fn unresolved_breach(record: &SessionRecord) -> bool {
    record
        .samples
        .last()
        .is_some_and(|s| s.rss_bytes() > record.threshold_bytes)
}

fn exit_code_for(record: &SessionRecord, verdict: &LeakVerdict, alerts_enabled: bool) -> i32 {
    if verdict.leak_detected || (alerts_enabled && unresolved_breach(record)) {
        EXIT_FAILURE
    } else {
        EXIT_OK
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::arithmetic_side_effects)]

    use super::*;
    use crate::analyzer::VerdictReason;
    use crate::sample::MemoryReading;

    const MB: u64 = 1024 * 1024;

    fn record(rss_mb: &[u64], threshold_mb: u64) -> SessionRecord {
        let started_at = Utc::now();
        SessionRecord {
            target: ResolvedTarget {
                name: "app".to_string(),
                pid: 1,
                other_matches: vec![],
            },
            started_at,
            interval: Duration::from_secs(1),
            threshold_bytes: threshold_mb * MB,
            samples: rss_mb
                .iter()
                .map(|mb| {
                    let reading = MemoryReading::new(mb * MB, 0, None);
                    Sample::new(started_at, Duration::ZERO, reading)
                })
                .collect(),
            alerts: vec![],
            termination: TerminationReason::Completed,
            missed_ticks: 0,
        }
    }

    const CLEAR: LeakVerdict = LeakVerdict {
        leak_detected: false,
        reason: VerdictReason::GrowthWithinTolerance,
    };

    #[test]
    fn test_clean_run_exits_zero() {
        assert_eq!(exit_code_for(&record(&[100, 100], 500), &CLEAR, true), EXIT_OK);
    }

    #[test]
    fn test_leak_exits_one() {
        let leak = LeakVerdict {
            leak_detected: true,
            reason: VerdictReason::ConfirmedConsistentGrowth,
        };
        assert_eq!(exit_code_for(&record(&[100, 400], 500), &leak, true), EXIT_FAILURE);
    }

    #[test]
    fn test_breach_still_active_at_end_exits_one() {
        let r = record(&[100, 600], 500);
        assert!(unresolved_breach(&r));
        assert_eq!(exit_code_for(&r, &CLEAR, true), EXIT_FAILURE);
        assert_eq!(exit_code_for(&r, &CLEAR, false), EXIT_OK);
    }

    #[test]
    fn test_recovered_breach_exits_zero() {
        let r = record(&[600, 100], 500);
        assert!(!unresolved_breach(&r));
        assert_eq!(exit_code_for(&r, &CLEAR, true), EXIT_OK);
    }
}
