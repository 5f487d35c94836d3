//! End-to-end session tests against a scripted process table
//!
//! Tests verify that:
//! - A growing process is classified as leaking and exits 1
//! - A vanished process keeps its partial samples
//! - Cancellation keeps its partial samples
//! - Threshold alerts surface live, once per breaching sample
//! - All three artifacts land on disk

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(clippy::indexing_slicing)]
#![allow(clippy::arithmetic_side_effects)]

use memtrend::{
    ArtifactKind, Error, MemoryReading, MonitorConfig, ProcessTable, Session, TerminationReason,
    VerdictReason,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::watch;

const MB: u64 = 1024 * 1024;

/// Test helper: Unwrap a Result or panic with context
fn unwrap_result<T, E: std::fmt::Display>(result: std::result::Result<T, E>, context: &str) -> T {
    match result {
        Ok(value) => value,
        Err(e) => panic!("{}: {}", context, e),
    }
}

/// Process table replaying a fixed RSS script for pid 4242
///
/// Once the script runs out the process is reported as gone. `reads`
/// counts calls so a test can react to a specific read.
struct ScriptedTable {
    pids: Vec<u32>,
    readings: VecDeque<u64>,
    reads: Arc<Mutex<usize>>,
}

impl ScriptedTable {
    fn new(rss_mb: &[u64]) -> Self {
        Self {
            pids: vec![4242],
            readings: rss_mb.iter().copied().collect(),
            reads: Arc::new(Mutex::new(0)),
        }
    }

    fn missing() -> Self {
        Self {
            pids: vec![],
            readings: VecDeque::new(),
            reads: Arc::new(Mutex::new(0)),
        }
    }
}

impl ProcessTable for ScriptedTable {
    fn resolve(&mut self, _target: &str) -> memtrend::Result<Vec<u32>> {
        Ok(self.pids.clone())
    }

    fn read(&mut self, _pid: u32) -> memtrend::Result<Option<MemoryReading>> {
        *self.reads.lock().unwrap() += 1;
        Ok(self
            .readings
            .pop_front()
            .map(|mb| MemoryReading::new(mb * MB, mb * MB * 3, Some(0.5))))
    }
}

fn config(
    interval_secs: u64,
    duration_secs: u64,
    threshold_mb: u64,
    out: &TempDir,
) -> MonitorConfig {
    unwrap_result(
        MonitorConfig::new(
            Duration::from_secs(interval_secs),
            Duration::from_secs(duration_secs),
            threshold_mb * MB,
        ),
        "config should be valid",
    )
    .with_output_dir(out.path())
}

#[tokio::test(start_paused = true)]
async fn reference_scenario_detects_leak_without_alerts() {
    // GIVEN: interval 1s, duration 10s, threshold 500MB and a steadily growing process
    let out = TempDir::new().unwrap();
    let table = ScriptedTable::new(&[100, 105, 110, 150, 200, 250, 300, 350, 400, 450]);
    let (_tx, rx) = watch::channel(false);
    let mut live_alerts = 0;

    // WHEN: the session runs to completion
    let outcome = unwrap_result(
        Session::new("app", config(1, 10, 500, &out), table)
            .run(rx, |_| live_alerts += 1)
            .await,
        "session should complete",
    );

    // THEN: the split-half numbers and verdict match the scenario
    let stats = outcome.statistics;
    assert_eq!(outcome.record.termination, TerminationReason::Completed);
    assert_eq!(outcome.record.samples.len(), 10);
    assert_eq!(stats.min_rss, 100 * MB);
    assert_eq!(stats.max_rss, 450 * MB);
    assert_eq!(stats.growth_bytes, 350 * MB);
    assert_eq!(stats.first_half_avg, 133 * MB);
    assert_eq!(stats.second_half_avg, 350 * MB);
    assert_eq!(stats.consistent_growth_bytes, (217 * MB) as i64);
    assert!(outcome.leak_detected());
    assert_eq!(outcome.verdict.reason, VerdictReason::ConfirmedConsistentGrowth);
    assert!(outcome.record.alerts.is_empty());
    assert_eq!(live_alerts, 0);
    assert_eq!(outcome.exit_code, 1);
}

#[tokio::test(start_paused = true)]
async fn samples_are_strictly_chronological() {
    let out = TempDir::new().unwrap();
    let table = ScriptedTable::new(&[10; 8]);
    let (_tx, rx) = watch::channel(false);

    let outcome = unwrap_result(
        Session::new("app", config(5, 40, 1024, &out), table)
            .run(rx, |_| {})
            .await,
        "session should complete",
    );

    let samples = &outcome.record.samples;
    assert_eq!(samples.len(), 8);
    assert!(samples.windows(2).all(|w| w[0].timestamp() < w[1].timestamp()));
}

#[tokio::test(start_paused = true)]
async fn process_exit_keeps_partial_samples() {
    // GIVEN: a planned 30-sample run where the process disappears after 5 readings
    let out = TempDir::new().unwrap();
    let table = ScriptedTable::new(&[100, 120, 140, 160, 180]);
    let (_tx, rx) = watch::channel(false);

    let outcome = unwrap_result(
        Session::new("app", config(1, 30, 1024, &out), table)
            .run(rx, |_| {})
            .await,
        "session should complete with partial data",
    );

    // THEN: exactly five samples are analyzed and reported
    assert_eq!(outcome.record.termination, TerminationReason::ProcessExited);
    assert_eq!(outcome.record.samples.len(), 5);
    assert_eq!(outcome.statistics.sample_count, 5);
    assert_eq!(outcome.report.csv_rows.len(), 5);
    assert!(outcome.report.summary_text.contains("process-exited"));
}

#[tokio::test(start_paused = true)]
async fn breaching_samples_alert_live_in_order() {
    let out = TempDir::new().unwrap();
    let table = ScriptedTable::new(&[100, 600, 200, 700, 300, 800, 100]);
    let (_tx, rx) = watch::channel(false);
    let mut live = Vec::new();

    let outcome = unwrap_result(
        Session::new("app", config(1, 7, 500, &out), table)
            .run(rx, |alert| live.push(alert.observed_rss_bytes / MB))
            .await,
        "session should complete",
    );

    assert_eq!(live, vec![600, 700, 800]);
    assert_eq!(outcome.record.alerts.len(), 3);
    assert!(
        outcome
            .record
            .alerts
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp)
    );
    assert!(outcome.report.summary_text.contains("3 breaches"));
}

#[tokio::test(start_paused = true)]
async fn disabled_alerts_still_record_breaches() {
    let out = TempDir::new().unwrap();
    let table = ScriptedTable::new(&[600, 600]);
    let (_tx, rx) = watch::channel(false);
    let mut live = 0;

    let outcome = unwrap_result(
        Session::new("app", config(1, 2, 500, &out).with_alerts(false), table)
            .run(rx, |_| live += 1)
            .await,
        "session should complete",
    );

    assert_eq!(live, 0);
    assert_eq!(outcome.record.alerts.len(), 2);
    assert_eq!(outcome.exit_code, 0);
}

#[tokio::test(start_paused = true)]
async fn unresolved_target_fails_before_sampling() {
    let out = TempDir::new().unwrap();
    let (_tx, rx) = watch::channel(false);

    let result = Session::new("ghost", config(1, 5, 500, &out), ScriptedTable::missing())
        .run(rx, |_| {})
        .await;

    assert!(matches!(result, Err(Error::ProcessNotFound { .. })));
    assert_eq!(result.err().map(|e| e.exit_code()), Some(1));
}

#[tokio::test(start_paused = true)]
async fn zero_samples_is_promoted_to_not_found() {
    // Resolves, but is gone by the first read
    let out = TempDir::new().unwrap();
    let table = ScriptedTable::new(&[]);
    let (_tx, rx) = watch::channel(false);

    let result = Session::new("app", config(1, 5, 500, &out), table)
        .run(rx, |_| {})
        .await;

    assert!(matches!(result, Err(Error::ProcessNotFound { .. })));
}

#[tokio::test(start_paused = true)]
async fn cancellation_keeps_partial_buffer() {
    // GIVEN: a long run and a stop request that lands after the third read
    let out = TempDir::new().unwrap();
    let table = ScriptedTable::new(&[100; 60]);
    let reads = Arc::clone(&table.reads);
    let (tx, rx) = watch::channel(false);

    let stopper = tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_millis(500)).await;
            if *reads.lock().unwrap() >= 3 {
                let _ = tx.send(true);
                break;
            }
        }
    });

    // WHEN: the session runs
    let outcome = unwrap_result(
        Session::new("app", config(1, 60, 1024, &out), table)
            .run(rx, |_| {})
            .await,
        "cancelled session should still report",
    );
    stopper.await.unwrap();

    // THEN: sampling stopped early and the partial data was analyzed
    assert_eq!(outcome.record.termination, TerminationReason::Cancelled);
    assert_eq!(outcome.record.samples.len(), 3);
    assert_eq!(outcome.statistics.sample_count, 3);
    assert!(outcome.artifacts.is_complete());
}

#[tokio::test(start_paused = true)]
async fn invalid_config_fails_with_usage_code() {
    let out = TempDir::new().unwrap();
    let (_tx, rx) = watch::channel(false);
    let bad: MonitorConfig = serde_json::from_value(serde_json::json!({
        "interval": { "secs": 0, "nanos": 0 },
        "duration": { "secs": 10, "nanos": 0 },
        "threshold_bytes": 0,
        "alerts_enabled": true,
        "output_dir": out.path(),
        "leak": { "growth_floor_bytes": 0, "consistency_floor_bytes": 0 },
        "chart_rows": 20
    }))
    .unwrap();

    let result = Session::new("app", bad, ScriptedTable::new(&[1]))
        .run(rx, |_| {})
        .await;

    assert!(matches!(result, Err(Error::Configuration(_))));
    assert_eq!(result.err().map(|e| e.exit_code()), Some(2));
}

#[tokio::test(start_paused = true)]
async fn artifacts_are_written_to_output_dir() {
    let out = TempDir::new().unwrap();
    let table = ScriptedTable::new(&[0, 0, 0]);
    let (_tx, rx) = watch::channel(false);

    let outcome = unwrap_result(
        Session::new("app", config(1, 3, 1024, &out), table)
            .run(rx, |_| {})
            .await,
        "session should complete",
    );

    assert!(outcome.artifacts.is_complete());
    for kind in [ArtifactKind::Csv, ArtifactKind::Chart, ArtifactKind::Summary] {
        let path = outcome.artifacts.path_of(kind).unwrap();
        assert!(path.starts_with(out.path()));
        assert!(path.exists());
    }

    let chart =
        std::fs::read_to_string(outcome.artifacts.path_of(ArtifactKind::Chart).unwrap()).unwrap();
    assert!(!chart.contains('#'));
    let csv =
        std::fs::read_to_string(outcome.artifacts.path_of(ArtifactKind::Csv).unwrap()).unwrap();
    assert_eq!(csv.lines().count(), 4);
    assert_eq!(outcome.verdict.reason, VerdictReason::GrowthWithinTolerance);
    assert_eq!(outcome.exit_code, 0);
}
