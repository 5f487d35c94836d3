//! Polling loop that turns a live process into a sample sequence

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::process::ProcessTable;
use crate::sample::Sample;

/// Why the sampling loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerminationReason {
    /// Every planned tick ran
    Completed,
    /// The target vanished mid-run
    ProcessExited,
    /// A stop was requested through the cancellation channel
    Cancelled,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::ProcessExited => write!(f, "process-exited"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A target name resolved to a concrete pid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTarget {
    pub name: String,
    pub pid: u32,
    /// Further matches that were not selected
    pub other_matches: Vec<u32>,
}

/// Output of one sampling loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingRun {
    pub samples: Vec<Sample>,
    pub termination: TerminationReason,
    /// Ticks that ran, including missed ones
    pub ticks: u64,
    /// Ticks skipped because the reading failed transiently
    pub missed_ticks: u64,
}

/// Cooperative, cancellable ticker over a [`ProcessTable`]
pub struct Sampler<T> {
    table: T,
    interval: Duration,
    planned_ticks: u64,
}

impl<T: ProcessTable> Sampler<T> {
    /// Create a sampler running `planned_ticks` ticks, one every `interval`
    #[must_use]
    pub const fn new(table: T, interval: Duration, planned_ticks: u64) -> Self {
        Self {
            table,
            interval,
            planned_ticks,
        }
    }

    /// Create a sampler covering `duration`: `ceil(duration / interval)` ticks
    #[must_use]
    pub fn for_duration(table: T, interval: Duration, duration: Duration) -> Self {
        let per_tick = interval.as_nanos().max(1);
        let ticks = u64::try_from(duration.as_nanos().div_ceil(per_tick)).unwrap_or(u64::MAX);
        Self::new(table, interval, ticks)
    }

    #[must_use]
    pub const fn planned_ticks(&self) -> u64 {
        self.planned_ticks
    }

    /// Resolve `target` to the lowest matching pid
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProcessNotFound`] if nothing matches, or the table's
    /// error if the lookup itself fails
    pub fn resolve(&mut self, target: &str) -> Result<ResolvedTarget> {
        let pids = self.table.resolve(target)?;
        let (pid, rest) = pids
            .split_first()
            .ok_or_else(|| Error::process_not_found(target))?;

        if !rest.is_empty() {
            info!(
                pid,
                others = ?rest,
                "multiple processes match target, monitoring the lowest pid"
            );
        }

        Ok(ResolvedTarget {
            name: target.to_string(),
            pid: *pid,
            other_matches: rest.to_vec(),
        })
    }

    /// Resolve `target` and sample it until done
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProcessNotFound`] if the target cannot be resolved
    pub async fn run<F>(
        &mut self,
        target: &str,
        cancel: watch::Receiver<bool>,
        on_sample: F,
    ) -> Result<(ResolvedTarget, SamplingRun)>
    where
        F: FnMut(&Sample),
    {
        let resolved = self.resolve(target)?;
        let run = self.sample_pid(resolved.pid, cancel, on_sample).await;
        Ok((resolved, run))
    }

    /// Sample an already-resolved pid
    ///
    /// Tick 0 fires immediately. The cancellation channel is checked at
    /// every sleep boundary; a `true` value stops the loop with the samples
    /// collected so far. A dropped sender simply disables cancellation.
    pub async fn sample_pid<F>(
        &mut self,
        pid: u32,
        mut cancel: watch::Receiver<bool>,
        mut on_sample: F,
    ) -> SamplingRun
    where
        F: FnMut(&Sample),
    {
        let started_wall = Utc::now();
        let started = Instant::now();

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut samples = Vec::new();
        let mut ticks = 0_u64;
        let mut missed_ticks = 0_u64;
        let mut cancel_open = true;

        info!(
            pid,
            planned_ticks = self.planned_ticks,
            interval = ?self.interval,
            "sampling started"
        );

        let termination = loop {
            if ticks >= self.planned_ticks {
                break TerminationReason::Completed;
            }
            if *cancel.borrow_and_update() {
                break TerminationReason::Cancelled;
            }

            tokio::select! {
                biased;
                changed = cancel.changed(), if cancel_open => {
                    if changed.is_err() {
                        cancel_open = false;
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }

            ticks = ticks.saturating_add(1);
            let elapsed = started.elapsed();

            match self.table.read(pid) {
                Ok(Some(reading)) => {
                    let timestamp = wall_clock_at(started_wall, elapsed);
                    let sample = Sample::new(timestamp, elapsed, reading);
                    debug!(pid, tick = ticks, rss_bytes = sample.rss_bytes(), "sample taken");
                    on_sample(&sample);
                    samples.push(sample);
                }
                Ok(None) => {
                    info!(pid, tick = ticks, "target process exited");
                    break TerminationReason::ProcessExited;
                }
                Err(e) => {
                    warn!(pid, tick = ticks, error = %e, "skipping tick after failed read");
                    missed_ticks = missed_ticks.saturating_add(1);
                }
            }
        };

        info!(
            pid,
            samples = samples.len(),
            missed_ticks,
            reason = %termination,
            "sampling stopped"
        );

        SamplingRun {
            samples,
            termination,
            ticks,
            missed_ticks,
        }
    }
}

/// Wall-clock time for a monotonic offset from the start of sampling
fn wall_clock_at(started: DateTime<Utc>, elapsed: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(elapsed)
        .ok()
        .and_then(|delta| started.checked_add_signed(delta))
        .unwrap_or_else(Utc::now)
}
