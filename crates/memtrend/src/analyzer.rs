//! Trend statistics and leak classification over a finished sample set
//!
//! Peak-minus-trough alone cannot tell a transient spike from a leak, so
//! classification uses two floors: total growth must clear the growth
//! floor, and the second half of the window must sit above the first
//! half by at least the consistency floor.

use serde::{Deserialize, Serialize};

use crate::config::LeakThresholds;
use crate::error::{Error, Result};
use crate::sample::Sample;

/// Aggregate statistics over a sample set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendStatistics {
    pub sample_count: usize,
    pub min_rss: u64,
    pub max_rss: u64,
    pub avg_rss: u64,
    /// `max_rss - min_rss`
    pub growth_bytes: u64,
    pub first_half_avg: u64,
    pub second_half_avg: u64,
    /// `second_half_avg - first_half_avg`; negative when memory shrank
    pub consistent_growth_bytes: i64,
}

/// Why the classifier reached its verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerdictReason {
    InsufficientSamples,
    GrowthWithinTolerance,
    GrowthBelowConsistencyFloor,
    ConfirmedConsistentGrowth,
}

impl VerdictReason {
    /// Machine-readable reason code
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InsufficientSamples => "insufficient-samples",
            Self::GrowthWithinTolerance => "growth-within-tolerance",
            Self::GrowthBelowConsistencyFloor => "growth-below-consistency-floor",
            Self::ConfirmedConsistentGrowth => "confirmed-consistent-growth",
        }
    }
}

impl std::fmt::Display for VerdictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Binary leak conclusion plus its reason
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeakVerdict {
    pub leak_detected: bool,
    pub reason: VerdictReason,
}

impl LeakVerdict {
    const fn clear(reason: VerdictReason) -> Self {
        Self {
            leak_detected: false,
            reason,
        }
    }

    const fn leak() -> Self {
        Self {
            leak_detected: true,
            reason: VerdictReason::ConfirmedConsistentGrowth,
        }
    }
}

/// Pure leak classifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrendAnalyzer {
    thresholds: LeakThresholds,
}

impl TrendAnalyzer {
    #[must_use]
    pub const fn new(thresholds: LeakThresholds) -> Self {
        Self { thresholds }
    }

    /// Compute statistics and a verdict for `samples`
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSamples`] if `samples` is empty
    pub fn analyze(&self, samples: &[Sample]) -> Result<(TrendStatistics, LeakVerdict)> {
        let rss: Vec<u64> = samples.iter().map(Sample::rss_bytes).collect();
        let stats = statistics(&rss).ok_or(Error::NoSamples)?;
        Ok((stats, self.classify(&stats)))
    }

    fn classify(&self, stats: &TrendStatistics) -> LeakVerdict {
        if stats.sample_count < 2 {
            return LeakVerdict::clear(VerdictReason::InsufficientSamples);
        }

        if stats.growth_bytes < self.thresholds.growth_floor_bytes {
            return LeakVerdict::clear(VerdictReason::GrowthWithinTolerance);
        }

        let floor = i64::try_from(self.thresholds.consistency_floor_bytes).unwrap_or(i64::MAX);
        if stats.consistent_growth_bytes < floor {
            return LeakVerdict::clear(VerdictReason::GrowthBelowConsistencyFloor);
        }

        LeakVerdict::leak()
    }
}

fn statistics(rss: &[u64]) -> Option<TrendStatistics> {
    let min_rss = rss.iter().copied().min()?;
    let max_rss = rss.iter().copied().max()?;
    let avg_rss = average(rss)?;

    let (first_half_avg, second_half_avg) = if rss.len() < 2 {
        (avg_rss, avg_rss)
    } else {
        let (first, second) = rss.split_at(rss.len() / 2);
        (average(first)?, average(second)?)
    };

    Some(TrendStatistics {
        sample_count: rss.len(),
        min_rss,
        max_rss,
        avg_rss,
        growth_bytes: max_rss.saturating_sub(min_rss),
        first_half_avg,
        second_half_avg,
        consistent_growth_bytes: signed_delta(second_half_avg, first_half_avg),
    })
}

/// Integer mean; `None` for an empty slice
fn average(values: &[u64]) -> Option<u64> {
    let count = u128::try_from(values.len()).ok().filter(|n| *n > 0)?;
    let sum: u128 = values.iter().map(|v| u128::from(*v)).sum();
    u64::try_from(sum.checked_div(count)?).ok()
}

fn signed_delta(later: u64, earlier: u64) -> i64 {
    let delta = i128::from(later).saturating_sub(i128::from(earlier));
    i64::try_from(delta).unwrap_or(if delta.is_negative() {
        i64::MIN
    } else {
        i64::MAX
    })
}
