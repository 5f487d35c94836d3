#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # memtrend
//!
//! Samples a running process's memory over time, decides whether the
//! trend is a leak or noise, raises live threshold alerts, and renders a
//! CSV log, an ASCII trend chart and a summary report.
//!
//! ```no_run
//! # use memtrend::{MonitorConfig, Session, SysinfoProcessTable};
//! # use std::time::Duration;
//! # async fn demo() -> memtrend::Result<()> {
//! let config = MonitorConfig::new(Duration::from_secs(10), Duration::from_secs(300), 1 << 30)?;
//! let (_stop, cancel) = tokio::sync::watch::channel(false);
//! let outcome = Session::new("my-server", config, SysinfoProcessTable::new())
//!     .run(cancel, |alert| eprintln!("{alert}"))
//!     .await?;
//! println!("{}", outcome.report.summary_text);
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod artifacts;
pub mod config;
pub mod error;
pub mod process;
pub mod report;
pub mod sample;
pub mod sampler;
pub mod session;
pub mod threshold;

pub use analyzer::{LeakVerdict, TrendAnalyzer, TrendStatistics, VerdictReason};
pub use artifacts::{ArtifactWriter, PersistOutcome};
pub use config::{BYTES_PER_MB, LeakThresholds, MonitorConfig};
pub use error::{EXIT_FAILURE, EXIT_OK, EXIT_USAGE, Error, Result};
pub use process::{ProcessTable, SysinfoProcessTable};
pub use report::{ArtifactKind, CsvRow, ReportArtifact, Reporter, render_chart};
pub use sample::{MemoryReading, Sample};
pub use sampler::{ResolvedTarget, Sampler, SamplingRun, TerminationReason};
pub use session::{Session, SessionOutcome, SessionRecord, SessionState};
pub use threshold::{AlertEvent, ThresholdMonitor};
