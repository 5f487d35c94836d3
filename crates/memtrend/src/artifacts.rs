//! Persisting rendered reports to disk
//!
//! Each artifact is written independently. A failure on one is recorded
//! and logged, and the remaining artifacts are still attempted.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::error::{Error, Result};
use crate::report::{ArtifactKind, CsvRow, ReportArtifact};

/// Which artifacts made it to disk and which did not
#[derive(Debug, Default)]
pub struct PersistOutcome {
    pub written: Vec<(ArtifactKind, PathBuf)>,
    pub failures: Vec<Error>,
}

impl PersistOutcome {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Path of a written artifact
    #[must_use]
    pub fn path_of(&self, kind: ArtifactKind) -> Option<&Path> {
        self.written
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, p)| p.as_path())
    }
}

/// Writes the CSV log, chart and summary under one directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Write all three artifacts, suffixed with `stamp`
    pub fn persist(&self, artifact: &ReportArtifact, stamp: &str) -> PersistOutcome {
        if let Err(e) = fs::create_dir_all(&self.output_dir) {
            error!(
                dir = %self.output_dir.display(),
                error = %e,
                "failed to create output directory"
            );
        }

        let attempts = [
            (ArtifactKind::Csv, self.write_csv(&artifact.csv_rows, stamp)),
            (
                ArtifactKind::Chart,
                self.write_text(ArtifactKind::Chart, &artifact.chart_text, stamp),
            ),
            (
                ArtifactKind::Summary,
                self.write_text(ArtifactKind::Summary, &artifact.summary_text, stamp),
            ),
        ];

        attempts
            .into_iter()
            .fold(PersistOutcome::default(), |mut outcome, (kind, result)| {
                match result {
                    Ok(path) => {
                        info!(artifact = %kind, path = %path.display(), "artifact written");
                        outcome.written.push((kind, path));
                    }
                    Err(e) => {
                        error!(artifact = %kind, error = %e, "artifact write failed");
                        outcome.failures.push(e);
                    }
                }
                outcome
            })
    }

    fn path_for(&self, kind: ArtifactKind, stamp: &str) -> PathBuf {
        self.output_dir.join(kind.file_name(stamp))
    }

    fn write_csv(&self, rows: &[CsvRow], stamp: &str) -> Result<PathBuf> {
        let path = self.path_for(ArtifactKind::Csv, stamp);
        let fail = |reason: String| Error::artifact_write(ArtifactKind::Csv, &path, reason);

        let mut writer = csv::Writer::from_path(&path).map_err(|e| fail(e.to_string()))?;
        for row in rows {
            writer.serialize(row).map_err(|e| fail(e.to_string()))?;
        }
        if rows.is_empty() {
            writer
                .write_record(["timestamp", "rss_kb", "vsz_kb", "percent_mem"])
                .map_err(|e| fail(e.to_string()))?;
        }
        writer.flush().map_err(|e| fail(e.to_string()))?;

        Ok(path)
    }

    fn write_text(&self, kind: ArtifactKind, text: &str, stamp: &str) -> Result<PathBuf> {
        let path = self.path_for(kind, stamp);
        fs::write(&path, text).map_err(|e| Error::artifact_write(kind, &path, e.to_string()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::indexing_slicing)]

    use super::*;
    use tempfile::TempDir;

    fn artifact() -> ReportArtifact {
        ReportArtifact {
            summary_text: "summary\n".to_string(),
            chart_text: "chart\n".to_string(),
            csv_rows: vec![
                CsvRow {
                    timestamp: "2026-01-01T00:00:00+00:00".to_string(),
                    rss_kb: 1024,
                    vsz_kb: 4096,
                    percent_mem: Some("0.50".to_string()),
                },
                CsvRow {
                    timestamp: "2026-01-01T00:00:01+00:00".to_string(),
                    rss_kb: 2048,
                    vsz_kb: 4096,
                    percent_mem: None,
                },
            ],
        }
    }

    #[test]
    fn test_writes_all_three_artifacts() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path().join("out"));

        let outcome = writer.persist(&artifact(), "20260101-000000");

        assert!(outcome.is_complete());
        assert_eq!(outcome.written.len(), 3);
        let csv = fs::read_to_string(outcome.path_of(ArtifactKind::Csv).unwrap()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("timestamp,rss_kb,vsz_kb,percent_mem"));
        assert_eq!(lines.next(), Some("2026-01-01T00:00:00+00:00,1024,4096,0.50"));
        assert_eq!(lines.next(), Some("2026-01-01T00:00:01+00:00,2048,4096,"));
    }

    #[test]
    fn test_chart_failure_does_not_block_other_artifacts() {
        let dir = TempDir::new().unwrap();
        let stamp = "20260101-000000";
        // A directory where the chart file should go makes that write fail
        fs::create_dir_all(dir.path().join(ArtifactKind::Chart.file_name(stamp))).unwrap();
        let writer = ArtifactWriter::new(dir.path());

        let outcome = writer.persist(&artifact(), stamp);

        assert_eq!(outcome.failures.len(), 1);
        assert!(matches!(
            outcome.failures[0],
            Error::ArtifactWrite {
                kind: ArtifactKind::Chart,
                ..
            }
        ));
        assert!(outcome.path_of(ArtifactKind::Csv).is_some());
        assert!(outcome.path_of(ArtifactKind::Summary).is_some());
        let summary = fs::read_to_string(dir.path().join(ArtifactKind::Summary.file_name(stamp)));
        assert_eq!(summary.ok().as_deref(), Some("summary\n"));
    }

    #[test]
    fn test_empty_csv_still_has_header() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let mut empty = artifact();
        empty.csv_rows.clear();

        let outcome = writer.persist(&empty, "s");
        let csv = fs::read_to_string(outcome.path_of(ArtifactKind::Csv).unwrap()).unwrap();
        assert_eq!(csv.trim_end(), "timestamp,rss_kb,vsz_kb,percent_mem");
    }
}
