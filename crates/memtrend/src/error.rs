//! Error types for memory-trend monitoring
//!
//! Errors are explicit and typed. A target process that exits mid-run is
//! not an error; it is reported through [`crate::TerminationReason`].

use std::path::PathBuf;

use thiserror::Error;

use crate::report::ArtifactKind;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Exit code for a clean run with no leak
pub const EXIT_OK: i32 = 0;

/// Exit code for a detected leak, unresolved breach or missing process
pub const EXIT_FAILURE: i32 = 1;

/// Exit code for invalid arguments or configuration
pub const EXIT_USAGE: i32 = 2;

/// Errors raised while monitoring a process
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("no live process matches '{target}'")]
    ProcessNotFound { target: String },

    #[error("cannot analyze an empty sample set")]
    NoSamples,

    #[error("failed to read memory for pid {pid}: {reason}")]
    ProcessRead { pid: u32, reason: String },

    #[error("failed to write {kind} artifact '{path}': {reason}")]
    ArtifactWrite {
        kind: ArtifactKind,
        path: PathBuf,
        reason: String,
    },

    #[error("failed to load config file '{path}': {reason}")]
    ConfigFile { path: PathBuf, reason: String },
}

impl Error {
    /// Create a configuration error
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }

    /// Create a process-not-found error
    pub fn process_not_found(target: impl Into<String>) -> Self {
        Self::ProcessNotFound {
            target: target.into(),
        }
    }

    /// Create a transient process read error
    pub fn process_read(pid: u32, reason: impl Into<String>) -> Self {
        Self::ProcessRead {
            pid,
            reason: reason.into(),
        }
    }

    /// Create an artifact write error
    pub fn artifact_write(
        kind: ArtifactKind,
        path: impl Into<PathBuf>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ArtifactWrite {
            kind,
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a config file error
    pub fn config_file(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ConfigFile {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Process exit code documented for this error
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) | Self::ConfigFile { .. } => EXIT_USAGE,
            _ => EXIT_FAILURE,
        }
    }
}
