//! Error types for the hub identification pipeline

use std::io;
use std::path::{Path, PathBuf};

/// Errors raised by the pipeline and its aggregators
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path}:{line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("required input not found: {0}")]
    MissingInput(PathBuf),

    #[error("required template not found: {0}")]
    MissingTemplate(PathBuf),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("parcel {parcel} has a constant timeseries; correlation is undefined")]
    ConstantTimeseries { parcel: usize },

    #[error("parcel {parcel} contains a non-finite sample at timepoint {timepoint}")]
    NonFiniteSample { parcel: usize, timepoint: usize },

    #[error("{what}: expected {expected}, found {found}")]
    ShapeMismatch {
        what: &'static str,
        expected: String,
        found: String,
    },

    #[error("proportional threshold must lie in [0, 1], got {0}")]
    InvalidThreshold(f64),

    #[error("NaN found in matrix thresholded at {threshold}")]
    NanInThresholdedMatrix { threshold: f64 },

    #[error("affiliation vector {path} has {found} entries, expected {expected}")]
    AffiliationCount {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error("hub {hub} belongs to {memberships} networks, expected exactly one")]
    SelfConnection { hub: usize, memberships: usize },

    #[error("parcel index {index} in {path} is outside 1..={max}")]
    ParcelOutOfRange {
        path: PathBuf,
        index: usize,
        max: usize,
    },

    #[error("failed to launch {program}: {source}")]
    ExternalLaunch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    ExternalFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("{program} did not finish within {seconds}s")]
    ExternalTimeout { program: String, seconds: u64 },
}

impl HubError {
    /// Whether this error must stop the whole run rather than a single subject
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, HubError::MissingTemplate(_) | HubError::Config(_))
    }

    /// Build a closure that wraps an `io::Error` with the path it occurred on
    pub fn io(path: &Path) -> impl FnOnce(io::Error) -> HubError + '_ {
        move |source| HubError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, HubError>;
