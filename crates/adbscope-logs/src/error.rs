use std::io;

use thiserror::Error;

/// Invalid filter configuration
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("unknown priority '{0}' in priority filter (expected letters from VDIWEF)")]
    InvalidPriority(char),

    #[error("minimum priority must be one of V, D, I, W, E, F (got '{0}')")]
    InvalidMinPriority(String),

    #[error("invalid {field} pattern '{pattern}'")]
    InvalidPattern {
        field: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("tag length must be greater than zero")]
    ZeroTagLength,
}

/// The external process list could not be obtained
#[derive(Debug, Error)]
pub enum ProcessListError {
    #[error("failed to run process list command")]
    Spawn(#[source] io::Error),

    #[error("process list command failed: {0}")]
    Failed(String),
}

/// Writing a formatted line failed
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write to output file")]
    File(#[source] io::Error),
}

/// Fatal errors that end a viewing session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to read log input")]
    Read(#[source] io::Error),

    #[error(transparent)]
    Sink(#[from] SinkError),
}
