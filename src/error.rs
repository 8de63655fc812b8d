use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures while reading or writing a reference database.
///
/// Loading is all-or-nothing: any of these means no database was produced.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("could not read reference database at {}: {source}", .location.display())]
    Unreachable {
        location: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Wrong document shape, or a fingerprint that is not an exact 64-bit integer.
    #[error("malformed reference database: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("duplicate reference identifier: {0}")]
    DuplicateIdentifier(String),

    #[error("could not write reference database: {0}")]
    Write(#[source] serde_json::Error),
}

impl LoadError {
    pub(crate) fn unreachable(location: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Unreachable {
            location: location.into(),
            source,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
