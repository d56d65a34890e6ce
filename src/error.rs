//! Error types for versioned configuration parsing

use thiserror::Error;

use crate::warning::Position;

/// Result type for configuration parsing operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration parsing errors
///
/// Only [`ConfigError::VersionNotSpecified`] is recovered from by the
/// dispatching parser; every other variant aborts the whole parse.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Carries the position of the empty version field, if there was one
    #[error("version not specified")]
    VersionNotSpecified(Position),

    #[error("invalid version {version:?}: {source}")]
    VersionParse {
        version: String,
        #[source]
        source: semver::Error,
    },

    #[error("invalid version constraint {constraint:?}: {source}")]
    InvalidConstraint {
        constraint: String,
        #[source]
        source: semver::Error,
    },

    #[error("unsupported version {0}")]
    UnsupportedVersion(semver::Version),

    #[error("changelog already contains version {0}")]
    DuplicateChangelogVersion(semver::Version),

    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("decoding error at line {line}, column {column}: {message}")]
    Decode {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("conversion error: {0}")]
    Conversion(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Whether the parse can continue after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ConfigError::VersionNotSpecified(_))
    }
}
