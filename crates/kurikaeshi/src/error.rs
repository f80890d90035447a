//! Configuration error types.

use kurikaeshi_core::BackoffError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or validating a [`RunnerConfig`](crate::RunnerConfig).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config file {}: {source}", .path.display())]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range or malformed.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// The backoff table has invalid parameters.
    #[error(transparent)]
    Backoff(#[from] BackoffError),
}
