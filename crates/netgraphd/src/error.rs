//! Error types for netgraphd.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for daemon operations.
pub type Result<T> = std::result::Result<T, DaemonError>;

/// Errors that stop the daemon. Per-site failures are not among them;
/// they are reported in the output instead.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Reading a file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`DaemonConfig`](crate::DaemonConfig).
    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// The config parsed but a value is out of range.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Writing the topology file failed.
    #[error("Failed to write output {path}: {message}")]
    Output { path: PathBuf, message: String },
}

impl DaemonError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn output(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Output {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
