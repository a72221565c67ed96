//! Error types for vendor fetches and per-site failures.
//!
//! Source-data problems (missing or malformed fields) never become errors;
//! the normalizer falls back instead. Only an unavailable back end is an
//! error, and the poller turns it into a [`SiteError`] value that travels
//! next to the topologies that did succeed.

use crate::source::SiteRef;
use serde::Serialize;
use thiserror::Error;

/// Result type alias for vendor source operations.
pub type Result<T> = std::result::Result<T, SourceError>;

/// Errors a [`VendorSource`](crate::VendorSource) may return.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The back end refused the request or could not be reached.
    #[error("Vendor back end unavailable for {site}: {message}")]
    Unavailable {
        /// Site the request was for.
        site: String,
        /// Error message.
        message: String,
    },

    /// The back end did not answer in time.
    #[error("Vendor request for {site} timed out")]
    Timeout {
        /// Site the request was for.
        site: String,
    },

    /// The back end answered with something that is not a record list.
    #[error("Invalid payload from {site}: {message}")]
    InvalidPayload {
        /// Site the request was for.
        site: String,
        /// Error message.
        message: String,
    },
}

impl SourceError {
    /// Creates an unavailable error.
    pub fn unavailable(site: impl ToString, message: impl Into<String>) -> Self {
        Self::Unavailable {
            site: site.to_string(),
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(site: impl ToString) -> Self {
        Self::Timeout {
            site: site.to_string(),
        }
    }

    /// Creates an invalid payload error.
    pub fn invalid_payload(site: impl ToString, message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            site: site.to_string(),
            message: message.into(),
        }
    }

    /// Returns true if this error indicates a transient condition
    /// that may succeed on the next poll.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}

/// Why a site contributed nothing to a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SiteFailure {
    /// The whole fetch exceeded the per-site deadline.
    Timeout { after_ms: u64 },
    /// A device or client fetch failed.
    Fetch { message: String, retryable: bool },
    /// The site task panicked or was cancelled.
    Aborted,
}

impl From<SourceError> for SiteFailure {
    fn from(err: SourceError) -> Self {
        SiteFailure::Fetch {
            retryable: err.is_retryable(),
            message: err.to_string(),
        }
    }
}

/// Failure marker for one site in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteError {
    pub site: SiteRef,
    #[serde(flatten)]
    pub failure: SiteFailure,
}

impl std::fmt::Display for SiteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.failure {
            SiteFailure::Timeout { after_ms } => {
                write!(f, "{}: timed out after {}ms", self.site, after_ms)
            }
            SiteFailure::Fetch { message, .. } => write!(f, "{}: {}", self.site, message),
            SiteFailure::Aborted => write!(f, "{}: aborted", self.site),
        }
    }
}
