//! Error types for session stores and authentication.

use thiserror::Error;

/// Result type alias for session store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised by a [`SessionStore`](crate::SessionStore) backend.
///
/// These never escape [`SessionCache`](crate::SessionCache); they trigger
/// the switch to the in-process fallback.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Could not establish a connection to the backend.
    #[error("Session store connection failed: {0}")]
    Connection(String),

    /// The backend did not answer in time.
    #[error("Session store {operation} timed out")]
    Timeout {
        /// The operation that timed out (e.g., "get", "set", "ping").
        operation: &'static str,
    },

    /// A command failed on an established connection.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A stored value could not be encoded or decoded.
    #[error("Session entry serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Creates a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }
}

/// Errors from a FortiManager login or logout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The manager refused the credentials or the session token.
    #[error("Authentication rejected: {0}")]
    Rejected(String),

    /// The manager could not be reached.
    #[error("Authentication transport error: {0}")]
    Transport(String),
}

impl AuthError {
    pub fn is_rejected(&self) -> bool {
        matches!(self, AuthError::Rejected(_))
    }
}
