//! Backing store interface for the session cache.

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// A key/value store with per-key expiry.
///
/// `set_with_ttl` must be atomic: concurrent writers to the same key end
/// with one complete value (last write wins).
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the value, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes `value`, replacing any existing entry, expiring after `ttl`.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Removes the key. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Lists live keys starting with `prefix`, in no particular order.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Checks that the store is reachable.
    async fn ping(&self) -> Result<()>;
}
