//! Redis-backed session store.
//!
//! Every poller process shares the same Redis, so a token obtained by one
//! is reused by all. Entries are written with `SET key value EX ttl`, which
//! is atomic, so concurrent logins resolve to last-write-wins.

use crate::error::{Result, StoreError};
use crate::store::SessionStore;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::fmt;
use std::time::Duration;
use tokio::time::{error::Elapsed, timeout};
use tracing::{debug, info, instrument};

/// Connection settings for the shared store.
#[derive(Clone, PartialEq, Eq)]
pub struct RedisConfig {
    /// Redis server hostname or IP
    pub host: String,
    /// Redis server port
    pub port: u16,
    /// Database index
    pub db: i64,
    /// Optional AUTH password; must be URL-safe
    pub password: Option<String>,
    /// Bound on connecting and on each command
    pub timeout: Duration,
}

impl RedisConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        RedisConfig {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Returns the Redis connection URI.
    pub fn uri(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                password, self.host, self.port, self.db
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        RedisConfig {
            host: "127.0.0.1".to_string(),
            port: 6379,
            db: 0,
            password: None,
            timeout: Duration::from_secs(2),
        }
    }
}

// Keeps the password out of logs
impl fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("db", &self.db)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Session store on a Redis connection manager.
///
/// The manager reconnects in the background; commands issued while it is
/// down fail fast and the cache falls back to memory.
pub struct RedisStore {
    conn: ConnectionManager,
    timeout: Duration,
}

impl RedisStore {
    /// Connects and verifies the server answers.
    #[instrument(skip_all, fields(host = %config.host, port = config.port, db = config.db))]
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.uri()).map_err(|e| {
            StoreError::connection(format!("{}:{}: {}", config.host, config.port, e))
        })?;

        let conn = timeout(config.timeout, ConnectionManager::new(client))
            .await
            .map_err(elapsed("connect"))?
            .map_err(|e| {
                StoreError::connection(format!("{}:{}: {}", config.host, config.port, e))
            })?;

        let store = RedisStore {
            conn,
            timeout: config.timeout,
        };
        store.ping().await?;

        info!("Connected to session store");
        Ok(store)
    }
}

fn elapsed(operation: &'static str) -> impl FnOnce(Elapsed) -> StoreError {
    move |_| StoreError::Timeout { operation }
}

/// Whole seconds for `EX`, rounded up, never zero.
fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

#[async_trait]
impl SessionStore for RedisStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = timeout(self.timeout, conn.get(key))
            .await
            .map_err(elapsed("get"))??;
        debug!(hit = value.is_some(), "GET");
        Ok(value)
    }

    #[instrument(skip(self, value))]
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let secs = ttl_secs(ttl);
        let _: () = timeout(
            self.timeout,
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(secs)
                .query_async(&mut conn),
        )
        .await
        .map_err(elapsed("set"))??;
        debug!(ttl = secs, "SET EX");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = timeout(self.timeout, conn.del(key))
            .await
            .map_err(elapsed("delete"))??;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", prefix);
        let keys: Vec<String> = timeout(self.timeout, conn.keys(&pattern))
            .await
            .map_err(elapsed("keys"))??;
        debug!(count = keys.len(), "KEYS");
        Ok(keys)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = timeout(self.timeout, redis::cmd("PING").query_async(&mut conn))
            .await
            .map_err(elapsed("ping"))??;
        Ok(())
    }
}
