//! The session cache: soft expiry over a shared store, with fallback.

use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;
use crate::memory::MemoryStore;
use crate::redis_store::{RedisConfig, RedisStore};
use crate::store::SessionStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Safely below FortiManager's ~30 minute session lifetime.
pub const DEFAULT_SOFT_TTL: Duration = Duration::from_secs(25 * 60);

const KEY_PREFIX: &str = "fm_session:";

/// Identifies one FortiManager login.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub site: String,
    pub host: String,
    pub username: String,
}

impl SessionKey {
    pub fn new(
        site: impl Into<String>,
        host: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        SessionKey {
            site: site.into(),
            host: host.into(),
            username: username.into(),
        }
    }

    /// Opaque store key: `fm_session:` + md5 of `site:host:username`.
    pub fn cache_key(&self) -> String {
        let digest = md5::compute(format!("{}:{}:{}", self.site, self.host, self.username));
        format!("{}{:x}", KEY_PREFIX, digest)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}/{}", self.username, self.host, self.site)
    }
}

/// Value stored per key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedSession {
    pub site: String,
    pub host: String,
    pub username: String,
    pub session_token: String,
    pub created_at: DateTime<Utc>,
}

/// Which store the cache is currently using.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// The shared store is healthy.
    Shared,
    /// The shared store failed; using the in-process map.
    Degraded,
    /// Configured without a shared store.
    Local,
}

/// FortiManager session-token cache.
///
/// Entries are written with a hard TTL equal to the soft TTL, and on read
/// any entry whose age has reached the soft TTL is treated as absent and
/// deleted, whatever the store's own TTL says.
///
/// The first backend error switches every later call to the in-process
/// store. The switch is logged once. [`check`](Self::check) can switch
/// back once the shared store answers again.
pub struct SessionCache {
    shared: Option<Arc<dyn SessionStore>>,
    fallback: MemoryStore,
    degraded: AtomicBool,
    soft_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionCache {
    /// Cache over an already constructed shared store.
    pub fn new(shared: Arc<dyn SessionStore>, soft_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        SessionCache {
            shared: Some(shared),
            fallback: MemoryStore::new(clock.clone()),
            degraded: AtomicBool::new(false),
            soft_ttl,
            clock,
        }
    }

    /// Cache with no shared store.
    pub fn local(soft_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        SessionCache {
            shared: None,
            fallback: MemoryStore::new(clock.clone()),
            degraded: AtomicBool::new(false),
            soft_ttl,
            clock,
        }
    }

    /// Connects to Redis, starting degraded if that fails.
    #[instrument(skip_all)]
    pub async fn connect(config: &RedisConfig, soft_ttl: Duration) -> Self {
        match RedisStore::connect(config).await {
            Ok(store) => Self::new(Arc::new(store), soft_ttl, Arc::new(SystemClock)),
            Err(e) => {
                let cache = Self::new(Arc::new(Unreachable), soft_ttl, Arc::new(SystemClock));
                cache.degrade(&e);
                cache
            }
        }
    }

    pub fn soft_ttl(&self) -> Duration {
        self.soft_ttl
    }

    pub fn mode(&self) -> CacheMode {
        match (&self.shared, self.degraded.load(Ordering::Acquire)) {
            (None, _) => CacheMode::Local,
            (Some(_), true) => CacheMode::Degraded,
            (Some(_), false) => CacheMode::Shared,
        }
    }

    /// Pings the shared store and updates the mode accordingly.
    ///
    /// Entries written to the fallback while degraded are not copied back;
    /// those sessions simply log in again.
    pub async fn check(&self) -> CacheMode {
        if let Some(shared) = &self.shared {
            match shared.ping().await {
                Ok(()) => {
                    if self.degraded.swap(false, Ordering::AcqRel) {
                        info!("Session store reachable again, leaving fallback");
                    }
                }
                Err(e) => self.degrade(&e),
            }
        }
        self.mode()
    }

    /// Returns the cached token, or `None` if absent, evicted or past the
    /// soft TTL.
    #[instrument(skip(self), fields(session = %key))]
    pub async fn get(&self, key: &SessionKey) -> Option<String> {
        let cache_key = key.cache_key();
        let raw = match self.active() {
            Some(shared) => match shared.get(&cache_key).await {
                Ok(raw) => raw,
                Err(e) => {
                    self.degrade(&e);
                    self.fallback.get_value(&cache_key)
                }
            },
            None => self.fallback.get_value(&cache_key),
        }?;

        let entry = match serde_json::from_str::<CachedSession>(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Discarding undecodable session entry");
                self.remove(&cache_key).await;
                return None;
            }
        };

        if !self.is_fresh(&entry) {
            debug!(created_at = %entry.created_at, "Session past soft expiry");
            self.remove(&cache_key).await;
            return None;
        }

        debug!("Session cache hit");
        Some(entry.session_token)
    }

    /// Caches `token`, replacing any entry for the same key.
    #[instrument(skip(self, token), fields(session = %key))]
    pub async fn store(&self, key: &SessionKey, token: &str) {
        let entry = CachedSession {
            site: key.site.clone(),
            host: key.host.clone(),
            username: key.username.clone(),
            session_token: token.to_string(),
            created_at: self.clock.now(),
        };
        let value = match serde_json::to_string(&entry) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Could not encode session entry");
                return;
            }
        };

        let cache_key = key.cache_key();
        if let Some(shared) = self.active() {
            match shared.set_with_ttl(&cache_key, &value, self.soft_ttl).await {
                Ok(()) => {
                    debug!("Session cached");
                    return;
                }
                Err(e) => self.degrade(&e),
            }
        }
        self.fallback.set_value(&cache_key, &value, self.soft_ttl);
        debug!("Session cached in process");
    }

    /// Every live session, sorted by site then host then username.
    ///
    /// Entries past the soft TTL or that fail to decode are skipped and
    /// left for [`get`](Self::get) to clean up.
    #[instrument(skip(self))]
    pub async fn sessions(&self) -> Vec<CachedSession> {
        let mut listed = None;
        if let Some(shared) = self.active() {
            match Self::read_all(shared.as_ref()).await {
                Ok(values) => listed = Some(values),
                Err(e) => self.degrade(&e),
            }
        }
        let raw = listed.unwrap_or_else(|| {
            self.fallback
                .keys_with_prefix(KEY_PREFIX)
                .iter()
                .filter_map(|key| self.fallback.get_value(key))
                .collect()
        });

        let mut sessions: Vec<CachedSession> = raw
            .iter()
            .filter_map(|value| serde_json::from_str::<CachedSession>(value).ok())
            .filter(|entry| self.is_fresh(entry))
            .collect();
        sessions.sort_by(|a, b| {
            (&a.site, &a.host, &a.username).cmp(&(&b.site, &b.host, &b.username))
        });
        debug!(count = sessions.len(), "Listed cached sessions");
        sessions
    }

    /// Forgets the entry for `key`, if any.
    #[instrument(skip(self), fields(session = %key))]
    pub async fn invalidate(&self, key: &SessionKey) {
        self.remove(&key.cache_key()).await;
        debug!("Session invalidated");
    }

    fn is_fresh(&self, entry: &CachedSession) -> bool {
        let age = self.clock.now().signed_duration_since(entry.created_at);
        match age.to_std() {
            Ok(age) => age < self.soft_ttl,
            // Created "in the future" (clock skew between processes)
            Err(_) => true,
        }
    }

    async fn remove(&self, cache_key: &str) {
        // Also clear the fallback so a stale copy cannot resurface later
        self.fallback.remove(cache_key);
        if let Some(shared) = self.active() {
            if let Err(e) = shared.delete(cache_key).await {
                self.degrade(&e);
            }
        }
    }

    async fn read_all(store: &dyn SessionStore) -> crate::Result<Vec<String>> {
        let mut values = Vec::new();
        for key in store.keys(KEY_PREFIX).await? {
            // Keys can expire between KEYS and GET
            if let Some(value) = store.get(&key).await? {
                values.push(value);
            }
        }
        Ok(values)
    }

    fn active(&self) -> Option<&Arc<dyn SessionStore>> {
        if self.degraded.load(Ordering::Acquire) {
            None
        } else {
            self.shared.as_ref()
        }
    }

    fn degrade(&self, error: &StoreError) {
        if !self.degraded.swap(true, Ordering::AcqRel) {
            warn!(%error, "Session store unavailable, using in-process cache");
        }
    }
}

/// Stand-in shared store when the initial connection failed; lets
/// [`SessionCache::check`] report the store as still down.
struct Unreachable;

#[async_trait::async_trait]
impl SessionStore for Unreachable {
    async fn get(&self, _key: &str) -> crate::Result<Option<String>> {
        Err(StoreError::connection("not connected"))
    }

    async fn set_with_ttl(&self, _key: &str, _value: &str, _ttl: Duration) -> crate::Result<()> {
        Err(StoreError::connection("not connected"))
    }

    async fn delete(&self, _key: &str) -> crate::Result<()> {
        Err(StoreError::connection("not connected"))
    }

    async fn keys(&self, _prefix: &str) -> crate::Result<Vec<String>> {
        Err(StoreError::connection("not connected"))
    }

    async fn ping(&self) -> crate::Result<()> {
        Err(StoreError::connection("not connected"))
    }
}
