//! Configuration file support for netgraphd
//!
//! Loads and validates the daemon configuration from TOML.
//! Default location: /etc/netgraph/netgraphd.toml

use crate::error::{DaemonError, Result};
use netgraph_session::RedisConfig;
use netgraph_topology::{PollContext, SiteRef, Vendor};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/netgraph/netgraphd.toml";

/// Poll cycle configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Seconds between cycles; 0 runs a single cycle
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Deadline for fetching one site
    #[serde(default = "default_site_timeout")]
    pub site_timeout_secs: u64,

    /// Sites fetched concurrently
    #[serde(default = "default_max_concurrent_sites")]
    pub max_concurrent_sites: usize,

    /// Look-back window for client listings
    #[serde(default = "default_client_timespan")]
    pub client_timespan_secs: u64,
}

/// FortiManager session cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Age at which a cached token is no longer reused
    #[serde(default = "default_soft_ttl")]
    pub soft_ttl_secs: u64,
}

/// Shared session store configuration
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct RedisSection {
    /// Use Redis at all; when false the session cache stays in process
    #[serde(default = "default_redis_enabled")]
    pub enabled: bool,

    #[serde(default = "default_redis_host")]
    pub host: String,

    #[serde(default = "default_redis_port")]
    pub port: u16,

    #[serde(default)]
    pub db: i64,

    #[serde(default)]
    pub password: Option<String>,

    /// Bound on connecting and on each command
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

/// Output file configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,

    /// Indent the JSON
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

/// One polled site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub vendor: Vendor,
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    /// Directory holding `<id>/devices.json`, `<id>/clients.json` and
    /// optionally `<id>/links.json`
    pub snapshot_dir: PathBuf,
}

/// Complete netgraphd configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub poll: PollConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub redis: RedisSection,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub sites: Vec<SiteConfig>,
}

fn default_interval() -> u64 {
    300
}

fn default_site_timeout() -> u64 {
    30
}

fn default_max_concurrent_sites() -> usize {
    4
}

fn default_client_timespan() -> u64 {
    86400
}

fn default_soft_ttl() -> u64 {
    1500
}

fn default_redis_enabled() -> bool {
    true
}

fn default_redis_host() -> String {
    "127.0.0.1".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

fn default_connect_timeout() -> u64 {
    2000
}

fn default_output_path() -> PathBuf {
    PathBuf::from("topology.json")
}

fn default_pretty() -> bool {
    true
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            site_timeout_secs: default_site_timeout(),
            max_concurrent_sites: default_max_concurrent_sites(),
            client_timespan_secs: default_client_timespan(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            soft_ttl_secs: default_soft_ttl(),
        }
    }
}

impl Default for RedisSection {
    fn default() -> Self {
        Self {
            enabled: default_redis_enabled(),
            host: default_redis_host(),
            port: default_redis_port(),
            db: 0,
            password: None,
            connect_timeout_ms: default_connect_timeout(),
        }
    }
}

// Keeps the password out of logs
impl std::fmt::Debug for RedisSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSection")
            .field("enabled", &self.enabled)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("db", &self.db)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .finish()
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            pretty: default_pretty(),
        }
    }
}

impl SiteConfig {
    pub fn site_ref(&self) -> SiteRef {
        let site = SiteRef::new(self.vendor, self.id.clone());
        match &self.name {
            Some(name) => site.with_name(name.clone()),
            None => site,
        }
    }
}

impl DaemonConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(path, &content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(DaemonError::io(path, e)),
        }
    }

    fn from_toml(path: &Path, content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| DaemonError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// `None` when the daemon should run a single cycle.
    pub fn poll_interval(&self) -> Option<Duration> {
        match self.poll.interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn poll_context(&self) -> PollContext {
        PollContext {
            client_timespan: Duration::from_secs(self.poll.client_timespan_secs),
            site_timeout: Duration::from_secs(self.poll.site_timeout_secs),
            max_concurrency: self.poll.max_concurrent_sites,
        }
    }

    pub fn soft_ttl(&self) -> Duration {
        Duration::from_secs(self.session.soft_ttl_secs)
    }

    pub fn has_vendor(&self, vendor: Vendor) -> bool {
        self.sites.iter().any(|site| site.vendor == vendor)
    }

    /// `None` when Redis is disabled.
    pub fn redis_config(&self) -> Option<RedisConfig> {
        if !self.redis.enabled {
            return None;
        }
        Some(RedisConfig {
            host: self.redis.host.clone(),
            port: self.redis.port,
            db: self.redis.db,
            password: self.redis.password.clone(),
            timeout: Duration::from_millis(self.redis.connect_timeout_ms),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.poll.site_timeout_secs == 0 {
            return Err(DaemonError::config("site_timeout_secs must be > 0"));
        }

        if self.poll.max_concurrent_sites == 0 {
            return Err(DaemonError::config("max_concurrent_sites must be > 0"));
        }

        if self.session.soft_ttl_secs == 0 {
            return Err(DaemonError::config("soft_ttl_secs must be > 0"));
        }

        if self.redis.enabled && self.redis.port == 0 {
            return Err(DaemonError::config("redis port must be > 0"));
        }

        let mut seen = HashSet::new();
        for site in &self.sites {
            if site.id.trim().is_empty() {
                return Err(DaemonError::config("site id must not be empty"));
            }
            if !seen.insert((site.vendor, site.id.as_str())) {
                return Err(DaemonError::config(format!(
                    "duplicate site {}/{}",
                    site.vendor, site.id
                )));
            }
        }

        Ok(())
    }
}
