//! Poll loop: fetch every configured site, merge, write the result.

use crate::config::DaemonConfig;
use crate::error::{DaemonError, Result};
use crate::snapshot::SnapshotSource;
use netgraph_session::{SessionCache, SystemClock};
use netgraph_topology::{Poller, SiteRef, UnifiedTopology, Vendor, VendorSource};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::{info, instrument, warn};

pub struct Daemon {
    config: DaemonConfig,
    sites: Vec<(SiteRef, Arc<dyn VendorSource>)>,
    sessions: Arc<SessionCache>,
}

impl Daemon {
    /// Builds sources for every configured site and opens the session cache.
    ///
    /// Redis is only contacted when a Fortinet site is configured; Meraki
    /// sites never log in.
    pub async fn new(config: DaemonConfig) -> Self {
        let shared = config
            .redis_config()
            .filter(|_| config.has_vendor(Vendor::Fortinet));
        let sessions = match shared {
            Some(redis) => SessionCache::connect(&redis, config.soft_ttl()).await,
            None => SessionCache::local(config.soft_ttl(), Arc::new(SystemClock)),
        };
        Self::with_sessions(config, Arc::new(sessions))
    }

    pub fn with_sessions(config: DaemonConfig, sessions: Arc<SessionCache>) -> Self {
        let sites = config
            .sites
            .iter()
            .map(|site| {
                let source: Arc<dyn VendorSource> =
                    Arc::new(SnapshotSource::new(site.snapshot_dir.clone()));
                (site.site_ref(), source)
            })
            .collect();

        Daemon {
            config,
            sites,
            sessions,
        }
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    /// Session cache shared by every FortiManager login this process makes.
    ///
    /// Snapshot sources never log in; a live FortiManager source takes this
    /// cache into its `SessionBroker`. Each cycle still checks it so a
    /// recovered Redis is picked up again.
    pub fn sessions(&self) -> &Arc<SessionCache> {
        &self.sessions
    }

    /// Runs one poll cycle and writes the unified topology.
    #[instrument(skip(self), fields(sites = self.sites.len()))]
    pub async fn run_cycle(&self) -> Result<UnifiedTopology> {
        let cache_mode = self.sessions.check().await;
        let cached_sessions = self.sessions.sessions().await.len();

        // One poller per cycle; nothing carries over between cycles
        let poller = Poller::new(self.config.poll_context());
        let report = poller.poll(self.sites.clone()).await;
        let unified = report.into_unified();

        let stats = unified.topology.stats();
        info!(
            nodes = stats.total_nodes,
            edges = stats.total_edges,
            failed_sites = unified.failures.len(),
            ?cache_mode,
            cached_sessions,
            "Unified topology built"
        );
        for failure in &unified.failures {
            warn!(%failure, "Site missing from topology");
        }

        write_output(&self.config.output.path, &unified, self.config.output.pretty).await?;
        Ok(unified)
    }

    /// Polls until `shutdown` resolves, or once when no interval is set.
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let Some(period) = self.config.poll_interval() else {
            self.run_cycle().await?;
            return Ok(());
        };

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    // A failed write is retried on the next tick
                    if let Err(e) = self.run_cycle().await {
                        warn!(error = %e, "Poll cycle failed");
                    }
                }
            }
        }
    }
}

/// Writes the topology JSON through a temporary file so readers never see
/// a partial document.
pub async fn write_output(path: &Path, topology: &UnifiedTopology, pretty: bool) -> Result<()> {
    let body = if pretty {
        serde_json::to_vec_pretty(topology)
    } else {
        serde_json::to_vec(topology)
    }
    .map_err(|e| DaemonError::output(path, e))?;

    let tmp = temp_path(path);
    tokio::fs::write(&tmp, &body)
        .await
        .map_err(|e| DaemonError::output(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| DaemonError::output(path, e))?;

    info!(path = %path.display(), bytes = body.len(), "Wrote topology");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
