//! Concurrent fetch-and-synthesize over many sites.
//!
//! Each site runs as its own task. A semaphore bounds how many sites are
//! fetched at once, and a per-site deadline covers the whole fetch. A site
//! that fails or times out becomes a [`SiteError`] in the report; the other
//! sites are unaffected.

use crate::error::{Result, SiteError, SiteFailure};
use crate::merge::merge;
use crate::model::{Topology, Vendor};
use crate::normalize::normalize_site;
use crate::source::{LinkFetch, SiteRef, VendorSource};
use crate::synth::synthesize;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

/// Settings for one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollContext {
    /// Look-back window for client listings.
    pub client_timespan: Duration,
    /// Deadline for fetching one site (devices, clients and links).
    pub site_timeout: Duration,
    /// Maximum number of sites fetched at once.
    pub max_concurrency: usize,
}

impl Default for PollContext {
    fn default() -> Self {
        PollContext {
            client_timespan: Duration::from_secs(24 * 60 * 60),
            site_timeout: Duration::from_secs(30),
            max_concurrency: 4,
        }
    }
}

/// Topology for one successfully polled site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteTopology {
    pub site: SiteRef,
    pub topology: Topology,
}

/// Merged graph plus the sites that did not contribute to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnifiedTopology {
    #[serde(flatten)]
    pub topology: Topology,
    pub failures: Vec<SiteError>,
}

/// Outcome of a batch: every input site lands in exactly one list,
/// in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub topologies: Vec<SiteTopology>,
    pub failures: Vec<SiteError>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Unions sites per vendor, then merges the vendors.
    pub fn into_unified(self) -> UnifiedTopology {
        let mut meraki: Option<Topology> = None;
        let mut fortinet: Option<Topology> = None;

        for SiteTopology { site, topology } in self.topologies {
            let slot = match site.vendor {
                Vendor::Meraki => &mut meraki,
                Vendor::Fortinet => &mut fortinet,
            };
            *slot = Some(match slot.take() {
                Some(acc) => acc.union(topology),
                None => topology,
            });
        }

        UnifiedTopology {
            topology: merge(meraki, fortinet),
            failures: self.failures,
        }
    }
}

/// Runs poll cycles. Construct one per cycle from that cycle's context.
pub struct Poller {
    ctx: PollContext,
    permits: Arc<Semaphore>,
}

impl Poller {
    pub fn new(ctx: PollContext) -> Self {
        let permits = Arc::new(Semaphore::new(ctx.max_concurrency.max(1)));
        Poller { ctx, permits }
    }

    /// Polls every site concurrently. Never fails as a whole.
    #[instrument(skip(self, sites), fields(sites = sites.len()))]
    pub async fn poll(&self, sites: Vec<(SiteRef, Arc<dyn VendorSource>)>) -> BatchReport {
        let tasks: Vec<_> = sites
            .into_iter()
            .map(|(site, source)| {
                let permits = self.permits.clone();
                let ctx = self.ctx.clone();
                let task_site = site.clone();
                let handle = tokio::spawn(async move {
                    let _permit = permits
                        .acquire_owned()
                        .await
                        .map_err(|_| SiteFailure::Aborted)?;
                    poll_site(&ctx, source.as_ref(), &task_site).await
                });
                (site, handle)
            })
            .collect();

        let mut report = BatchReport::default();
        for (site, handle) in tasks {
            let outcome = handle.await.unwrap_or_else(|e| {
                warn!(%site, error = %e, "Site task did not complete");
                Err(SiteFailure::Aborted)
            });

            match outcome {
                Ok(topology) => {
                    debug!(%site, nodes = topology.nodes().len(), edges = topology.edges().len(), "Site polled");
                    report.topologies.push(SiteTopology { site, topology });
                }
                Err(failure) => {
                    let error = SiteError { site, failure };
                    warn!(%error, "Site poll failed");
                    report.failures.push(error);
                }
            }
        }

        info!(
            succeeded = report.topologies.len(),
            failed = report.failures.len(),
            "Poll cycle complete"
        );
        report
    }
}

/// Fetches and synthesizes one site under the context's deadline.
pub async fn poll_site(
    ctx: &PollContext,
    source: &dyn VendorSource,
    site: &SiteRef,
) -> std::result::Result<Topology, SiteFailure> {
    match timeout(ctx.site_timeout, fetch_site(source, site, ctx.client_timespan)).await {
        Ok(Ok(topology)) => Ok(topology),
        Ok(Err(e)) => Err(SiteFailure::from(e)),
        Err(_) => Err(SiteFailure::Timeout {
            after_ms: u64::try_from(ctx.site_timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

async fn fetch_site(
    source: &dyn VendorSource,
    site: &SiteRef,
    client_timespan: Duration,
) -> Result<Topology> {
    let (devices, clients, links) = tokio::join!(
        source.fetch_devices(site),
        source.fetch_clients(site, client_timespan),
        source.fetch_links(site),
    );
    let devices = devices?;
    let clients = clients?;

    // Links are optional: fall back to inference rather than fail the site
    let links = match links {
        Ok(LinkFetch::Links(links)) => Some(links),
        Ok(LinkFetch::NotSupported) => None,
        Err(e) => {
            warn!(%site, error = %e, "Link fetch failed, inferring links");
            None
        }
    };

    let normalized = normalize_site(site.vendor, &devices, &clients, links.as_deref());
    Ok(synthesize(normalized))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::model::EdgeKind;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Site with an appliance and a switch; links behaviour configurable.
    struct StaticSource {
        links: fn(&SiteRef) -> Result<LinkFetch>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        delay: Duration,
    }

    impl StaticSource {
        fn new(links: fn(&SiteRef) -> Result<LinkFetch>) -> Self {
            StaticSource {
                links,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl VendorSource for StaticSource {
        async fn fetch_devices(&self, site: &SiteRef) -> Result<Vec<Value>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            Ok(vec![
                json!({"serial": format!("{}-MX", site.id), "model": "MX68", "networkId": site.id}),
                json!({"serial": format!("{}-MS", site.id), "model": "MS120", "networkId": site.id}),
            ])
        }

        async fn fetch_clients(&self, _site: &SiteRef, _timespan: Duration) -> Result<Vec<Value>> {
            Ok(vec![])
        }

        async fn fetch_links(&self, site: &SiteRef) -> Result<LinkFetch> {
            (self.links)(site)
        }
    }

    fn site(id: &str) -> SiteRef {
        SiteRef::new(Vendor::Meraki, id)
    }

    #[tokio::test]
    async fn test_link_failure_degrades_to_inference() {
        let source = StaticSource::new(|s| Err(SourceError::unavailable(s, "HTTP 404")));
        let topology = poll_site(&PollContext::default(), &source, &site("N_1"))
            .await
            .unwrap();

        assert_eq!(topology.edges().len(), 1);
        assert_eq!(topology.edges()[0].kind, EdgeKind::Uplink);
    }

    #[tokio::test]
    async fn test_supplied_links_are_used() {
        let source = StaticSource::new(|s| {
            Ok(LinkFetch::Links(vec![json!({
                "sourceSerial": format!("{}-MS", s.id),
                "targetSerial": format!("{}-MX", s.id),
                "linkType": "uplink"
            })]))
        });
        let topology = poll_site(&PollContext::default(), &source, &site("N_1"))
            .await
            .unwrap();

        assert_eq!(topology.edges().len(), 1);
        assert_eq!(topology.edges()[0].source.as_str(), "meraki:N_1-MS");
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let mut source = StaticSource::new(|_| Ok(LinkFetch::NotSupported));
        source.delay = Duration::from_millis(20);
        let source: Arc<StaticSource> = Arc::new(source);

        let poller = Poller::new(PollContext {
            max_concurrency: 2,
            ..Default::default()
        });
        let sites = (0..6)
            .map(|i| (site(&format!("N_{}", i)), source.clone() as Arc<dyn VendorSource>))
            .collect();

        let report = poller.poll(sites).await;
        assert!(report.is_complete());
        assert_eq!(report.topologies.len(), 6);
        assert!(source.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(report.topologies[3].site.id, "N_3");
    }

    #[tokio::test]
    async fn test_unified_unions_sites_of_one_vendor() {
        let source: Arc<dyn VendorSource> =
            Arc::new(StaticSource::new(|_| Ok(LinkFetch::NotSupported)));
        let poller = Poller::new(PollContext::default());

        let report = poller
            .poll(vec![(site("N_1"), source.clone()), (site("N_2"), source)])
            .await;
        let unified = report.into_unified();

        assert_eq!(unified.topology.nodes().len(), 4);
        assert_eq!(unified.topology.edges().len(), 2);
        assert!(unified.failures.is_empty());

        let json = serde_json::to_value(&unified).unwrap();
        assert_eq!(json["stats"]["total_devices"], 4);
        assert!(json["failures"].as_array().unwrap().is_empty());
    }
}
