//! Vendor source backed by captured API responses on disk.
//!
//! Layout under the snapshot directory:
//!
//! ```text
//! <dir>/<site id>/devices.json   required, JSON array
//! <dir>/<site id>/clients.json   optional, JSON array (missing = no clients)
//! <dir>/<site id>/links.json     optional, JSON array (missing = not supported)
//! ```

use async_trait::async_trait;
use netgraph_topology::{LinkFetch, Result, SiteRef, SourceError, VendorSource};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, instrument};

const DEVICES_FILE: &str = "devices.json";
const CLIENTS_FILE: &str = "clients.json";
const LINKS_FILE: &str = "links.json";

/// Reads one directory of snapshots per site.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    root: PathBuf,
}

impl SnapshotSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        SnapshotSource { root: root.into() }
    }

    fn site_file(&self, site: &SiteRef, file: &str) -> PathBuf {
        self.root.join(&site.id).join(file)
    }

    /// `Ok(None)` when the file does not exist.
    async fn read_records(&self, site: &SiteRef, file: &str) -> Result<Option<Vec<Value>>> {
        let path = self.site_file(site, file);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SourceError::unavailable(
                    site,
                    format!("{}: {}", path.display(), e),
                ))
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Array(records)) => {
                debug!(path = %path.display(), count = records.len(), "Loaded snapshot");
                Ok(Some(records))
            }
            Ok(_) => Err(SourceError::invalid_payload(
                site,
                format!("{}: expected a JSON array", path.display()),
            )),
            Err(e) => Err(SourceError::invalid_payload(
                site,
                format!("{}: {}", path.display(), e),
            )),
        }
    }
}

#[async_trait]
impl VendorSource for SnapshotSource {
    #[instrument(skip(self), fields(site = %site))]
    async fn fetch_devices(&self, site: &SiteRef) -> Result<Vec<Value>> {
        self.read_records(site, DEVICES_FILE).await?.ok_or_else(|| {
            SourceError::unavailable(
                site,
                format!("{} not found", self.site_file(site, DEVICES_FILE).display()),
            )
        })
    }

    #[instrument(skip(self), fields(site = %site))]
    async fn fetch_clients(&self, site: &SiteRef, timespan: Duration) -> Result<Vec<Value>> {
        // Snapshots were captured with their own timespan
        debug!(timespan_secs = timespan.as_secs(), "Ignoring timespan for snapshot");
        Ok(self
            .read_records(site, CLIENTS_FILE)
            .await?
            .unwrap_or_default())
    }

    #[instrument(skip(self), fields(site = %site))]
    async fn fetch_links(&self, site: &SiteRef) -> Result<LinkFetch> {
        Ok(match self.read_records(site, LINKS_FILE).await? {
            Some(links) => LinkFetch::Links(links),
            None => LinkFetch::NotSupported,
        })
    }
}
