//! Vendor data source interface.
//!
//! Implementations wrap a vendor API client (or a capture of its
//! responses) and hand back already-deserialized records. The core never
//! talks HTTP itself.

use crate::error::Result;
use crate::model::Vendor;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// One vendor-scoped site: a Meraki network or a managed Fortinet target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteRef {
    pub vendor: Vendor,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl SiteRef {
    pub fn new(vendor: Vendor, id: impl Into<String>) -> Self {
        SiteRef {
            vendor,
            id: id.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl fmt::Display for SiteRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.vendor, self.id)
    }
}

/// Result of asking a source for explicit links.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkFetch {
    Links(Vec<Value>),
    /// The vendor has no link endpoint for this site; links are inferred.
    NotSupported,
}

/// Supplies raw records for a site.
///
/// Implementations should honor cancellation: the poller drops the future
/// when the per-site deadline passes.
#[async_trait]
pub trait VendorSource: Send + Sync {
    async fn fetch_devices(&self, site: &SiteRef) -> Result<Vec<Value>>;

    /// Clients seen within the last `timespan`.
    async fn fetch_clients(&self, site: &SiteRef, timespan: Duration) -> Result<Vec<Value>>;

    async fn fetch_links(&self, site: &SiteRef) -> Result<LinkFetch>;
}
