//! Topology polling daemon.
//!
//! Reads captured Meraki and FortiManager API responses for each configured
//! site, synthesizes a topology per site, merges them across vendors and
//! writes `{nodes, edges, stats, failures}` as JSON.

pub mod config;
pub mod daemon;
pub mod error;
pub mod snapshot;

pub use config::{DaemonConfig, SiteConfig, DEFAULT_CONFIG_PATH};
pub use daemon::{write_output, Daemon};
pub use error::{DaemonError, Result};
pub use snapshot::SnapshotSource;
