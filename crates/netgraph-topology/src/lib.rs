//! Multi-vendor network topology synthesis.
//!
//! Vendor back ends (Meraki dashboard, FortiManager, FortiGate) describe
//! the same network in incompatible shapes. This crate turns their already
//! deserialized JSON records into one graph:
//!
//! ```text
//! VendorSource ──► normalize ──► synthesize ──► merge ──► renderer JSON
//!   (devices,       (Node,         (tiered       (cross-vendor
//!    clients,        RawLink)       edges)         /24 edges)
//!    links)
//! ```
//!
//! Normalization and synthesis are pure functions. The [`Poller`] is the
//! only async component: it fetches many sites concurrently, bounds the
//! fan-out and isolates slow or failing sites.

pub mod error;
pub mod fields;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod poller;
pub mod source;
pub mod stats;
pub mod synth;

pub use error::{Result, SiteError, SiteFailure, SourceError};
pub use merge::{cross_vendor_edges, merge};
pub use model::{
    ClientAttachment, ClientType, DeviceRef, Edge, EdgeKind, Node, NodeId, NodeKind, NodeStatus,
    Topology, Vendor, UNKNOWN_INTERFACE,
};
pub use normalize::{normalize_site, NormalizedSite, RawLink};
pub use poller::{poll_site, BatchReport, PollContext, Poller, SiteTopology, UnifiedTopology};
pub use source::{LinkFetch, SiteRef, VendorSource};
pub use stats::{TopologyStats, VendorCounts};
pub use synth::synthesize;
