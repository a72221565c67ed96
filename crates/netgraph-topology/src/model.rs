//! Topology data model: nodes, edges and the per-poll graph.
//!
//! All values are built fresh for each poll and never mutated afterwards.
//! [`Topology`] is the only way to hold a node/edge set, and its
//! constructor enforces that every edge references a node in the set.

use crate::stats::{self, TopologyStats};
use netgraph_types::{Ipv4Address, Ipv4Prefix, MacAddress};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Interface label used when nothing better can be derived.
pub const UNKNOWN_INTERFACE: &str = "Unknown";

/// Vendor that reported a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vendor {
    Meraki,
    Fortinet,
}

impl Vendor {
    /// Returns the lower-case vendor tag used in node ids.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Vendor::Meraki => "meraki",
            Vendor::Fortinet => "fortinet",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vendor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "meraki" => Ok(Vendor::Meraki),
            "fortinet" | "fortimanager" | "fortigate" => Ok(Vendor::Fortinet),
            other => Err(format!("unknown vendor: {}", other)),
        }
    }
}

/// Vendor-namespaced node identifier, rendered `"{vendor}:{raw}"`.
///
/// Two vendors can never produce the same id, so merged topologies need
/// no further disambiguation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Builds the id for a raw vendor identifier (serial, MAC, client id).
    ///
    /// MAC-shaped identifiers are canonicalized so a client's reference to
    /// a device MAC matches the device's own MAC-derived id.
    pub fn new(vendor: Vendor, raw: &str) -> Self {
        let raw = raw.trim();
        let local = raw
            .parse::<MacAddress>()
            .map(|mac| mac.to_string())
            .unwrap_or_else(|_| raw.to_string());
        NodeId(format!("{}:{}", vendor, local))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The MAC address this id was derived from, if any.
    pub fn mac(&self) -> Option<MacAddress> {
        let (_, local) = self.0.split_once(':')?;
        local.parse().ok()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derived node classification. Never copied verbatim from vendor strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Switch,
    WirelessAp,
    SecurityAppliance,
    Camera,
    Sensor,
    Client,
    Firewall,
    Unknown,
}

impl NodeKind {
    /// Returns true for infrastructure nodes (everything except clients).
    pub const fn is_device(&self) -> bool {
        !matches!(self, NodeKind::Client)
    }
}

/// Edge classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Uplink,
    SwitchLink,
    WirelessLink,
    WiredClientLink,
    ManagementLink,
    CrossVendorLink,
    Unknown,
}

/// Vendor link-type strings (lower-cased) and the edge kind each maps to.
const LINK_TYPES: &[(&str, EdgeKind)] = &[
    ("uplink", EdgeKind::Uplink),
    ("wan", EdgeKind::Uplink),
    ("switch", EdgeKind::SwitchLink),
    ("switch_link", EdgeKind::SwitchLink),
    ("wired", EdgeKind::SwitchLink),
    ("ethernet", EdgeKind::SwitchLink),
    ("lldp", EdgeKind::SwitchLink),
    ("cdp", EdgeKind::SwitchLink),
    ("stack", EdgeKind::SwitchLink),
    ("wireless", EdgeKind::WirelessLink),
    ("wifi", EdgeKind::WirelessLink),
    ("wireless_link", EdgeKind::WirelessLink),
    ("mesh", EdgeKind::WirelessLink),
    ("client", EdgeKind::WiredClientLink),
    ("wired_client", EdgeKind::WiredClientLink),
    ("wired_client_link", EdgeKind::WiredClientLink),
    ("management", EdgeKind::ManagementLink),
    ("management_link", EdgeKind::ManagementLink),
    ("capwap", EdgeKind::ManagementLink),
    ("cross_vendor", EdgeKind::CrossVendorLink),
    ("cross_vendor_link", EdgeKind::CrossVendorLink),
];

impl EdgeKind {
    /// Maps a vendor link-type string to the closest edge kind.
    pub fn from_vendor_type(link_type: &str) -> Self {
        let lowered = link_type.trim().to_ascii_lowercase();
        LINK_TYPES
            .iter()
            .find(|(name, _)| *name == lowered)
            .map(|(_, kind)| *kind)
            .unwrap_or(EdgeKind::Unknown)
    }
}

/// Reachability reported by the vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Online,
    Offline,
    #[default]
    Unknown,
}

/// Coarse client device class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientType {
    Mobile,
    Desktop,
    #[default]
    Unknown,
}

/// How a client names the device it was last seen on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceRef {
    /// By the device's node id (serial-derived).
    Id(NodeId),
    /// By the device's MAC address.
    Mac(MacAddress),
}

/// Where a client was most recently connected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientAttachment {
    pub device: DeviceRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub switchport: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub switchport_desc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan: Option<String>,
}

impl ClientAttachment {
    /// A client with a wireless network name is a wireless client.
    pub fn is_wireless(&self) -> bool {
        self.ssid.is_some()
    }

    /// Port (with description) first, then VLAN, then [`UNKNOWN_INTERFACE`].
    pub fn interface_label(&self) -> String {
        match (&self.switchport, &self.switchport_desc, &self.vlan) {
            (Some(port), Some(desc), _) => format!("{} ({})", port, desc),
            (Some(port), None, _) => port.clone(),
            (None, _, Some(vlan)) => format!("VLAN {}", vlan),
            (None, _, None) => UNKNOWN_INTERFACE.to_string(),
        }
    }
}

/// A device or client in the topology.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub label: String,
    pub kind: NodeKind,
    pub vendor: Vendor,
    /// The vendor's own display name, used for neighbor-name matching.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub ip: Option<Ipv4Address>,
    pub mac: Option<MacAddress>,
    pub model: Option<String>,
    pub status: NodeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_type: Option<ClientType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<ClientAttachment>,
    /// Neighbor device names keyed by local port, from CDP/LLDP tables.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub neighbors: BTreeMap<String, String>,
    pub raw: Value,
}

impl Node {
    pub fn is_client(&self) -> bool {
        self.kind == NodeKind::Client
    }
}

/// A connection between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub kind: EdgeKind,
    pub interface_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet: Option<Ipv4Prefix>,
}

impl Edge {
    pub fn new(
        source: NodeId,
        target: NodeId,
        kind: EdgeKind,
        interface_label: impl Into<String>,
    ) -> Self {
        Edge {
            source,
            target,
            kind,
            interface_label: interface_label.into(),
            subnet: None,
        }
    }

    pub fn with_subnet(mut self, subnet: Ipv4Prefix) -> Self {
        self.subnet = Some(subnet);
        self
    }
}

/// Synthesis result for one site, or the merge of several.
///
/// Nodes are unique by id (first occurrence wins). Edges whose endpoints
/// are not in the node set are dropped on construction. Duplicate edges
/// are kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    index: HashMap<NodeId, usize>,
}

impl Topology {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let mut index = HashMap::with_capacity(nodes.len());
        let mut unique = Vec::with_capacity(nodes.len());
        for node in nodes {
            if index.contains_key(&node.id) {
                debug!(id = %node.id, "Dropping duplicate node");
                continue;
            }
            index.insert(node.id.clone(), unique.len());
            unique.push(node);
        }

        let edges = edges
            .into_iter()
            .filter(|edge| {
                let valid = index.contains_key(&edge.source) && index.contains_key(&edge.target);
                if !valid {
                    debug!(source = %edge.source, target = %edge.target, "Dropping edge with unknown endpoint");
                }
                valid
            })
            .collect();

        Topology {
            nodes: unique,
            edges,
            index,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Device nodes (everything that is not a client).
    pub fn devices(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.kind.is_device())
    }

    /// Counts recomputed from the current node and edge sets.
    pub fn stats(&self) -> TopologyStats {
        stats::compute(&self.nodes, &self.edges)
    }

    /// Concatenates two topologies, e.g. several sites of the same vendor.
    pub fn union(self, other: Topology) -> Topology {
        let (mut nodes, mut edges) = self.into_parts();
        let (other_nodes, other_edges) = other.into_parts();
        nodes.extend(other_nodes);
        edges.extend(other_edges);
        Topology::new(nodes, edges)
    }

    pub fn into_parts(self) -> (Vec<Node>, Vec<Edge>) {
        (self.nodes, self.edges)
    }
}

/// Renderer contract: `{nodes, edges, stats}`.
impl Serialize for Topology {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Rendered<'a> {
            nodes: &'a [Node],
            edges: &'a [Edge],
            stats: TopologyStats,
        }

        Rendered {
            nodes: &self.nodes,
            edges: &self.edges,
            stats: self.stats(),
        }
        .serialize(serializer)
    }
}
