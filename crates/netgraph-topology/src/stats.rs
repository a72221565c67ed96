//! Topology statistics.
//!
//! Always derived from a node/edge set on demand. Vendor self-reported
//! counts are never consulted.

use crate::model::{Edge, EdgeKind, Node, NodeKind, Vendor};
use serde::Serialize;
use std::collections::BTreeMap;

/// Device and client counts for one vendor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VendorCounts {
    pub devices: usize,
    pub clients: usize,
}

/// Counts by kind and vendor, as handed to the renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TopologyStats {
    pub total_nodes: usize,
    pub total_devices: usize,
    pub total_clients: usize,
    pub total_edges: usize,
    pub nodes_by_kind: BTreeMap<NodeKind, usize>,
    pub edges_by_kind: BTreeMap<EdgeKind, usize>,
    pub vendors: BTreeMap<Vendor, VendorCounts>,
}

pub fn compute(nodes: &[Node], edges: &[Edge]) -> TopologyStats {
    let mut stats = TopologyStats {
        total_nodes: nodes.len(),
        total_edges: edges.len(),
        ..Default::default()
    };

    for node in nodes {
        *stats.nodes_by_kind.entry(node.kind).or_default() += 1;
        let counts = stats.vendors.entry(node.vendor).or_default();
        if node.is_client() {
            stats.total_clients += 1;
            counts.clients += 1;
        } else {
            stats.total_devices += 1;
            counts.devices += 1;
        }
    }

    for edge in edges {
        *stats.edges_by_kind.entry(edge.kind).or_default() += 1;
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::node;
    use crate::model::Edge;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_counts_by_kind_and_vendor() {
        let switch = node(Vendor::Meraki, "S1", NodeKind::Switch);
        let client = node(Vendor::Meraki, "C1", NodeKind::Client);
        let fortigate = node(Vendor::Fortinet, "FGT1", NodeKind::Firewall);
        let edges = vec![Edge::new(
            client.id.clone(),
            switch.id.clone(),
            EdgeKind::WiredClientLink,
            "3",
        )];

        let stats = compute(&[switch, client, fortigate], &edges);

        assert_eq!(stats.total_nodes, 3);
        assert_eq!(stats.total_devices, 2);
        assert_eq!(stats.total_clients, 1);
        assert_eq!(stats.total_edges, 1);
        assert_eq!(stats.nodes_by_kind[&NodeKind::Firewall], 1);
        assert_eq!(stats.edges_by_kind[&EdgeKind::WiredClientLink], 1);
        assert_eq!(
            stats.vendors[&Vendor::Meraki],
            VendorCounts {
                devices: 1,
                clients: 1
            }
        );
        assert_eq!(stats.vendors[&Vendor::Fortinet].devices, 1);
    }

    #[test]
    fn test_empty() {
        assert_eq!(compute(&[], &[]), TopologyStats::default());
    }

    #[test]
    fn test_serializes_enum_keys_as_strings() {
        let stats = compute(&[node(Vendor::Meraki, "AP", NodeKind::WirelessAp)], &[]);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["nodes_by_kind"]["wireless_ap"], 1);
        assert_eq!(json["vendors"]["meraki"]["devices"], 1);
    }
}
