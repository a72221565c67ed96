//! Combines per-vendor topologies and adds cross-vendor edges.

use crate::model::{Edge, EdgeKind, Node, Topology, Vendor};
use tracing::debug;

/// Merges zero or one topology per vendor into one graph.
///
/// Nodes and edges are concatenated; ids are vendor-namespaced so they
/// cannot collide. Cross-vendor edges are added for device pairs sharing
/// a `/24`. Stats come from the merged sets since [`Topology::stats`] is
/// always recomputed.
pub fn merge(meraki: Option<Topology>, fortinet: Option<Topology>) -> Topology {
    let meraki = meraki.unwrap_or_default();
    let fortinet = fortinet.unwrap_or_default();

    let cross = cross_vendor_edges(&meraki, &fortinet);
    debug!(
        meraki = meraki.nodes().len(),
        fortinet = fortinet.nodes().len(),
        cross = cross.len(),
        "Merging vendor topologies"
    );

    let (mut nodes, mut edges) = meraki.into_parts();
    let (fortinet_nodes, fortinet_edges) = fortinet.into_parts();
    nodes.extend(fortinet_nodes);
    edges.extend(fortinet_edges);
    edges.extend(cross);

    Topology::new(nodes, edges)
}

/// Same-subnet heuristic: one `cross_vendor_link` for every Meraki device
/// and Fortinet device whose IPv4 addresses share the first three octets.
///
/// This is a pairwise O(n·m) scan over the devices of both sides. Sites
/// have tens of devices, so that is fine; past a few hundred per side it
/// should become a join on the `/24` key. Devices without an IPv4 address
/// are not candidates.
pub fn cross_vendor_edges(meraki: &Topology, fortinet: &Topology) -> Vec<Edge> {
    let left = candidates(meraki, Vendor::Meraki);
    let right = candidates(fortinet, Vendor::Fortinet);

    let mut edges = Vec::new();
    for m in &left {
        for f in &right {
            let (Some(m_ip), Some(f_ip)) = (m.ip, f.ip) else {
                continue;
            };
            let subnet = m_ip.subnet24();
            if subnet == f_ip.subnet24() {
                edges.push(
                    Edge::new(
                        m.id.clone(),
                        f.id.clone(),
                        EdgeKind::CrossVendorLink,
                        subnet.to_string(),
                    )
                    .with_subnet(subnet),
                );
            }
        }
    }
    edges
}

fn candidates(topology: &Topology, vendor: Vendor) -> Vec<&Node> {
    topology
        .devices()
        .filter(|n| n.vendor == vendor && n.ip.is_some())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::node;
    use crate::model::NodeKind;
    use pretty_assertions::assert_eq;

    fn with_ip(vendor: Vendor, raw_id: &str, kind: NodeKind, ip: &str) -> Node {
        let mut n = node(vendor, raw_id, kind);
        n.ip = ip.parse().ok();
        n
    }

    #[test]
    fn test_merge_absent_sides() {
        assert!(merge(None, None).is_empty());

        let only = Topology::new(vec![node(Vendor::Fortinet, "F1", NodeKind::Firewall)], vec![]);
        let merged = merge(None, Some(only.clone()));
        assert_eq!(merged, only);
    }

    #[test]
    fn test_clients_are_not_candidates() {
        let meraki = Topology::new(
            vec![with_ip(Vendor::Meraki, "C1", NodeKind::Client, "10.0.1.9")],
            vec![],
        );
        let fortinet = Topology::new(
            vec![with_ip(Vendor::Fortinet, "F1", NodeKind::Firewall, "10.0.1.1")],
            vec![],
        );
        assert!(cross_vendor_edges(&meraki, &fortinet).is_empty());
    }

    #[test]
    fn test_each_matching_pair_gets_an_edge() {
        let meraki = Topology::new(
            vec![
                with_ip(Vendor::Meraki, "MX1", NodeKind::SecurityAppliance, "10.0.1.1"),
                with_ip(Vendor::Meraki, "S1", NodeKind::Switch, "10.0.1.2"),
                node(Vendor::Meraki, "S2", NodeKind::Switch),
            ],
            vec![],
        );
        let fortinet = Topology::new(
            vec![with_ip(Vendor::Fortinet, "F1", NodeKind::Firewall, "10.0.1.254")],
            vec![],
        );

        let edges = cross_vendor_edges(&meraki, &fortinet);
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|e| e.interface_label == "10.0.1.0/24"));
    }
}
