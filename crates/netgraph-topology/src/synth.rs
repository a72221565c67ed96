//! Tiered edge synthesis for one site.
//!
//! 1. Client edges: each client to the device it was last seen on.
//! 2. Vendor links: taken as supplied, dropped if an endpoint is unknown.
//! 3. Neighbor edges: switch port tables resolved by exact device name.
//! 4. Hierarchy edges: appliance → switch → AP star per network.
//!
//! Tiers 1 and 2 always run. Tiers 3 and 4 run together, and only when
//! the vendor supplied no links. Edges are never deduplicated.

use crate::model::{DeviceRef, Edge, EdgeKind, Node, NodeId, NodeKind, Topology};
use crate::normalize::{NormalizedSite, RawLink};
use netgraph_types::MacAddress;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

const UPLINK_LABEL: &str = "Uplink";
const AP_UPLINK_LABEL: &str = "AP Uplink";

/// Builds the topology for one normalized site.
pub fn synthesize(site: NormalizedSite) -> Topology {
    let NormalizedSite {
        vendor,
        devices,
        clients,
        links,
    } = site;

    let mut edges = client_edges(&devices, &clients);

    let supplied = links.as_ref().is_some_and(|l| !l.is_empty());
    if let Some(links) = links {
        edges.extend(vendor_edges(&devices, &clients, links));
    }

    if !supplied {
        edges.extend(neighbor_edges(&devices));
        edges.extend(hierarchy_edges(&devices));
    }

    debug!(
        %vendor,
        devices = devices.len(),
        clients = clients.len(),
        edges = edges.len(),
        inferred = !supplied,
        "Synthesized site topology"
    );

    let mut nodes = devices;
    nodes.extend(clients);
    Topology::new(nodes, edges)
}

/// Tier 1: client → device, wireless if the client reports an SSID.
pub fn client_edges(devices: &[Node], clients: &[Node]) -> Vec<Edge> {
    let by_id: HashSet<&NodeId> = devices.iter().map(|d| &d.id).collect();
    let by_mac = mac_index(devices);

    clients
        .iter()
        .filter_map(|client| {
            let attachment = client.attachment.as_ref()?;
            let device = match &attachment.device {
                DeviceRef::Id(id) => by_id.get(id).copied(),
                DeviceRef::Mac(mac) => by_mac.get(mac).copied(),
            };
            let Some(device) = device else {
                debug!(client = %client.id, "Client attached to unknown device");
                return None;
            };

            let kind = if attachment.is_wireless() {
                EdgeKind::WirelessLink
            } else {
                EdgeKind::WiredClientLink
            };
            Some(Edge::new(
                client.id.clone(),
                device.clone(),
                kind,
                attachment.interface_label(),
            ))
        })
        .collect()
}

/// Tier 2: vendor links whose endpoints are both known nodes.
///
/// MAC endpoints resolve to devices first, then clients.
pub fn vendor_edges(devices: &[Node], clients: &[Node], links: Vec<RawLink>) -> Vec<Edge> {
    let known: HashSet<&NodeId> = devices.iter().chain(clients).map(|n| &n.id).collect();
    let mut by_mac = mac_index(devices);
    for (mac, id) in mac_index(clients) {
        by_mac.entry(mac).or_insert(id);
    }

    let resolve = |endpoint: &DeviceRef| match endpoint {
        DeviceRef::Id(id) => known.get(id).copied(),
        DeviceRef::Mac(mac) => by_mac.get(mac).copied(),
    };

    links
        .into_iter()
        .filter_map(|link| match (resolve(&link.source), resolve(&link.target)) {
            (Some(source), Some(target)) => Some(Edge::new(
                source.clone(),
                target.clone(),
                link.kind,
                link.interface_label,
            )),
            _ => {
                debug!(source = ?link.source, target = ?link.target, "Dropping unresolved vendor link");
                None
            }
        })
        .collect()
}

/// Node MACs, from the MAC field or a MAC-derived id. First node wins.
fn mac_index(nodes: &[Node]) -> HashMap<MacAddress, &NodeId> {
    let mut by_mac = HashMap::new();
    for node in nodes {
        for mac in node.mac.into_iter().chain(node.id.mac()) {
            by_mac.entry(mac).or_insert(&node.id);
        }
    }
    by_mac
}

/// Tier 3: switch port neighbors matched to devices by exact name.
pub fn neighbor_edges(devices: &[Node]) -> Vec<Edge> {
    let mut by_name: HashMap<&str, &NodeId> = HashMap::new();
    for device in devices {
        if let Some(name) = device.name.as_deref() {
            by_name.entry(name).or_insert(&device.id);
        }
    }

    devices
        .iter()
        .filter(|d| d.kind == NodeKind::Switch)
        .flat_map(|switch| {
            let by_name = &by_name;
            switch.neighbors.iter().filter_map(move |(port, neighbor)| {
                let target = by_name.get(neighbor.as_str())?;
                Some(Edge::new(
                    switch.id.clone(),
                    (*target).clone(),
                    EdgeKind::SwitchLink,
                    format!("Port {}", port),
                ))
            })
        })
        .collect()
}

/// Tier 4: per-network star of appliances, switches and APs.
///
/// Every appliance uplinks to every switch in its network (to every AP
/// when there are no switches) and every switch links to every AP. With
/// several appliances or switches this is a complete bipartite graph, not
/// a tree. Devices with no network id share one group.
pub fn hierarchy_edges(devices: &[Node]) -> Vec<Edge> {
    let mut groups: BTreeMap<Option<&str>, Vec<&Node>> = BTreeMap::new();
    for device in devices {
        groups
            .entry(device.network_id.as_deref())
            .or_default()
            .push(device);
    }

    let mut edges = Vec::new();
    for members in groups.values() {
        let of_kind = |kind: NodeKind| {
            members
                .iter()
                .copied()
                .filter(|d| d.kind == kind)
                .collect::<Vec<&Node>>()
        };
        let appliances = of_kind(NodeKind::SecurityAppliance);
        let switches = of_kind(NodeKind::Switch);
        let aps = of_kind(NodeKind::WirelessAp);

        let downstream = if switches.is_empty() { &aps } else { &switches };
        for appliance in &appliances {
            for target in downstream {
                edges.push(Edge::new(
                    appliance.id.clone(),
                    target.id.clone(),
                    EdgeKind::Uplink,
                    UPLINK_LABEL,
                ));
            }
        }

        for switch in &switches {
            for ap in &aps {
                edges.push(Edge::new(
                    switch.id.clone(),
                    ap.id.clone(),
                    EdgeKind::SwitchLink,
                    AP_UPLINK_LABEL,
                ));
            }
        }
    }

    edges
}
