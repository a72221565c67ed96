//! End-to-end synthesis over raw vendor records.

use netgraph_topology::{
    merge, normalize_site, synthesize, EdgeKind, NodeKind, Topology, Vendor,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::HashSet;

fn meraki_site(devices: &[Value], clients: &[Value], links: Option<&[Value]>) -> Topology {
    synthesize(normalize_site(Vendor::Meraki, devices, clients, links))
}

fn branch_devices() -> Vec<Value> {
    vec![
        json!({"serial": "Q2MX-0001", "name": "gw", "model": "MX68", "networkId": "N_1", "lanIp": "10.0.1.1"}),
        json!({"serial": "Q2MS-0001", "name": "core", "model": "MS120-8", "networkId": "N_1", "lanIp": "10.0.1.5"}),
        json!({"serial": "Q2MR-0001", "name": "lobby", "model": "MR36", "networkId": "N_1"}),
    ]
}

fn assert_endpoints_valid(topology: &Topology) {
    let ids: HashSet<_> = topology.nodes().iter().map(|n| &n.id).collect();
    for edge in topology.edges() {
        assert!(ids.contains(&edge.source), "dangling source {}", edge.source);
        assert!(ids.contains(&edge.target), "dangling target {}", edge.target);
    }
}

fn count(topology: &Topology, kind: EdgeKind) -> usize {
    topology.edges().iter().filter(|e| e.kind == kind).count()
}

#[test]
fn test_appliance_switch_ap_site_without_links() {
    let topology = meraki_site(&branch_devices(), &[], None);

    assert_eq!(topology.edges().len(), 2);
    let uplink = &topology.edges()[0];
    assert_eq!(uplink.kind, EdgeKind::Uplink);
    assert_eq!(uplink.source.as_str(), "meraki:Q2MX-0001");
    assert_eq!(uplink.target.as_str(), "meraki:Q2MS-0001");

    let ap_link = &topology.edges()[1];
    assert_eq!(ap_link.kind, EdgeKind::SwitchLink);
    assert_eq!(ap_link.source.as_str(), "meraki:Q2MS-0001");
    assert_eq!(ap_link.target.as_str(), "meraki:Q2MR-0001");
    assert_eq!(ap_link.interface_label, "AP Uplink");

    // No neighbor tables supplied, so nothing labelled by port
    assert!(!topology
        .edges()
        .iter()
        .any(|e| e.interface_label.starts_with("Port ")));
}

#[test]
fn test_wired_client_on_switch_port() {
    let clients = vec![json!({
        "id": "k1",
        "mac": "22:33:44:55:66:77",
        "description": "reception-pc",
        "recentDeviceSerial": "Q2MS-0001",
        "switchport": "3",
        "switchportDesc": "Office"
    })];
    let topology = meraki_site(&branch_devices(), &clients, Some(&[][..]));

    let client_edges: Vec<_> = topology
        .edges()
        .iter()
        .filter(|e| e.kind == EdgeKind::WiredClientLink)
        .collect();
    assert_eq!(client_edges.len(), 1);
    assert_eq!(client_edges[0].source.as_str(), "meraki:k1");
    assert_eq!(client_edges[0].target.as_str(), "meraki:Q2MS-0001");
    assert_eq!(client_edges[0].interface_label, "3 (Office)");
}

#[test]
fn test_neighbor_tables_and_hierarchy_fire_together() {
    let mut devices = branch_devices();
    devices.push(json!({
        "serial": "Q2MS-0002",
        "name": "edge",
        "model": "MS120-8",
        "networkId": "N_1",
        "ports": {"49": {"cdp": {"deviceId": "core"}}, "50": {"cdp": {"deviceId": "unpolled"}}}
    }));
    let topology = meraki_site(&devices, &[], None);

    let port_edges: Vec<_> = topology
        .edges()
        .iter()
        .filter(|e| e.interface_label == "Port 49")
        .collect();
    assert_eq!(port_edges.len(), 1);
    assert_eq!(port_edges[0].source.as_str(), "meraki:Q2MS-0002");
    assert_eq!(port_edges[0].target.as_str(), "meraki:Q2MS-0001");

    // gw uplinks to both switches, both switches link to the AP
    assert_eq!(count(&topology, EdgeKind::Uplink), 2);
    assert_eq!(count(&topology, EdgeKind::SwitchLink), 3);
    assert_endpoints_valid(&topology);
}

#[test]
fn test_vendor_links_exclude_inferred_tiers() {
    let mut devices = branch_devices();
    devices[1]["ports"] = json!({"1": {"cdp": {"deviceId": "gw"}}});
    let clients = vec![json!({"id": "k2", "recentDeviceSerial": "Q2MR-0001", "ssid": "Corp"})];
    let links = vec![
        json!({"sourceSerial": "Q2MS-0001", "targetSerial": "Q2MX-0001", "linkType": "Uplink", "sourcePort": 1}),
        json!({"sourceSerial": "Q2MS-0001", "targetSerial": "Q2XX-GONE", "linkType": "LLDP"}),
    ];

    let topology = meraki_site(&devices, &clients, Some(links.as_slice()));

    assert_eq!(topology.edges().len(), 2);
    assert_eq!(count(&topology, EdgeKind::WirelessLink), 1);
    assert_eq!(count(&topology, EdgeKind::Uplink), 1);
    assert_eq!(count(&topology, EdgeKind::SwitchLink), 0);
    assert_eq!(topology.edges()[1].interface_label, "Port 1");
}

#[test]
fn test_malformed_records_never_break_synthesis() {
    let devices = vec![
        json!(null),
        json!({}),
        json!({"serial": 12345, "model": ["not", "a", "string"], "lanIp": "999.1.1.1"}),
        json!({"serial": "Q2MS-0009", "ports": "garbage"}),
    ];
    let clients = vec![json!({"recentDeviceSerial": ""}), json!([1, 2])];
    let links = vec![json!({"nodes": "nope"}), json!(7)];

    let topology = meraki_site(&devices, &clients, Some(links.as_slice()));

    assert_eq!(topology.stats().total_devices, 3);
    assert_eq!(topology.stats().total_clients, 1);
    assert!(topology.node(&netgraph_topology::NodeId::new(Vendor::Meraki, "12345")).is_some());
    assert_endpoints_valid(&topology);
}

#[test]
fn test_vendor_links_by_device_mac() {
    let devices = vec![
        json!({"serial": "Q2MX-0001", "mac": "e0:55:3d:00:00:01", "model": "MX68", "networkId": "N_1"}),
        json!({"serial": "Q2MS-0001", "mac": "e0:55:3d:00:00:02", "model": "MS120-8", "networkId": "N_1"}),
        json!({"serial": "Q2MR-0001", "mac": "e0:55:3d:00:00:03", "model": "MR36", "networkId": "N_1"}),
    ];
    let links = vec![
        json!({"sourceMac": "E0:55:3D:00:00:01", "targetMac": "E0:55:3D:00:00:02", "linkType": "LLDP"}),
        json!({"nodes": [{"mac": "e0:55:3d:00:00:03"}, {"mac": "e0:55:3d:00:00:01"}]}),
    ];

    let topology = meraki_site(&devices, &[], Some(links.as_slice()));

    assert_endpoints_valid(&topology);
    assert_eq!(topology.edges().len(), 2);
    assert_eq!(count(&topology, EdgeKind::SwitchLink), 1);
    let lldp = &topology.edges()[0];
    assert_eq!(lldp.source.as_str(), "meraki:Q2MX-0001");
    assert_eq!(lldp.target.as_str(), "meraki:Q2MS-0001");
    let chain = &topology.edges()[1];
    assert_eq!(chain.source.as_str(), "meraki:Q2MR-0001");
    assert_eq!(chain.target.as_str(), "meraki:Q2MX-0001");
    assert_eq!(chain.kind, EdgeKind::Unknown);
}

#[test]
fn test_fortinet_site_with_connections() {
    let devices = vec![
        json!({"id": "fgt1", "name": "FGT-HQ", "type": "fortigate", "host": "fgt1", "ip": "10.0.1.200"}),
        json!({"id": "FP231F01", "serial": "FP231F01", "name": "AP-1", "type": "fortiap", "fortigate_id": "fgt1"}),
    ];
    let clients = vec![json!({"mac": "aa:bb:cc:00:11:22", "ap": "FP231F01", "ssid": "Guest"})];
    let links = vec![
        json!({"source": "fgt1", "target": "FP231F01", "type": "management"}),
        json!({"source": "AA-BB-CC-00-11-22", "target": "FP231F01", "type": "wifi"}),
    ];

    let topology = synthesize(normalize_site(Vendor::Fortinet, &devices, &clients, Some(links.as_slice())));

    assert_eq!(count(&topology, EdgeKind::ManagementLink), 1);
    // Asserted by both the client record and the connection list
    assert_eq!(count(&topology, EdgeKind::WirelessLink), 2);
    let kinds: Vec<_> = topology.nodes().iter().map(|n| n.kind).collect();
    assert_eq!(kinds, vec![NodeKind::Firewall, NodeKind::WirelessAp, NodeKind::Client]);
}

#[test]
fn test_cross_vendor_edges_by_shared_subnet() {
    let meraki = meraki_site(
        &[json!({"serial": "Q2MS-0001", "model": "MS120", "lanIp": "10.0.1.5"})],
        &[],
        None,
    );
    let fortinet = synthesize(normalize_site(
        Vendor::Fortinet,
        &[
            json!({"id": "fgt-a", "type": "fortigate", "ip": "10.0.1.200"}),
            json!({"id": "fgt-b", "type": "fortigate", "ip": "10.0.2.200"}),
        ],
        &[],
        None,
    ));

    let merged = merge(Some(meraki), Some(fortinet));

    let cross: Vec<_> = merged
        .edges()
        .iter()
        .filter(|e| e.kind == EdgeKind::CrossVendorLink)
        .collect();
    assert_eq!(cross.len(), 1);
    assert_eq!(cross[0].source.as_str(), "meraki:Q2MS-0001");
    assert_eq!(cross[0].target.as_str(), "fortinet:fgt-a");
    assert_eq!(cross[0].subnet.map(|s| s.to_string()).as_deref(), Some("10.0.1.0/24"));

    let stats = merged.stats();
    assert_eq!(stats.vendors[&Vendor::Meraki].devices, 1);
    assert_eq!(stats.vendors[&Vendor::Fortinet].devices, 2);
    assert_eq!(stats.total_edges, merged.edges().len());

    let json = serde_json::to_value(&merged).unwrap();
    assert_eq!(json["edges"][0]["subnet"], "10.0.1.0/24");
    assert_eq!(json["edges"][0]["kind"], "cross_vendor_link");
}
