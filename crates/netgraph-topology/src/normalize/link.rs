//! Vendor-supplied link records.
//!
//! Three shapes are accepted. Flat records name both endpoints directly.
//! Nested records carry `source`/`destination` objects. Chain records list
//! a path in `nodes`, and every consecutive pair becomes one link.

use crate::fields::RecordExt;
use crate::model::{DeviceRef, EdgeKind, NodeId, Vendor, UNKNOWN_INTERFACE};
use netgraph_types::MacAddress;
use serde_json::Value;
use tracing::debug;

/// Ordered candidate keys for each attribute.
pub mod fields {
    use crate::fields::FieldList;

    pub const SOURCE: FieldList = &[
        "source",
        "sourceSerial",
        "sourceMac",
        "source.serial",
        "source.mac",
    ];
    pub const TARGET: FieldList = &[
        "target",
        "targetSerial",
        "targetMac",
        "target.serial",
        "target.mac",
        "destination",
        "destination.serial",
        "destination.mac",
    ];
    pub const LINK_TYPE: FieldList = &["linkType", "type"];
    pub const SOURCE_PORT: FieldList = &["sourcePort", "source.port"];
    pub const CHAIN: &str = "nodes";
    pub const CHAIN_ENDPOINT: FieldList = &["serial", "device.serial", "mac", "device.mac"];
}

/// A link as the vendor asserted it.
///
/// MAC-shaped endpoints stay MAC references; the synthesizer resolves them
/// against node MACs since most devices are keyed by serial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLink {
    pub source: DeviceRef,
    pub target: DeviceRef,
    pub kind: EdgeKind,
    pub interface_label: String,
}

fn endpoint(vendor: Vendor, raw: &str) -> DeviceRef {
    match raw.parse::<MacAddress>() {
        Ok(mac) => DeviceRef::Mac(mac),
        Err(_) => DeviceRef::Id(NodeId::new(vendor, raw)),
    }
}

/// Parses every record, dropping those without two resolvable endpoints.
pub fn parse_links(vendor: Vendor, records: &[Value]) -> Vec<RawLink> {
    records
        .iter()
        .flat_map(|record| parse_record(vendor, record))
        .collect()
}

fn parse_record(vendor: Vendor, record: &Value) -> Vec<RawLink> {
    let kind = record
        .first_text(fields::LINK_TYPE)
        .map(|t| EdgeKind::from_vendor_type(&t))
        .unwrap_or(EdgeKind::Unknown);

    if let Some(Value::Array(chain)) = record.get_path(fields::CHAIN) {
        let endpoints: Vec<Option<String>> = chain
            .iter()
            .map(|hop| hop.first_text(fields::CHAIN_ENDPOINT))
            .collect();
        return endpoints
            .windows(2)
            .filter_map(|pair| match pair {
                [Some(source), Some(target)] => Some(RawLink {
                    source: endpoint(vendor, source),
                    target: endpoint(vendor, target),
                    kind,
                    interface_label: UNKNOWN_INTERFACE.to_string(),
                }),
                _ => {
                    debug!("Dropping chain hop without an identifier");
                    None
                }
            })
            .collect();
    }

    let (Some(source), Some(target)) = (
        record.first_text(fields::SOURCE),
        record.first_text(fields::TARGET),
    ) else {
        debug!(%record, "Dropping link without both endpoints");
        return Vec::new();
    };

    let interface_label = record
        .first_text(fields::SOURCE_PORT)
        .map(|port| format!("Port {}", port))
        .unwrap_or_else(|| UNKNOWN_INTERFACE.to_string());

    vec![RawLink {
        source: endpoint(vendor, &source),
        target: endpoint(vendor, &target),
        kind,
        interface_label,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn id(raw: &str) -> DeviceRef {
        DeviceRef::Id(NodeId::new(Vendor::Meraki, raw))
    }

    fn mac(raw: &str) -> DeviceRef {
        DeviceRef::Mac(raw.parse().unwrap())
    }

    #[test]
    fn test_flat_link() {
        let links = parse_links(
            Vendor::Meraki,
            &[json!({"sourceSerial": "S1", "targetSerial": "S2", "linkType": "Uplink", "sourcePort": 49})],
        );
        assert_eq!(
            links,
            vec![RawLink {
                source: id("S1"),
                target: id("S2"),
                kind: EdgeKind::Uplink,
                interface_label: "Port 49".to_string(),
            }]
        );
    }

    #[test]
    fn test_nested_link() {
        let links = parse_links(
            Vendor::Meraki,
            &[json!({"source": {"serial": "S1"}, "destination": {"serial": "AP1"}, "linkType": "LLDP"})],
        );
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].source, id("S1"));
        assert_eq!(links[0].target, id("AP1"));
        assert_eq!(links[0].kind, EdgeKind::SwitchLink);
        assert_eq!(links[0].interface_label, "Unknown");
    }

    #[test]
    fn test_chain_link() {
        let links = parse_links(
            Vendor::Meraki,
            &[json!({"nodes": [
                {"serial": "MX1"},
                {"device": {"serial": "S1"}},
                {"derivedId": "opaque"},
                {"mac": "e0:55:3d:00:00:03"}
            ]})],
        );
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].source, id("MX1"));
        assert_eq!(links[0].target, id("S1"));
        assert_eq!(links[0].kind, EdgeKind::Unknown);
    }

    #[test]
    fn test_mac_endpoints_stay_mac_references() {
        let links = parse_links(
            Vendor::Meraki,
            &[
                json!({"sourceMac": "E0-55-3D-00-00-01", "targetMac": "e0:55:3d:00:00:02", "linkType": "LLDP"}),
                json!({"source": {"mac": "e0:55:3d:00:00:03"}, "destination": {"serial": "S1"}}),
                json!({"nodes": [{"mac": "e0:55:3d:00:00:03"}, {"device": {"mac": "e055.3d00.0001"}}]}),
            ],
        );
        assert_eq!(
            links.iter().map(|l| (l.source.clone(), l.target.clone())).collect::<Vec<_>>(),
            vec![
                (mac("e0:55:3d:00:00:01"), mac("e0:55:3d:00:00:02")),
                (mac("e0:55:3d:00:00:03"), id("S1")),
                (mac("e0:55:3d:00:00:03"), mac("e0:55:3d:00:00:01")),
            ]
        );
        assert_eq!(links[0].kind, EdgeKind::SwitchLink);
    }

    #[test]
    fn test_fortinet_connection() {
        let links = parse_links(
            Vendor::Fortinet,
            &[json!({"source": "fgt1", "target": "FP231F01", "type": "management"})],
        );
        assert_eq!(links[0].source, DeviceRef::Id(NodeId::new(Vendor::Fortinet, "fgt1")));
        assert_eq!(links[0].kind, EdgeKind::ManagementLink);
    }

    #[test]
    fn test_incomplete_links_are_dropped() {
        let links = parse_links(
            Vendor::Meraki,
            &[json!({"source": "S1"}), json!({"target": "S2"}), json!(null), json!({"nodes": []})],
        );
        assert!(links.is_empty());
    }
}
