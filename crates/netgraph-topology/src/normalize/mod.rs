//! Per-vendor adapters from raw JSON records to [`Node`]s and [`RawLink`]s.
//!
//! Each vendor module first reads a record into a typed intermediate struct
//! through its ordered field lists, then converts that into a `Node`.
//! Nothing here fails: a missing field takes its fallback, and a record that
//! is not a JSON object is skipped.

pub mod fortinet;
pub mod link;
pub mod meraki;

pub use link::{parse_links, RawLink};

use crate::fields::{FieldList, RecordExt};
use crate::model::{ClientType, Node, NodeStatus, Vendor};
use netgraph_types::{Ipv4Address, MacAddress};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

/// One site's records after normalization, ready for synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSite {
    pub vendor: Vendor,
    pub devices: Vec<Node>,
    pub clients: Vec<Node>,
    /// `None` when the vendor does not expose links for this site.
    pub links: Option<Vec<RawLink>>,
}

/// Normalizes everything fetched for one site.
pub fn normalize_site(
    vendor: Vendor,
    devices: &[Value],
    clients: &[Value],
    links: Option<&[Value]>,
) -> NormalizedSite {
    NormalizedSite {
        vendor,
        devices: devices
            .iter()
            .filter_map(|r| normalize_device(vendor, r))
            .collect(),
        clients: clients
            .iter()
            .filter_map(|r| normalize_client(vendor, r))
            .collect(),
        links: links.map(|records| parse_links(vendor, records)),
    }
}

/// Normalizes one device record. Returns `None` only for non-object records.
pub fn normalize_device(vendor: Vendor, record: &Value) -> Option<Node> {
    if !is_record(record, "device") {
        return None;
    }
    Some(match vendor {
        Vendor::Meraki => meraki::MerakiDevice::from_record(record).into_node(record.clone()),
        Vendor::Fortinet => fortinet::FortinetDevice::from_record(record).into_node(record.clone()),
    })
}

/// Normalizes one client record. Returns `None` only for non-object records.
pub fn normalize_client(vendor: Vendor, record: &Value) -> Option<Node> {
    if !is_record(record, "client") {
        return None;
    }
    Some(match vendor {
        Vendor::Meraki => meraki::MerakiClient::from_record(record).into_node(record.clone()),
        Vendor::Fortinet => fortinet::FortinetClient::from_record(record).into_node(record.clone()),
    })
}

fn is_record(record: &Value, what: &str) -> bool {
    let ok = record.is_object();
    if !ok {
        debug!(what, "Skipping non-object record");
    }
    ok
}

/// Deterministic id for a record with no usable identifier field.
///
/// Derived from the record content so normalizing the same record twice
/// yields the same id.
pub(crate) fn generated_id(record: &Value) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, record.to_string().as_bytes()).to_string()
}

/// First field in `fields` that parses as an IPv4 address.
pub(crate) fn first_ipv4(record: &Value, fields: FieldList) -> Option<Ipv4Address> {
    fields
        .iter()
        .filter_map(|f| record.get_text(f))
        .find_map(|text| text.parse().ok())
}

/// First field in `fields` that parses as a MAC address.
pub(crate) fn first_mac(record: &Value, fields: FieldList) -> Option<MacAddress> {
    fields
        .iter()
        .filter_map(|f| record.get_text(f))
        .find_map(|text| text.parse().ok())
}

const ONLINE: &[&str] = &["online", "alerting", "up", "connected", "1"];
const OFFLINE: &[&str] = &["offline", "dormant", "down", "disconnected", "0"];

pub(crate) fn status_from(record: &Value, fields: FieldList) -> NodeStatus {
    let Some(status) = record.first_text(fields) else {
        return NodeStatus::Unknown;
    };
    let lowered = status.to_ascii_lowercase();
    if ONLINE.contains(&lowered.as_str()) {
        NodeStatus::Online
    } else if OFFLINE.contains(&lowered.as_str()) {
        NodeStatus::Offline
    } else {
        NodeStatus::Unknown
    }
}

const MOBILE_DEVICE_TYPES: &[&str] = &["iphone", "ipad", "android", "phone", "tablet", "mobile"];
const DESKTOP_DEVICE_TYPES: &[&str] = &["windows", "mac os", "macos", "laptop", "desktop", "pc"];
const MOBILE_MANUFACTURERS: &[&str] = &["apple", "samsung", "lg", "motorola", "xiaomi"];
const DESKTOP_MANUFACTURERS: &[&str] = &["dell", "hp", "lenovo", "microsoft", "asus"];

/// Classifies a client by its reported device type, then its manufacturer.
pub fn infer_client_type(device_type: Option<&str>, manufacturer: Option<&str>) -> ClientType {
    let matches = |text: Option<&str>, needles: &[&str]| {
        text.map(str::to_ascii_lowercase)
            .is_some_and(|t| needles.iter().any(|n| t.contains(n)))
    };

    if matches(device_type, MOBILE_DEVICE_TYPES) {
        ClientType::Mobile
    } else if matches(device_type, DESKTOP_DEVICE_TYPES) {
        ClientType::Desktop
    } else if matches(manufacturer, MOBILE_MANUFACTURERS) {
        ClientType::Mobile
    } else if matches(manufacturer, DESKTOP_MANUFACTURERS) {
        ClientType::Desktop
    } else {
        ClientType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_normalization_is_idempotent() {
        let device = json!({
            "serial": "Q2XX-AAAA-0001", "name": "core", "model": "MS225-48",
            "lanIp": "10.0.1.2", "networkId": "N_1", "status": "online"
        });
        let anonymous = json!({"model": "MR46"});

        for vendor in [Vendor::Meraki, Vendor::Fortinet] {
            assert_eq!(normalize_device(vendor, &device), normalize_device(vendor, &device));
            assert_eq!(
                normalize_device(vendor, &anonymous),
                normalize_device(vendor, &anonymous)
            );
        }
    }

    #[test]
    fn test_generated_id_depends_on_content() {
        assert_eq!(generated_id(&json!({"a": 1})), generated_id(&json!({"a": 1})));
        assert_ne!(generated_id(&json!({"a": 1})), generated_id(&json!({"a": 2})));
    }

    #[test]
    fn test_non_object_records_are_skipped() {
        let site = normalize_site(
            Vendor::Meraki,
            &[json!(null), json!("junk"), json!({"serial": "S1", "model": "MS120"})],
            &[json!(42)],
            None,
        );
        assert_eq!(site.devices.len(), 1);
        assert_eq!(site.devices[0].kind, NodeKind::Switch);
        assert!(site.clients.is_empty());
        assert_eq!(site.links, None);
    }

    #[test]
    fn test_empty_link_list_is_kept_distinct_from_absent() {
        let site = normalize_site(Vendor::Meraki, &[], &[], Some(&[][..]));
        assert_eq!(site.links, Some(vec![]));
    }

    #[test]
    fn test_status_table() {
        let fields: FieldList = &["status", "conn_status"];
        assert_eq!(status_from(&json!({"status": "Online"}), fields), NodeStatus::Online);
        assert_eq!(status_from(&json!({"status": "alerting"}), fields), NodeStatus::Online);
        assert_eq!(status_from(&json!({"status": "dormant"}), fields), NodeStatus::Offline);
        assert_eq!(status_from(&json!({"conn_status": 1}), fields), NodeStatus::Online);
        assert_eq!(status_from(&json!({"conn_status": 2}), fields), NodeStatus::Unknown);
        assert_eq!(status_from(&json!({}), fields), NodeStatus::Unknown);
    }

    #[test]
    fn test_first_ipv4_skips_unparseable() {
        let record = json!({"lanIp": "N/A", "wan1Ip": "203.0.113.7"});
        assert_eq!(
            first_ipv4(&record, &["lanIp", "ip", "wan1Ip"]),
            Some(Ipv4Address::new(203, 0, 113, 7))
        );
        assert_eq!(first_ipv4(&record, &["ip"]), None);
    }

    #[test]
    fn test_client_type_inference() {
        assert_eq!(infer_client_type(Some("iPhone"), None), ClientType::Mobile);
        assert_eq!(infer_client_type(Some("Windows 11"), Some("Apple")), ClientType::Desktop);
        assert_eq!(infer_client_type(None, Some("Samsung Electronics")), ClientType::Mobile);
        assert_eq!(infer_client_type(Some("Other"), Some("Dell Inc.")), ClientType::Desktop);
        assert_eq!(infer_client_type(None, Some("Espressif")), ClientType::Unknown);
        assert_eq!(infer_client_type(None, None), ClientType::Unknown);
    }
}
