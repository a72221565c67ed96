//! FortiManager and FortiGate records.
//!
//! Device records come from three places: FortiGates polled directly,
//! managed devices listed by FortiManager, and FortiAPs listed by their
//! controlling FortiGate. Wifi clients are reported per FortiGate.

use super::{first_ipv4, first_mac, generated_id, infer_client_type, status_from};
use crate::fields::RecordExt;
use crate::model::{ClientAttachment, ClientType, DeviceRef, Node, NodeId, NodeKind, NodeStatus, Vendor};
use netgraph_types::{Ipv4Address, MacAddress};
use serde_json::Value;
use std::collections::BTreeMap;

/// Ordered candidate keys for each attribute.
pub mod fields {
    use crate::fields::FieldList;

    pub const DEVICE_ID: FieldList = &["id", "serial", "sn", "mac", "name", "host"];
    pub const DEVICE_NAME: FieldList = &["name", "hostname"];
    pub const DEVICE_LABEL: FieldList = &["name", "hostname", "host"];
    pub const DEVICE_IP: FieldList = &["ip", "host"];
    pub const DEVICE_MAC: FieldList = &["mac", "base_mac"];
    pub const DEVICE_MODEL: FieldList = &["model", "platform_str", "platform"];
    pub const ROLE: FieldList = &["type", "device_type"];
    pub const NETWORK: FieldList = &["fortigate_id", "fortigate", "adom"];
    pub const STATUS: FieldList = &["status", "conn_status"];

    pub const CLIENT_ID: FieldList = &["mac", "id"];
    pub const CLIENT_LABEL: FieldList = &["hostname", "name", "mac"];
    pub const CLIENT_IP: FieldList = &["ip"];
    pub const CLIENT_MAC: FieldList = &["mac"];
    pub const ATTACHED_AP: FieldList = &["ap", "ap_serial", "wtp_id"];
    pub const SSID: FieldList = &["ssid"];
    pub const VLAN: FieldList = &["vlan_id", "vlan"];
    pub const DEVICE_TYPE: FieldList = &["os", "device_type"];
    pub const MANUFACTURER: FieldList = &["manufacturer", "vendor"];
}

/// Role substrings of the lower-cased role field.
const ROLES: &[(&str, NodeKind)] = &[
    ("fortiap", NodeKind::WirelessAp),
    ("fortigate", NodeKind::Firewall),
];

/// Model prefixes, matched against the upper-cased model.
const MODEL_PREFIXES: &[(&str, NodeKind)] = &[
    ("FAP", NodeKind::WirelessAp),
    ("FORTIAP", NodeKind::WirelessAp),
    ("FG", NodeKind::Firewall),
    ("FORTIGATE", NodeKind::Firewall),
];

/// Classifies a Fortinet device: role, then model. Anything else is a
/// FortiManager-managed device, which is a FortiGate.
pub fn infer_device_kind(role: Option<&str>, model: Option<&str>) -> NodeKind {
    let by_role = role.map(str::to_ascii_lowercase).and_then(|r| {
        ROLES
            .iter()
            .find(|(needle, _)| r.contains(needle))
            .map(|(_, kind)| *kind)
    });
    let by_model = || {
        model.map(str::to_ascii_uppercase).and_then(|m| {
            MODEL_PREFIXES
                .iter()
                .find(|(prefix, _)| m.starts_with(prefix))
                .map(|(_, kind)| *kind)
        })
    };

    by_role.or_else(by_model).unwrap_or(NodeKind::Firewall)
}

/// A Fortinet device record with every attribute resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct FortinetDevice {
    pub id: String,
    pub name: Option<String>,
    pub label: String,
    pub kind: NodeKind,
    pub model: Option<String>,
    pub ip: Option<Ipv4Address>,
    pub mac: Option<MacAddress>,
    pub network_id: Option<String>,
    pub status: NodeStatus,
}

impl FortinetDevice {
    pub fn from_record(record: &Value) -> Self {
        let id = record
            .first_text(fields::DEVICE_ID)
            .unwrap_or_else(|| generated_id(record));
        let model = record.first_text(fields::DEVICE_MODEL);

        FortinetDevice {
            label: record.first_text_or(fields::DEVICE_LABEL, &id),
            name: record.first_text(fields::DEVICE_NAME),
            kind: infer_device_kind(record.first_text(fields::ROLE).as_deref(), model.as_deref()),
            model,
            ip: first_ipv4(record, fields::DEVICE_IP),
            mac: first_mac(record, fields::DEVICE_MAC),
            network_id: record.first_text(fields::NETWORK),
            status: status_from(record, fields::STATUS),
            id,
        }
    }

    pub fn into_node(self, raw: Value) -> Node {
        Node {
            id: NodeId::new(Vendor::Fortinet, &self.id),
            label: self.label,
            kind: self.kind,
            vendor: Vendor::Fortinet,
            name: self.name,
            ip: self.ip,
            mac: self.mac,
            model: self.model,
            status: self.status,
            network_id: self.network_id,
            client_type: None,
            attachment: None,
            neighbors: BTreeMap::new(),
            raw,
        }
    }
}

/// A FortiGate wifi client record with every attribute resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct FortinetClient {
    pub id: String,
    pub label: String,
    pub ip: Option<Ipv4Address>,
    pub mac: Option<MacAddress>,
    pub client_type: ClientType,
    pub attachment: Option<ClientAttachment>,
}

impl FortinetClient {
    pub fn from_record(record: &Value) -> Self {
        let id = record
            .first_text(fields::CLIENT_ID)
            .unwrap_or_else(|| generated_id(record));

        let attachment = record
            .first_text(fields::ATTACHED_AP)
            .map(|ap| ClientAttachment {
                device: DeviceRef::Id(NodeId::new(Vendor::Fortinet, &ap)),
                ssid: record.first_text(fields::SSID),
                switchport: None,
                switchport_desc: None,
                vlan: record.first_text(fields::VLAN),
            });

        FortinetClient {
            label: record.first_text_or(fields::CLIENT_LABEL, &id),
            ip: first_ipv4(record, fields::CLIENT_IP),
            mac: first_mac(record, fields::CLIENT_MAC),
            client_type: infer_client_type(
                record.first_text(fields::DEVICE_TYPE).as_deref(),
                record.first_text(fields::MANUFACTURER).as_deref(),
            ),
            attachment,
            id,
        }
    }

    pub fn into_node(self, raw: Value) -> Node {
        Node {
            id: NodeId::new(Vendor::Fortinet, &self.id),
            label: self.label,
            kind: NodeKind::Client,
            vendor: Vendor::Fortinet,
            name: None,
            ip: self.ip,
            mac: self.mac,
            model: None,
            // Only associated stations are reported
            status: NodeStatus::Online,
            network_id: None,
            client_type: Some(self.client_type),
            attachment: self.attachment,
            neighbors: BTreeMap::new(),
            raw,
        }
    }
}
