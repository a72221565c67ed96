//! Meraki dashboard records.

use super::{first_ipv4, first_mac, generated_id, infer_client_type, status_from};
use crate::fields::RecordExt;
use crate::model::{ClientAttachment, ClientType, DeviceRef, Node, NodeId, NodeKind, NodeStatus, Vendor};
use netgraph_types::{Ipv4Address, MacAddress};
use serde_json::Value;
use std::collections::BTreeMap;

/// Ordered candidate keys for each attribute.
pub mod fields {
    use crate::fields::FieldList;

    pub const DEVICE_ID: FieldList = &["serial", "mac"];
    pub const DEVICE_NAME: FieldList = &["name"];
    pub const DEVICE_LABEL: FieldList = &["name", "description", "hostname", "mac"];
    pub const DEVICE_IP: FieldList = &["lanIp", "ip", "wan1Ip", "wan2Ip"];
    pub const DEVICE_MAC: FieldList = &["mac"];
    pub const DEVICE_MODEL: FieldList = &["model"];
    pub const PRODUCT_TYPE: FieldList = &["productType", "type"];
    pub const NETWORK: FieldList = &["networkId"];
    pub const STATUS: FieldList = &["status"];
    pub const PORTS: &str = "ports";
    pub const PORT_ID: FieldList = &["portId", "port"];
    pub const NEIGHBOR_NAME: FieldList = &["cdp.deviceId", "lldp.systemName"];

    pub const CLIENT_ID: FieldList = &["id", "mac"];
    pub const CLIENT_LABEL: FieldList = &["description", "dhcpHostname", "hostname", "mac"];
    pub const CLIENT_IP: FieldList = &["ip"];
    pub const CLIENT_MAC: FieldList = &["mac"];
    pub const ATTACHED_SERIAL: FieldList = &["recentDeviceSerial"];
    pub const ATTACHED_MAC: FieldList = &["recentDeviceMac"];
    pub const SSID: FieldList = &["ssid"];
    pub const SWITCHPORT: FieldList = &["switchport"];
    pub const SWITCHPORT_DESC: FieldList = &["switchportDesc"];
    pub const VLAN: FieldList = &["vlan"];
    pub const DEVICE_TYPE: FieldList = &["deviceTypePrediction", "deviceType", "os"];
    pub const MANUFACTURER: FieldList = &["manufacturer"];
}

/// Model prefixes, matched against the upper-cased model.
const MODEL_PREFIXES: &[(&str, NodeKind)] = &[
    ("MX", NodeKind::SecurityAppliance),
    ("Z", NodeKind::SecurityAppliance),
    ("MS", NodeKind::Switch),
    ("MR", NodeKind::WirelessAp),
    ("CW", NodeKind::WirelessAp),
    ("MV", NodeKind::Camera),
    ("MT", NodeKind::Sensor),
];

/// Dashboard product types, lower-cased.
const PRODUCT_TYPES: &[(&str, NodeKind)] = &[
    ("appliance", NodeKind::SecurityAppliance),
    ("switch", NodeKind::Switch),
    ("wireless", NodeKind::WirelessAp),
    ("camera", NodeKind::Camera),
    ("sensor", NodeKind::Sensor),
];

/// Substrings of the lower-cased device name.
const NAME_HINTS: &[(&str, NodeKind)] = &[
    ("security appliance", NodeKind::SecurityAppliance),
    ("firewall", NodeKind::SecurityAppliance),
    ("switch", NodeKind::Switch),
    ("access point", NodeKind::WirelessAp),
    ("camera", NodeKind::Camera),
    ("sensor", NodeKind::Sensor),
];

/// Classifies a Meraki device: model prefix, then product type, then name.
pub fn infer_device_kind(
    model: Option<&str>,
    product_type: Option<&str>,
    name: Option<&str>,
) -> NodeKind {
    let by_model = model.map(str::to_ascii_uppercase).and_then(|m| {
        MODEL_PREFIXES
            .iter()
            .find(|(prefix, _)| m.starts_with(prefix))
            .map(|(_, kind)| *kind)
    });
    let by_type = || {
        product_type.map(str::to_ascii_lowercase).and_then(|t| {
            PRODUCT_TYPES
                .iter()
                .find(|(name, _)| *name == t)
                .map(|(_, kind)| *kind)
        })
    };
    let by_name = || {
        name.map(str::to_ascii_lowercase).and_then(|n| {
            NAME_HINTS
                .iter()
                .find(|(hint, _)| n.contains(hint))
                .map(|(_, kind)| *kind)
        })
    };

    by_model
        .or_else(by_type)
        .or_else(by_name)
        .unwrap_or(NodeKind::Unknown)
}

/// A Meraki device record with every attribute resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct MerakiDevice {
    pub id: String,
    pub name: Option<String>,
    pub label: String,
    pub model: Option<String>,
    pub product_type: Option<String>,
    pub ip: Option<Ipv4Address>,
    pub mac: Option<MacAddress>,
    pub network_id: Option<String>,
    pub status: NodeStatus,
    pub neighbors: BTreeMap<String, String>,
}

impl MerakiDevice {
    pub fn from_record(record: &Value) -> Self {
        let id = record
            .first_text(fields::DEVICE_ID)
            .unwrap_or_else(|| generated_id(record));

        MerakiDevice {
            label: record.first_text_or(fields::DEVICE_LABEL, &id),
            name: record.first_text(fields::DEVICE_NAME),
            model: record.first_text(fields::DEVICE_MODEL),
            product_type: record.first_text(fields::PRODUCT_TYPE),
            ip: first_ipv4(record, fields::DEVICE_IP),
            mac: first_mac(record, fields::DEVICE_MAC),
            network_id: record.first_text(fields::NETWORK),
            status: status_from(record, fields::STATUS),
            neighbors: neighbor_table(record),
            id,
        }
    }

    pub fn kind(&self) -> NodeKind {
        infer_device_kind(
            self.model.as_deref(),
            self.product_type.as_deref(),
            self.name.as_deref(),
        )
    }

    pub fn into_node(self, raw: Value) -> Node {
        Node {
            id: NodeId::new(Vendor::Meraki, &self.id),
            kind: self.kind(),
            label: self.label,
            vendor: Vendor::Meraki,
            name: self.name,
            ip: self.ip,
            mac: self.mac,
            model: self.model,
            status: self.status,
            network_id: self.network_id,
            client_type: None,
            attachment: None,
            neighbors: self.neighbors,
            raw,
        }
    }
}

/// Port → neighbor name from the `ports` discovery table.
///
/// Accepts an object keyed by port number or an array of entries carrying
/// their own port id. Entries without a neighbor name are skipped.
fn neighbor_table(record: &Value) -> BTreeMap<String, String> {
    let entries: Vec<(String, &Value)> = match record.get_path(fields::PORTS) {
        Some(Value::Object(ports)) => ports.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Some(Value::Array(ports)) => ports
            .iter()
            .filter_map(|entry| Some((entry.first_text(fields::PORT_ID)?, entry)))
            .collect(),
        _ => Vec::new(),
    };

    entries
        .into_iter()
        .filter_map(|(port, entry)| Some((port, entry.first_text(fields::NEIGHBOR_NAME)?)))
        .collect()
}

/// A Meraki client record with every attribute resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct MerakiClient {
    pub id: String,
    pub label: String,
    pub ip: Option<Ipv4Address>,
    pub mac: Option<MacAddress>,
    pub status: NodeStatus,
    pub client_type: ClientType,
    pub attachment: Option<ClientAttachment>,
}

impl MerakiClient {
    pub fn from_record(record: &Value) -> Self {
        let id = record
            .first_text(fields::CLIENT_ID)
            .unwrap_or_else(|| generated_id(record));

        MerakiClient {
            label: record.first_text_or(fields::CLIENT_LABEL, &id),
            ip: first_ipv4(record, fields::CLIENT_IP),
            mac: first_mac(record, fields::CLIENT_MAC),
            status: status_from(record, fields::STATUS),
            client_type: infer_client_type(
                record.first_text(fields::DEVICE_TYPE).as_deref(),
                record.first_text(fields::MANUFACTURER).as_deref(),
            ),
            attachment: attachment(record),
            id,
        }
    }

    pub fn into_node(self, raw: Value) -> Node {
        Node {
            id: NodeId::new(Vendor::Meraki, &self.id),
            label: self.label,
            kind: NodeKind::Client,
            vendor: Vendor::Meraki,
            name: None,
            ip: self.ip,
            mac: self.mac,
            model: None,
            status: self.status,
            network_id: None,
            client_type: Some(self.client_type),
            attachment: self.attachment,
            neighbors: BTreeMap::new(),
            raw,
        }
    }
}

fn attachment(record: &Value) -> Option<ClientAttachment> {
    let device = match record.first_text(fields::ATTACHED_SERIAL) {
        Some(serial) => DeviceRef::Id(NodeId::new(Vendor::Meraki, &serial)),
        None => {
            let mac = record.first_text(fields::ATTACHED_MAC)?;
            match mac.parse::<MacAddress>() {
                Ok(mac) => DeviceRef::Mac(mac),
                Err(_) => DeviceRef::Id(NodeId::new(Vendor::Meraki, &mac)),
            }
        }
    };

    Some(ClientAttachment {
        device,
        ssid: record.first_text(fields::SSID),
        switchport: record.first_text(fields::SWITCHPORT),
        switchport_desc: record.first_text(fields::SWITCHPORT_DESC),
        vlan: record.first_text(fields::VLAN),
    })
}
