//! UCI `network` configuration sections consumed by the resolver.
//!
//! Option values arrive either as scalars or lists. List options given as a
//! single string are split on whitespace, matching how UCI list options are
//! flattened by the web interface.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Section type names in the `network` config.
pub mod types {
    pub const BRIDGE_VLAN: &str = "bridge-vlan";
    pub const DEVICE: &str = "device";
    pub const INTERFACE: &str = "interface";

    /// `device.type` of a bridge.
    pub const BRIDGE: &str = "bridge";
    /// `device.type` of an 802.1Q VLAN device.
    pub const VLAN_8021Q: &str = "8021q";
    /// `device.type` of an 802.1ad (QinQ) VLAN device.
    pub const VLAN_8021AD: &str = "8021ad";
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        _ => None,
    }
}

fn scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_to_string(&value))
}

fn list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_list(&value))
}

/// Flattens a scalar-or-list option into a list.
pub fn value_to_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(scalar_to_string).collect(),
        Value::String(s) => s.split_whitespace().map(str::to_string).collect(),
        Value::Null => Vec::new(),
        other => scalar_to_string(other).into_iter().collect(),
    }
}

/// `config bridge-vlan` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BridgeVlanSection {
    /// Bridge device the VLAN belongs to.
    #[serde(default, deserialize_with = "scalar")]
    pub device: Option<String>,
    /// VLAN id as written in the config.
    #[serde(default, deserialize_with = "scalar")]
    pub vlan: Option<String>,
    /// Member ports, possibly with `:u`, `:t` or `:*` suffixes.
    #[serde(default, deserialize_with = "list")]
    pub ports: Vec<String>,
    /// Additional VLAN ids sharing this port set.
    #[serde(default, deserialize_with = "list")]
    pub alias: Vec<String>,
}

/// `config device` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeviceSection {
    #[serde(rename = "type", default, deserialize_with = "scalar")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "list")]
    pub ports: Vec<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub vlan_filtering: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub vid: Option<String>,
    /// Parent device of a VLAN device.
    #[serde(default, deserialize_with = "scalar")]
    pub ifname: Option<String>,
}

/// `config interface` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InterfaceSection {
    #[serde(rename = ".name", default, deserialize_with = "scalar")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub device: Option<String>,
}

/// All sections of the `network` config the resolver looks at, each list
/// in config order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkSections {
    pub bridge_vlans: Vec<BridgeVlanSection>,
    pub devices: Vec<DeviceSection>,
    pub interfaces: Vec<InterfaceSection>,
}

impl NetworkSections {
    /// Builds the section lists from a `uci get` reply
    /// (`{"values": {"<name>": {".type": .., ".index": .., ...}}}`).
    ///
    /// Sections are ordered by `.index`; unknown section types and entries
    /// that fail to deserialize are skipped.
    pub fn from_uci_json(reply: &Value) -> Self {
        let mut entries: Vec<(u64, &Value)> = match reply.get("values").and_then(Value::as_object)
        {
            Some(values) => values
                .values()
                .map(|section| {
                    let index = section
                        .get(".index")
                        .and_then(Value::as_u64)
                        .unwrap_or(u64::MAX);
                    (index, section)
                })
                .collect(),
            None => return Self::default(),
        };
        entries.sort_by_key(|(index, _)| *index);

        let mut sections = Self::default();
        for (_, section) in entries {
            let kind = section.get(".type").and_then(Value::as_str).unwrap_or("");
            match kind {
                types::BRIDGE_VLAN => {
                    if let Ok(s) = BridgeVlanSection::deserialize(section) {
                        sections.bridge_vlans.push(s);
                    }
                }
                types::DEVICE => {
                    if let Ok(s) = DeviceSection::deserialize(section) {
                        sections.devices.push(s);
                    }
                }
                types::INTERFACE => {
                    if let Ok(s) = InterfaceSection::deserialize(section) {
                        sections.interfaces.push(s);
                    }
                }
                _ => {}
            }
        }
        sections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_list_from_string_and_array() {
        assert_eq!(value_to_list(&json!("lan1 lan2")), vec!["lan1", "lan2"]);
        assert_eq!(value_to_list(&json!(["lan1:u*", "lan2"])), vec!["lan1:u*", "lan2"]);
        assert_eq!(value_to_list(&json!(10)), vec!["10"]);
        assert!(value_to_list(&Value::Null).is_empty());
    }

    #[test]
    fn test_bridge_vlan_numeric_vlan() {
        let s: BridgeVlanSection =
            serde_json::from_value(json!({"device": "br-lan", "vlan": 10, "ports": "lan1:t"}))
                .unwrap();
        assert_eq!(s.vlan.as_deref(), Some("10"));
        assert_eq!(s.ports, vec!["lan1:t"]);
        assert!(s.alias.is_empty());
    }

    #[test]
    fn test_from_uci_json_orders_by_index() {
        let reply = json!({
            "values": {
                "wan": {".type": "interface", ".name": "wan", ".index": 3, "device": "wan"},
                "cfg030f15": {".type": "device", ".index": 0, "type": "bridge", "name": "br-lan", "ports": ["lan1", "lan2"]},
                "lan": {".type": "interface", ".name": "lan", ".index": 2, "device": "br-lan"},
                "cfgvlan": {".type": "bridge-vlan", ".index": 1, "device": "br-lan", "vlan": "1", "ports": ["lan1:u*"]},
                "globals": {".type": "globals", ".index": 4}
            }
        });

        let sections = NetworkSections::from_uci_json(&reply);
        assert_eq!(sections.devices.len(), 1);
        assert_eq!(sections.devices[0].kind.as_deref(), Some("bridge"));
        assert_eq!(sections.bridge_vlans.len(), 1);
        let names: Vec<_> = sections
            .interfaces
            .iter()
            .map(|i| i.name.clone().unwrap_or_default())
            .collect();
        assert_eq!(names, vec!["lan", "wan"]);
    }

    #[test]
    fn test_from_uci_json_without_values() {
        assert_eq!(
            NetworkSections::from_uci_json(&json!({})),
            NetworkSections::default()
        );
    }
}
