//! Reusable device configurations.
//!
//! Each fixture mirrors what a real router reports, in the shape the host
//! returns it (`uci get` replies, `board.json`, override files).

use serde_json::{json, Value};

use portpanel_topology::{NetDevice, Network, NetworkSections, Zone};

/// Builder for a `uci get network` reply.
#[derive(Debug, Default, Clone)]
pub struct UciNetwork {
    sections: Vec<(String, Value)>,
}

impl UciNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, name: &str, kind: &str, mut body: Value) -> Self {
        let index = self.sections.len();
        if let Some(obj) = body.as_object_mut() {
            obj.insert(".type".to_string(), json!(kind));
            obj.insert(".name".to_string(), json!(name));
            obj.insert(".index".to_string(), json!(index));
        }
        self.sections.push((name.to_string(), body));
        self
    }

    /// A `device` section of type bridge.
    pub fn bridge(self, name: &str, ports: &[&str]) -> Self {
        let section = format!("dev_{}", name.replace('-', "_"));
        self.push(&section, "device", json!({"type": "bridge", "name": name, "ports": ports}))
    }

    /// A bridge with `vlan_filtering` enabled.
    pub fn filtering_bridge(self, name: &str, ports: &[&str]) -> Self {
        let section = format!("dev_{}", name.replace('-', "_"));
        self.push(
            &section,
            "device",
            json!({"type": "bridge", "name": name, "ports": ports, "vlan_filtering": "1"}),
        )
    }

    pub fn bridge_vlan(self, device: &str, vlan: u16, ports: &[&str]) -> Self {
        let section = format!("vlan_{}_{}", device.replace('-', "_"), vlan);
        self.push(
            &section,
            "bridge-vlan",
            json!({"device": device, "vlan": vlan.to_string(), "ports": ports}),
        )
    }

    /// An 802.1q VLAN device.
    pub fn vlan_device(self, name: &str, ifname: &str, vid: u16) -> Self {
        let section = format!("dev_{}", name.replace(['-', '.'], "_"));
        self.push(
            &section,
            "device",
            json!({"type": "8021q", "name": name, "ifname": ifname, "vid": vid.to_string()}),
        )
    }

    pub fn interface(self, name: &str, device: &str) -> Self {
        self.push(name, "interface", json!({"device": device, "proto": "static"}))
    }

    /// The reply as returned by `uci get`.
    pub fn reply(&self) -> Value {
        let values: serde_json::Map<String, Value> = self.sections.iter().cloned().collect();
        json!({ "values": values })
    }

    pub fn sections(&self) -> NetworkSections {
        NetworkSections::from_uci_json(&self.reply())
    }
}

/// Typical DSA router: five switch ports, `lan1`-`lan4` bridged into
/// `br-lan`, `wan` standalone.
pub fn dsa_router() -> UciNetwork {
    UciNetwork::new()
        .bridge("br-lan", &["lan1", "lan2", "lan3", "lan4"])
        .interface("lan", "br-lan")
        .interface("wan", "wan")
        .interface("wan6", "wan")
}

/// `br-lan` with VLAN filtering: VLAN 1 on `lan1`-`lan3`, VLAN 3 (guest)
/// tagged on `lan3` and untagged on `lan4`.
pub fn vlan_filtering_router() -> UciNetwork {
    UciNetwork::new()
        .filtering_bridge("br-lan", &["lan1", "lan2", "lan3", "lan4"])
        .bridge_vlan("br-lan", 1, &["lan1:u*", "lan2:u*", "lan3:u*"])
        .bridge_vlan("br-lan", 3, &["lan3:t", "lan4"])
        .interface("lan", "br-lan.1")
        .interface("guest", "br-lan.3")
        .interface("wan", "wan")
}

pub fn networks_for_dsa_router() -> Vec<Network> {
    vec![
        Network::new("lan", Some("br-lan")),
        Network::new("wan", Some("wan")),
        Network::new("wan6", Some("wan")),
        Network::new("loopback", Some("lo")),
    ]
}

pub fn default_zones() -> Vec<Zone> {
    vec![Zone::new("lan", ["lan"]), Zone::new("wan", ["wan", "wan6"])]
}

/// `board.json` of a board with a `ports` list for LAN and a single WAN
/// device.
pub fn board_json() -> &'static str {
    r#"{
  "model": { "id": "example,router", "name": "Example Router" },
  "network": {
    "lan": { "ports": ["lan1", "lan2", "lan3", "lan4"], "protocol": "static" },
    "wan": { "device": "wan", "protocol": "dhcp" }
  }
}"#
}

/// A valid override file reordering `wan` first and renaming `lan2`.
pub fn user_ports_json() -> &'static str {
    r#"[
  {
    "device": "wan",
    "label": "Internet",
    "role": "wan",
    "originalLabel": "wan",
    "description": "ISP uplink"
  },
  {
    "device": "lan2",
    "label": "Office",
    "role": "lan",
    "originalLabel": "lan2",
    "description": ""
  }
]"#
}

/// A connected gigabit device with some traffic.
pub fn linked_device(name: &str) -> NetDevice {
    let mut dev = NetDevice::offline(name);
    dev.speed = Some(1000);
    dev.duplex = Some("full".to_string());
    dev.carrier = true;
    dev.up = true;
    dev.stats.rx_bytes = 1_572_864;
    dev.stats.tx_bytes = 4096;
    dev
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dsa_router_sections() {
        let sections = dsa_router().sections();
        assert_eq!(sections.devices.len(), 1);
        assert_eq!(sections.interfaces.len(), 3);
        assert_eq!(sections.devices[0].ports.len(), 4);
        assert_eq!(sections.interfaces[0].name.as_deref(), Some("lan"));
    }

    #[test]
    fn test_vlan_router_sections() {
        let sections = vlan_filtering_router().sections();
        assert_eq!(sections.bridge_vlans.len(), 2);
        assert_eq!(sections.bridge_vlans[1].vlan.as_deref(), Some("3"));
        assert_eq!(sections.devices[0].vlan_filtering.as_deref(), Some("1"));
    }

    #[test]
    fn test_user_ports_json_parses() {
        let value: Value = serde_json::from_str(user_ports_json()).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }
}
