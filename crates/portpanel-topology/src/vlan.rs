//! Bridge/VLAN topology resolution.
//!
//! Reconstructs, from raw `bridge-vlan`, `device` and `interface` sections,
//! which devices every logical device name stands for. A bridge maps to its
//! member ports, a VLAN device maps to the VLAN's ports on its parent bridge
//! (or to the parent itself), and dotted sub-interface names such as
//! `eth0.10.20` are peeled one tag at a time.
//!
//! Resolution flow:
//! 1. `bridge-vlan` sections → per-bridge port sets and per-VLAN port sets
//! 2. `device` sections → bridges and 802.1Q/802.1ad VLAN devices
//! 3. chain resolution for every bridge port, VLAN port and interface device
//!
//! [`VlanMapping::resolve_ports`] then flattens any name to its leaf
//! (physical) devices.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use portpanel_common::natural_sort;
use regex::Regex;
use tracing::{debug, trace};

use crate::sections::{types, BridgeVlanSection, DeviceSection, InterfaceSection};

/// Highest VLAN id accepted in configuration.
pub const VLAN_ID_MAX: u16 = 4095;

/// Matches the tagging suffix of a bridge-vlan port (`lan1:u*`, `lan2:t`).
static TAG_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":[ut*]+$").expect("Invalid regex pattern"));

/// Parses a VLAN id written as one to four digits in `0..=4095`.
pub fn parse_vlan_id(s: &str) -> Option<u16> {
    if s.is_empty() || s.len() > 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<u16>().ok().filter(|id| *id <= VLAN_ID_MAX)
}

/// Strips a `:u`, `:t`, `:*` (or combined) tagging suffix from a port name.
pub fn strip_tag_suffix(port: &str) -> &str {
    match TAG_SUFFIX_RE.find(port) {
        Some(m) => &port[..m.start()],
        None => port,
    }
}

/// Splits `base.tag` at the last dot; both halves must be non-empty.
fn split_vlan_name(name: &str) -> Option<(&str, &str)> {
    let (base, tag) = name.rsplit_once('.')?;
    if base.is_empty() || tag.is_empty() {
        None
    } else {
        Some((base, tag))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn push_unique(list: &mut Vec<String>, item: &str) {
    if !list.iter().any(|p| p == item) {
        list.push(item.to_string());
    }
}

/// A bridge device and its VLAN layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeRecord {
    /// Member ports in configuration order, without tag suffixes.
    pub ports: Vec<String>,
    pub vlan_filtering: bool,
    /// VLAN id → member ports. Aliases carry a copy of their VLAN's set.
    pub vlans: HashMap<String, Vec<String>>,
}

impl BridgeRecord {
    fn new(vlan_filtering: bool) -> Self {
        Self {
            vlan_filtering,
            ..Self::default()
        }
    }

    /// Ports of one VLAN id (or alias).
    pub fn vlan_ports(&self, vid: &str) -> Option<&[String]> {
        self.vlans.get(vid).map(Vec::as_slice)
    }
}

/// What a mapped device name stands for while sections are still being
/// folded in. A bridge's port list can keep growing after a name was
/// mapped to it, so that case is kept symbolic until the end.
#[derive(Debug, Clone)]
enum Target {
    BridgePorts(String),
    Devices(Vec<String>),
}

/// Working state of one resolution pass.
#[derive(Debug, Default)]
struct Resolver {
    bridges: HashMap<String, BridgeRecord>,
    bridge_order: Vec<String>,
    targets: HashMap<String, Target>,
}

impl Resolver {
    fn bridge_entry(&mut self, name: &str, vlan_filtering: bool) -> &mut BridgeRecord {
        if !self.bridges.contains_key(name) {
            self.bridge_order.push(name.to_string());
        }
        self.bridges
            .entry(name.to_string())
            .or_insert_with(|| BridgeRecord::new(vlan_filtering))
    }

    /// Target for `<bridge>.<vid>`-style references: the VLAN's ports on a
    /// filtering bridge, all bridge ports otherwise. `None` when the bridge
    /// filters but has no such VLAN.
    fn bridge_target(&self, bridge: &str, vid: &str) -> Option<Target> {
        let br = self.bridges.get(bridge)?;
        if br.vlan_filtering {
            br.vlans.get(vid).cloned().map(Target::Devices)
        } else {
            Some(Target::BridgePorts(bridge.to_string()))
        }
    }

    fn set_target(&mut self, name: &str, target: Option<Target>) {
        match target {
            Some(t) => {
                trace!(device = %name, target = ?t, "Mapped device");
                self.targets.insert(name.to_string(), t);
            }
            None => {
                self.targets.remove(name);
            }
        }
    }

    fn add_bridge_vlan(&mut self, section: &BridgeVlanSection) {
        let Some(device) = non_empty(&section.device) else {
            return;
        };
        let Some(vlan) = section.vlan.as_deref().filter(|v| parse_vlan_id(v).is_some()) else {
            debug!(device = %device, vlan = ?section.vlan, "Skipping bridge-vlan with invalid id");
            return;
        };

        let br = self.bridge_entry(device, true);
        let mut vlan_ports = Vec::with_capacity(section.ports.len());
        for raw in &section.ports {
            let port = strip_tag_suffix(raw);
            push_unique(&mut br.ports, port);
            vlan_ports.push(port.to_string());
        }

        for alias in &section.alias {
            if alias != vlan {
                br.vlans.insert(alias.clone(), vlan_ports.clone());
            }
        }
        br.vlans.insert(vlan.to_string(), vlan_ports);
    }

    fn add_device(&mut self, section: &DeviceSection) {
        match section.kind.as_deref() {
            Some(types::BRIDGE) => {
                let Some(name) = non_empty(&section.name) else {
                    return;
                };
                let br = self.bridge_entry(name, false);
                match section.vlan_filtering.as_deref() {
                    Some("0") => br.vlan_filtering = false,
                    Some("1") => br.vlan_filtering = true,
                    _ => {}
                }
                for port in &section.ports {
                    push_unique(&mut br.ports, port);
                }
                self.set_target(name, Some(Target::BridgePorts(name.to_string())));
            }
            Some(types::VLAN_8021Q) | Some(types::VLAN_8021AD) => {
                let (Some(name), Some(vid), Some(parent)) = (
                    non_empty(&section.name),
                    non_empty(&section.vid),
                    non_empty(&section.ifname),
                ) else {
                    return;
                };

                let target = if self.bridges.contains_key(parent) {
                    self.bridge_target(parent, vid)
                } else {
                    Some(Target::Devices(vec![parent.to_string()]))
                };
                self.set_target(name, target);
                self.resolve_chain(parent);
            }
            _ => {}
        }
    }

    /// Peels `base.tag` suffixes off `name` until a name is already mapped
    /// or no longer decomposes. Each peeled level is mapped to the bridge
    /// VLAN it denotes or, for a numeric tag on a plain device, to its base.
    fn resolve_chain(&mut self, name: &str) {
        let mut current = name.to_string();
        let mut visited = HashSet::new();

        while !self.targets.contains_key(&current) {
            if !visited.insert(current.clone()) {
                break;
            }
            let Some((base, tag)) = split_vlan_name(&current) else {
                break;
            };
            let (base, tag) = (base.to_string(), tag.to_string());

            if self.bridges.contains_key(&base) {
                let target = self.bridge_target(&base, &tag);
                self.set_target(&current, target);
            } else if parse_vlan_id(&tag).is_some() {
                self.set_target(&current, Some(Target::Devices(vec![base.clone()])));
            } else {
                break;
            }

            current = base;
        }
    }

    fn finish(self) -> VlanMapping {
        let entries = self
            .targets
            .into_iter()
            .map(|(name, target)| {
                let ports = match target {
                    Target::Devices(devices) => devices,
                    Target::BridgePorts(bridge) => self
                        .bridges
                        .get(&bridge)
                        .map(|br| br.ports.clone())
                        .unwrap_or_default(),
                };
                (name, ports)
            })
            .collect();

        VlanMapping {
            entries,
            bridges: self.bridges,
        }
    }
}

/// Device name → the devices it represents, plus the bridges it was built
/// from. Immutable once [`resolve`] returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VlanMapping {
    entries: HashMap<String, Vec<String>>,
    bridges: HashMap<String, BridgeRecord>,
}

impl VlanMapping {
    /// Direct mapping of a name, if it is not a leaf.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn bridge(&self, name: &str) -> Option<&BridgeRecord> {
        self.bridges.get(name)
    }

    /// Expands `name` to the sorted list of leaf devices it covers.
    ///
    /// Names absent from the mapping are leaves and resolve to themselves.
    /// Every device is expanded at most once per call, which both removes
    /// duplicates and breaks cycles in malformed configuration.
    pub fn resolve_ports(&self, name: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.resolve_ports_with(name, &mut seen)
    }

    /// Same as [`resolve_ports`](Self::resolve_ports) with a caller-supplied
    /// seen set.
    pub fn resolve_ports_with(&self, name: &str, seen: &mut HashSet<String>) -> Vec<String> {
        let mut ports = Vec::new();

        match self.entries.get(name) {
            Some(children) => {
                for child in children {
                    if seen.insert(child.clone()) {
                        ports.extend(self.resolve_ports_with(child, seen));
                    }
                }
            }
            None => ports.push(name.to_string()),
        }

        natural_sort(&mut ports);
        ports
    }
}

/// Builds the VLAN mapping from the three `network` section lists.
pub fn resolve(
    bridge_vlans: &[BridgeVlanSection],
    devices: &[DeviceSection],
    interfaces: &[InterfaceSection],
) -> VlanMapping {
    let mut resolver = Resolver::default();

    for section in bridge_vlans {
        resolver.add_bridge_vlan(section);
    }

    for section in devices {
        resolver.add_device(section);
    }

    // Bridge members may themselves be VLAN sub-interfaces.
    let mut pending = Vec::new();
    for name in &resolver.bridge_order {
        if let Some(br) = resolver.bridges.get(name) {
            pending.extend(br.ports.iter().cloned());
            for ports in br.vlans.values() {
                pending.extend(ports.iter().cloned());
            }
        }
    }
    for port in pending {
        resolver.resolve_chain(&port);
    }

    // Implicit VLAN devices referenced only by interfaces.
    for section in interfaces {
        if let Some(device) = non_empty(&section.device) {
            resolver.resolve_chain(device);
        }
    }

    let mapping = resolver.finish();
    debug!(
        entries = mapping.len(),
        bridges = mapping.bridges.len(),
        "Resolved VLAN mapping"
    );
    mapping
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bridge(name: &str, ports: &[&str], filtering: Option<&str>) -> DeviceSection {
        DeviceSection {
            kind: Some("bridge".to_string()),
            name: Some(name.to_string()),
            ports: ports.iter().map(|p| p.to_string()).collect(),
            vlan_filtering: filtering.map(str::to_string),
            ..Default::default()
        }
    }

    fn vlan_dev(kind: &str, name: &str, parent: &str, vid: &str) -> DeviceSection {
        DeviceSection {
            kind: Some(kind.to_string()),
            name: Some(name.to_string()),
            ifname: Some(parent.to_string()),
            vid: Some(vid.to_string()),
            ..Default::default()
        }
    }

    fn bridge_vlan(device: &str, vlan: &str, ports: &[&str], alias: &[&str]) -> BridgeVlanSection {
        BridgeVlanSection {
            device: Some(device.to_string()),
            vlan: Some(vlan.to_string()),
            ports: ports.iter().map(|p| p.to_string()).collect(),
            alias: alias.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn iface(device: &str) -> InterfaceSection {
        InterfaceSection {
            name: Some("lan".to_string()),
            device: Some(device.to_string()),
        }
    }

    #[test]
    fn test_parse_vlan_id() {
        assert_eq!(parse_vlan_id("0"), Some(0));
        assert_eq!(parse_vlan_id("4095"), Some(4095));
        assert_eq!(parse_vlan_id("4096"), None);
        assert_eq!(parse_vlan_id("00010"), None);
        assert_eq!(parse_vlan_id("1a"), None);
        assert_eq!(parse_vlan_id(""), None);
    }

    #[test]
    fn test_strip_tag_suffix() {
        assert_eq!(strip_tag_suffix("eth0:t"), "eth0");
        assert_eq!(strip_tag_suffix("lan1:u*"), "lan1");
        assert_eq!(strip_tag_suffix("lan2:*"), "lan2");
        assert_eq!(strip_tag_suffix("lan3"), "lan3");
        assert_eq!(strip_tag_suffix("lan4:x"), "lan4:x");
    }

    #[test]
    fn test_non_filtering_bridge_vlan_device() {
        let devices = vec![
            bridge("br0", &["eth0", "eth1"], None),
            vlan_dev("8021q", "br0.10", "br0", "10"),
        ];
        let mapping = resolve(&[], &devices, &[]);

        assert_eq!(mapping.resolve_ports("br0.10"), vec!["eth0", "eth1"]);
        assert_eq!(mapping.resolve_ports("br0"), vec!["eth0", "eth1"]);
    }

    #[test]
    fn test_filtering_bridge_vlan_and_alias() {
        let vlans = vec![bridge_vlan("br0", "10", &["eth0:t"], &["100", "10"])];
        let mapping = resolve(&vlans, &[], &[]);

        let br = mapping.bridge("br0").unwrap();
        assert!(br.vlan_filtering);
        assert_eq!(br.vlan_ports("10").unwrap(), ["eth0".to_string()]);
        assert_eq!(br.vlan_ports("100"), br.vlan_ports("10"));
        assert_eq!(br.ports, vec!["eth0"]);
    }

    #[test]
    fn test_filtering_bridge_vlan_device_uses_vlan_ports() {
        let vlans = vec![
            bridge_vlan("br-lan", "1", &["lan1:u*", "lan2:u*"], &[]),
            bridge_vlan("br-lan", "2", &["lan3:u*", "lan2:t"], &[]),
        ];
        let devices = vec![
            bridge("br-lan", &["lan1", "lan2", "lan3"], Some("1")),
            vlan_dev("8021q", "br-lan.2", "br-lan", "2"),
        ];
        let interfaces = vec![iface("br-lan.1")];
        let mapping = resolve(&vlans, &devices, &interfaces);

        assert_eq!(mapping.resolve_ports("br-lan.2"), vec!["lan2", "lan3"]);
        // implicit VLAN device only referenced by an interface
        assert_eq!(mapping.resolve_ports("br-lan.1"), vec!["lan1", "lan2"]);
        assert_eq!(mapping.resolve_ports("br-lan"), vec!["lan1", "lan2", "lan3"]);
    }

    #[test]
    fn test_vlan_filtering_zero_overrides_bridge_vlan_default() {
        let vlans = vec![bridge_vlan("br0", "5", &["eth0"], &[])];
        let devices = vec![
            bridge("br0", &["eth1"], Some("0")),
            vlan_dev("8021q", "br0.5", "br0", "5"),
        ];
        let mapping = resolve(&vlans, &devices, &[]);

        assert!(!mapping.bridge("br0").unwrap().vlan_filtering);
        assert_eq!(mapping.resolve_ports("br0.5"), vec!["eth0", "eth1"]);
    }

    #[test]
    fn test_vlan_device_on_plain_parent() {
        let devices = vec![vlan_dev("8021ad", "eth0.100", "eth0", "100")];
        let mapping = resolve(&[], &devices, &[]);
        assert_eq!(mapping.get("eth0.100").unwrap(), ["eth0".to_string()]);
        assert_eq!(mapping.resolve_ports("eth0.100"), vec!["eth0"]);
    }

    #[test]
    fn test_incomplete_vlan_device_skipped() {
        let mut dev = vlan_dev("8021q", "eth0.7", "eth0", "7");
        dev.vid = Some(String::new());
        let mapping = resolve(&[], &[dev], &[]);
        assert!(!mapping.contains("eth0.7"));
    }

    #[test]
    fn test_multi_level_chain() {
        let mapping = resolve(&[], &[], &[iface("eth0.10.20")]);

        assert_eq!(mapping.get("eth0.10.20").unwrap(), ["eth0.10".to_string()]);
        assert_eq!(mapping.get("eth0.10").unwrap(), ["eth0".to_string()]);
        assert_eq!(mapping.resolve_ports("eth0.10.20"), vec!["eth0"]);
    }

    #[test]
    fn test_non_numeric_tag_is_leaf() {
        let mapping = resolve(&[], &[], &[iface("eth0.lan")]);
        assert!(mapping.is_empty());
        assert_eq!(mapping.resolve_ports("eth0.lan"), vec!["eth0.lan"]);
    }

    #[test]
    fn test_out_of_range_tag_is_leaf() {
        let mapping = resolve(&[], &[], &[iface("eth0.5000")]);
        assert!(!mapping.contains("eth0.5000"));
    }

    #[test]
    fn test_bridge_port_is_vlan_subinterface() {
        let devices = vec![bridge("br-guest", &["eth1.30", "lan4"], None)];
        let mapping = resolve(&[], &devices, &[]);

        assert_eq!(mapping.resolve_ports("br-guest"), vec!["eth1", "lan4"]);
    }

    #[test]
    fn test_chain_on_filtering_bridge_missing_vlan() {
        let vlans = vec![bridge_vlan("br0", "1", &["eth0"], &[])];
        let devices = vec![bridge("br0", &["eth0"], None)];
        let mapping = resolve(&vlans, &devices, &[iface("br0.99")]);

        // no such VLAN: the name stays a leaf
        assert!(!mapping.contains("br0.99"));
        assert_eq!(mapping.resolve_ports("br0.99"), vec!["br0.99"]);
    }

    #[test]
    fn test_bridge_ports_seen_after_mapping() {
        // a second section for the same bridge extends ports that an
        // earlier VLAN device already refers to
        let devices = vec![
            bridge("br0", &["eth0"], None),
            vlan_dev("8021q", "br0.10", "br0", "10"),
            bridge("br0", &["eth1"], None),
        ];
        let mapping = resolve(&[], &devices, &[]);
        assert_eq!(mapping.resolve_ports("br0.10"), vec!["eth0", "eth1"]);
    }

    #[test]
    fn test_self_referential_bridge_terminates() {
        let devices = vec![
            bridge("br0", &["br1", "eth0"], None),
            bridge("br1", &["br0", "eth1"], None),
        ];
        let mapping = resolve(&[], &devices, &[]);
        assert_eq!(mapping.resolve_ports("br0"), vec!["eth0", "eth1"]);
    }

    #[test]
    fn test_resolve_unknown_name_is_leaf() {
        let mapping = VlanMapping::default();
        assert_eq!(mapping.resolve_ports("wan"), vec!["wan"]);
    }

    #[test]
    fn test_empty_bridge_resolves_to_nothing() {
        let mapping = resolve(&[], &[bridge("br-empty", &[], None)], &[]);
        assert!(mapping.contains("br-empty"));
        assert!(mapping.resolve_ports("br-empty").is_empty());
    }
}
