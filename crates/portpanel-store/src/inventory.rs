//! Detected physical ports.
//!
//! The builtin port list reported by the host is authoritative. When it is
//! empty, `board.json` is consulted instead: `network.lan` then
//! `network.wan`, each carrying either a `ports` array or a single
//! `device`.

use serde_json::Value;
use tracing::{debug, warn};

use portpanel_common::{natural_cmp, BuiltinPort};
use portpanel_topology::NetDevice;

/// A physical port found on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedPort {
    pub device: String,
    pub role: String,
    /// Live device state, attached once the host has been queried.
    pub netdev: Option<NetDevice>,
    /// Factory label; the device name when the board gives none.
    pub original_label: String,
}

impl DetectedPort {
    pub fn new(device: impl Into<String>, role: impl Into<String>) -> Self {
        let device = device.into();
        Self {
            original_label: device.clone(),
            device,
            role: role.into(),
            netdev: None,
        }
    }

    pub fn with_original_label(mut self, label: impl Into<String>) -> Self {
        self.original_label = label.into();
        self
    }
}

/// Builds the detected port list, sorted by device name in natural order.
pub fn detect_ports(builtin: &[BuiltinPort], board_json: Option<&str>) -> Vec<DetectedPort> {
    let mut ports: Vec<DetectedPort> = if builtin.is_empty() {
        board_ports(board_json)
    } else {
        builtin
            .iter()
            .filter(|p| !p.device.is_empty())
            .map(|p| {
                let label = p
                    .label
                    .as_deref()
                    .filter(|l| !l.is_empty())
                    .unwrap_or(&p.device);
                DetectedPort::new(&p.device, &p.role).with_original_label(label)
            })
            .collect()
    };

    ports.sort_by(|a, b| natural_cmp(&a.device, &b.device));
    debug!(count = ports.len(), "Detected ports");
    ports
}

fn board_ports(board_json: Option<&str>) -> Vec<DetectedPort> {
    let Some(text) = board_json else {
        return Vec::new();
    };

    let board: Value = match serde_json::from_str(text) {
        Ok(board) => board,
        Err(e) => {
            warn!("Ignoring unparsable board.json: {}", e);
            return Vec::new();
        }
    };

    let mut ports = Vec::new();
    for role in ["lan", "wan"] {
        let Some(section) = board.pointer(&format!("/network/{}", role)) else {
            continue;
        };

        if let Some(list) = section.get("ports").and_then(Value::as_array) {
            ports.extend(
                list.iter()
                    .filter_map(Value::as_str)
                    .filter(|d| !d.is_empty())
                    .map(|d| DetectedPort::new(d, role)),
            );
        } else if let Some(device) = section
            .get("device")
            .and_then(Value::as_str)
            .filter(|d| !d.is_empty())
        {
            ports.push(DetectedPort::new(device, role));
        }
    }
    ports
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn builtin(device: &str, role: &str, label: Option<&str>) -> BuiltinPort {
        BuiltinPort {
            device: device.to_string(),
            role: role.to_string(),
            label: label.map(str::to_string),
        }
    }

    #[test]
    fn test_builtin_ports_sorted_naturally() {
        let ports = detect_ports(
            &[
                builtin("lan10", "lan", None),
                builtin("lan2", "lan", Some("LAN 2")),
                builtin("wan", "wan", Some("")),
            ],
            None,
        );

        let devices: Vec<_> = ports.iter().map(|p| p.device.as_str()).collect();
        assert_eq!(devices, vec!["lan2", "lan10", "wan"]);
        assert_eq!(ports[0].original_label, "LAN 2");
        assert_eq!(ports[1].original_label, "lan10");
        assert_eq!(ports[2].original_label, "wan");
        assert_eq!(ports[2].role, "wan");
    }

    #[test]
    fn test_builtin_wins_over_board() {
        let board = r#"{"network":{"lan":{"ports":["eth9"]}}}"#;
        let ports = detect_ports(&[builtin("lan1", "lan", None)], Some(board));
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].device, "lan1");
    }

    #[test]
    fn test_board_fallback() {
        let board = r#"{
            "network": {
                "lan": { "ports": ["lan3", "lan1", "lan2"], "protocol": "static" },
                "wan": { "device": "eth1", "protocol": "dhcp" }
            }
        }"#;
        let ports = detect_ports(&[], Some(board));

        let devices: Vec<_> = ports.iter().map(|p| p.device.as_str()).collect();
        assert_eq!(devices, vec!["eth1", "lan1", "lan2", "lan3"]);
        assert_eq!(ports[0].role, "wan");
        assert_eq!(ports[1].role, "lan");
    }

    #[test]
    fn test_board_without_network() {
        assert!(detect_ports(&[], Some("{}")).is_empty());
        assert!(detect_ports(&[], Some("not json")).is_empty());
        assert!(detect_ports(&[], None).is_empty());
    }
}
