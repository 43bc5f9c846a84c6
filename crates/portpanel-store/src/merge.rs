//! Combining detected ports with user overrides.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use portpanel_common::PanelResult;
use portpanel_topology::NetDevice;

use crate::inventory::DetectedPort;
use crate::record::{UserConfig, UserPortRecord};

/// A detected port as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedPort {
    pub device: String,
    pub role: String,
    pub netdev: Option<NetDevice>,
    pub label: String,
    pub original_label: String,
    pub description: String,
}

impl MergedPort {
    /// The persisted form of this port.
    pub fn to_record(&self) -> UserPortRecord {
        UserPortRecord::new(&self.device)
            .with_label(&self.label)
            .with_role(&self.role)
            .with_original_label(&self.original_label)
            .with_description(&self.description)
    }

    /// Label to display, falling back to the device name.
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.device
        } else {
            &self.label
        }
    }

    fn from_detected(detected: &DetectedPort) -> Self {
        let original_label = if detected.original_label.is_empty() {
            detected.device.clone()
        } else {
            detected.original_label.clone()
        };

        Self {
            device: detected.device.clone(),
            role: detected.role.clone(),
            netdev: detected.netdev.clone(),
            label: detected.device.clone(),
            original_label,
            description: String::new(),
        }
    }
}

/// Builds the displayed port list.
///
/// Without a user config this is the detected list with default labels.
/// Otherwise user order comes first, for devices still detected, followed
/// by newly detected ports in detection order. Every detected device
/// appears exactly once; user entries for vanished devices are dropped.
pub fn merge(detected: &[DetectedPort], user: Option<&UserConfig>) -> Vec<MergedPort> {
    let Some(user) = user else {
        return detected.iter().map(MergedPort::from_detected).collect();
    };

    let mut merged = Vec::with_capacity(detected.len());
    let mut added: HashSet<&str> = HashSet::new();

    for record in user.records() {
        let Some(port) = detected.iter().find(|p| p.device == record.device) else {
            info!(device = %record.device, "Dropping override for port no longer detected");
            continue;
        };
        if !added.insert(port.device.as_str()) {
            warn!(device = %record.device, "Ignoring duplicate override entry");
            continue;
        }

        let or_device = |s: &str| {
            if s.is_empty() {
                port.device.clone()
            } else {
                s.to_string()
            }
        };

        merged.push(MergedPort {
            device: port.device.clone(),
            role: port.role.clone(),
            netdev: port.netdev.clone(),
            label: or_device(&record.label),
            original_label: or_device(&record.original_label),
            description: record.description.clone(),
        });
    }

    for port in detected {
        if added.insert(port.device.as_str()) {
            debug!(device = %port.device, "Appending newly detected port");
            merged.push(MergedPort::from_detected(port));
        }
    }

    merged
}

/// Seed configuration written on first run: one record per detected port.
pub fn initial_config(detected: &[DetectedPort]) -> PanelResult<UserConfig> {
    let records = detected
        .iter()
        .map(|p| MergedPort::from_detected(p).to_record())
        .collect();
    UserConfig::new(records)
}

/// Records for a list of merged ports, in display order.
pub fn to_records(ports: &[MergedPort]) -> Vec<UserPortRecord> {
    ports.iter().map(MergedPort::to_record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn detected() -> Vec<DetectedPort> {
        vec![
            DetectedPort::new("lan1", "lan").with_original_label("LAN1"),
            DetectedPort::new("lan2", "lan"),
            DetectedPort::new("wan", "wan").with_original_label("WAN"),
        ]
    }

    fn devices(ports: &[MergedPort]) -> Vec<&str> {
        ports.iter().map(|p| p.device.as_str()).collect()
    }

    #[test]
    fn test_no_user_config() {
        let merged = merge(&detected(), None);
        assert_eq!(devices(&merged), vec!["lan1", "lan2", "wan"]);
        assert_eq!(merged[0].label, "lan1");
        assert_eq!(merged[0].original_label, "LAN1");
        assert_eq!(merged[1].original_label, "lan2");
        assert!(merged.iter().all(|p| p.description.is_empty()));
    }

    #[test]
    fn test_user_order_then_new_ports() {
        let user = UserConfig::new(vec![
            UserPortRecord::new("wan").with_label("Internet"),
            UserPortRecord::new("gone").with_label("Old"),
            UserPortRecord::new("lan2")
                .with_original_label("Port 2")
                .with_description("printer"),
        ])
        .unwrap();

        let merged = merge(&detected(), Some(&user));
        assert_eq!(devices(&merged), vec!["wan", "lan2", "lan1"]);

        assert_eq!(merged[0].label, "Internet");
        assert_eq!(merged[0].original_label, "wan");
        assert_eq!(merged[0].role, "wan");

        assert_eq!(merged[1].label, "lan2");
        assert_eq!(merged[1].original_label, "Port 2");
        assert_eq!(merged[1].description, "printer");

        assert_eq!(merged[2].original_label, "LAN1");
    }

    #[test]
    fn test_every_detected_port_once() {
        let user = UserConfig::new(vec![
            UserPortRecord::new("lan1"),
            UserPortRecord::new("lan1").with_label("dup"),
        ])
        .unwrap();

        let merged = merge(&detected(), Some(&user));
        assert_eq!(devices(&merged), vec!["lan1", "lan2", "wan"]);
        assert_eq!(merged[0].label, "lan1");
    }

    #[test]
    fn test_role_comes_from_detection() {
        let user = UserConfig::new(vec![UserPortRecord::new("lan1").with_role("wan")]).unwrap();
        let merged = merge(&detected(), Some(&user));
        assert_eq!(merged[0].role, "lan");
    }

    #[test]
    fn test_initial_config() {
        let config = initial_config(&detected()).unwrap();
        let first = &config.records()[0];
        assert_eq!(first.label, "lan1");
        assert_eq!(first.original_label, "LAN1");
        assert_eq!(first.role, "lan");
        assert!(initial_config(&[]).is_err());
    }

    #[test]
    fn test_to_record() {
        let merged = merge(&detected(), None);
        let records = to_records(&merged);
        assert_eq!(records[2], UserPortRecord {
            device: "wan".into(),
            label: "wan".into(),
            role: "wan".into(),
            original_label: "WAN".into(),
            description: String::new(),
        });
    }
}
