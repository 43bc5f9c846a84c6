//! Logical networks, firewall zones and live network devices.
//!
//! These are snapshots of objects owned by the host's network and firewall
//! subsystems. The topology map references them, it never mutates them.

use serde::{Deserialize, Serialize};

/// A logical network (UCI `interface`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    /// Interface name (e.g. "lan").
    pub name: String,
    /// Bound layer-3 device, if the interface is up or configured with one.
    pub device: Option<String>,
}

impl Network {
    pub fn new(name: impl Into<String>, device: Option<&str>) -> Self {
        Self {
            name: name.into(),
            device: device.map(str::to_string),
        }
    }
}

/// A firewall zone grouping logical networks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    /// Names of the networks covered by the zone.
    pub networks: Vec<String>,
}

impl Zone {
    pub fn new<I, S>(name: impl Into<String>, networks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            networks: networks.into_iter().map(Into::into).collect(),
        }
    }
}

/// Interface counters of a network device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceStats {
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub multicast: u64,
    pub rx_errors: u64,
    pub rx_dropped: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub tx_errors: u64,
    pub tx_dropped: u64,
    pub collisions: u64,
}

/// Live state of a network device, as instantiated by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetDevice {
    pub name: String,
    /// Link speed in Mbit/s, when negotiated.
    pub speed: Option<u64>,
    /// "full" or "half".
    pub duplex: Option<String>,
    pub carrier: bool,
    pub up: bool,
    pub stats: DeviceStats,
}

impl NetDevice {
    /// A device with no link and zeroed counters.
    pub fn offline(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
