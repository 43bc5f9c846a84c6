//! Text rendering of port boxes.

use std::fmt::Write as _;

use portpanel_store::{MergedPort, Operstate, StatusTable};
use portpanel_topology::{DeviceStats, NetDevice, PortAssociation, PortTopology};

/// Narrow no-break space between value and unit.
const NNBSP: char = '\u{202f}';

/// Link speed text. `speed` is in Mbit/s.
pub fn format_speed(carrier: bool, speed: Option<u64>, duplex: Option<&str>) -> String {
    let Some(speed) = speed.filter(|s| *s > 0) else {
        return if carrier { "Connected" } else { "no link" }.to_string();
    };

    let half = if duplex == Some("half") {
        format!("{}(H)", NNBSP)
    } else {
        String::new()
    };

    match speed {
        s if s < 1000 => format!("{}{}M{}", s, NNBSP, half),
        1000 => format!("1{}GbE{}", NNBSP, half),
        s if (1_000_000..1_000_000_000).contains(&s) => {
            format!("{}{}TbE", s as f64 / 1e6, NNBSP)
        }
        s if s >= 1_000_000_000 => format!("{}{}PbE", s as f64 / 1e9, NNBSP),
        s => format!("{}{}GbE", s as f64 / 1000.0, NNBSP),
    }
}

/// Scales `value` by `base` into ` K`, ` M`, ... with `precision`
/// decimals; values not above `base` print unscaled followed by a space.
pub fn format_scaled(value: u64, base: u64, precision: usize, suffix: &str) -> String {
    const UNITS: [&str; 7] = [" ", " K", " M", " G", " T", " P", " E"];

    let mut scaled = value as f64;
    let mut unit = 0;
    while unit < UNITS.len() && scaled > base as f64 {
        scaled /= base as f64;
        unit += 1;
    }

    if unit == 0 {
        return format!("{} {}", value, suffix);
    }

    let binary = if base == 1024 { "i" } else { "" };
    let unit = UNITS.get(unit).copied().unwrap_or(" E");
    format!("{:.*}{}{}{}", precision, scaled, unit, binary, suffix)
}

pub fn format_bytes(value: u64) -> String {
    format_scaled(value, 1024, 2, "B")
}

pub fn format_packets(value: u64) -> String {
    format_scaled(value, 1000, 2, "Pkts.")
}

/// Transmit counter shown under the port box.
pub fn format_tx_summary(stats: &DeviceStats) -> String {
    format!("\u{25b2}{}{}", NNBSP, format_scaled(stats.tx_bytes, 1024, 1, "B"))
}

/// Receive counter shown under the port box.
pub fn format_rx_summary(stats: &DeviceStats) -> String {
    format!("\u{25bc}{}{}", NNBSP, format_scaled(stats.rx_bytes, 1024, 1, "B"))
}

/// Labelled traffic counters of a device.
pub fn format_stats(stats: &DeviceStats) -> Vec<(&'static str, String)> {
    vec![
        ("Received bytes", format_bytes(stats.rx_bytes)),
        ("Received packets", format_packets(stats.rx_packets)),
        ("Received multicast", format_packets(stats.multicast)),
        ("Receive errors", format_packets(stats.rx_errors)),
        ("Receive dropped", format_packets(stats.rx_dropped)),
        ("Transmitted bytes", format_bytes(stats.tx_bytes)),
        ("Transmitted packets", format_packets(stats.tx_packets)),
        ("Transmit errors", format_packets(stats.tx_errors)),
        ("Transmit dropped", format_packets(stats.tx_dropped)),
        ("Collisions seen", stats.collisions.to_string()),
    ]
}

/// Networks a port belongs to, one line per network with its zone.
pub fn network_tooltip(assoc: Option<&PortAssociation>) -> String {
    let networks = assoc.map(|a| a.networks.as_slice()).unwrap_or_default();
    if networks.is_empty() {
        return "Port is not part of any network".to_string();
    }

    let mut text = if networks.len() == 1 {
        "Part of network:".to_string()
    } else {
        "Part of networks:".to_string()
    };

    for network in networks {
        let zone = assoc
            .and_then(|a| a.zone_for_network(&network.name))
            .map_or_else(|| "no zone".to_string(), |z| format!("zone {}", z));
        let device = network.device.as_deref().unwrap_or("(no interfaces attached)");
        let _ = write!(text, "\n  {} [{}]: {}", network.name, zone, device);
    }
    text
}

/// Zone names of a port in natural order; empty when it has none.
pub fn zone_names(assoc: Option<&PortAssociation>) -> Vec<String> {
    assoc
        .map(|a| a.sorted_zones().iter().map(|z| z.name.clone()).collect())
        .unwrap_or_default()
}

/// Everything displayed for one port box.
#[derive(Debug, Clone, PartialEq)]
pub struct PortRow {
    pub device: String,
    pub label: String,
    pub description: String,
    pub operstate: Operstate,
    pub carrier: bool,
    pub speed: String,
    pub zones: Vec<String>,
    pub tooltip: String,
    pub stats: Vec<(&'static str, String)>,
    /// `▲ 1.5 MiB` style transmit counter.
    pub tx_summary: String,
    /// `▼ 1.5 MiB` style receive counter.
    pub rx_summary: String,
}

impl PortRow {
    pub fn build(port: &MergedPort, topology: &PortTopology, status: &StatusTable) -> Self {
        let offline = NetDevice::offline(&port.device);
        let netdev = port.netdev.as_ref().unwrap_or(&offline);
        let assoc = topology.get(&netdev.name);

        Self {
            device: port.device.clone(),
            label: port.display_label().to_string(),
            description: port.description.clone(),
            operstate: status.operstate(&port.device),
            carrier: netdev.carrier,
            speed: format_speed(netdev.carrier, netdev.speed, netdev.duplex.as_deref()),
            zones: zone_names(assoc),
            tooltip: network_tooltip(assoc),
            stats: format_stats(&netdev.stats),
            tx_summary: format_tx_summary(&netdev.stats),
            rx_summary: format_rx_summary(&netdev.stats),
        }
    }

    /// One-line summary.
    pub fn summary(&self) -> String {
        let zones = if self.zones.is_empty() {
            "-".to_string()
        } else {
            self.zones.join(",")
        };
        let mut line = format!(
            "{:<10} {:<10} {:<9} {:<12} {}",
            self.device,
            self.label,
            self.operstate.text(),
            self.speed,
            zones
        );
        if !self.description.is_empty() {
            let _ = write!(line, "  ({})", self.description);
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portpanel_topology::{Network, Zone};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_speed() {
        assert_eq!(format_speed(true, Some(100), Some("full")), "100\u{202f}M");
        assert_eq!(format_speed(true, Some(10), Some("half")), "10\u{202f}M\u{202f}(H)");
        assert_eq!(format_speed(true, Some(1000), Some("half")), "1\u{202f}GbE\u{202f}(H)");
        assert_eq!(format_speed(true, Some(2500), None), "2.5\u{202f}GbE");
        assert_eq!(format_speed(true, Some(10000), None), "10\u{202f}GbE");
        assert_eq!(format_speed(true, Some(2_000_000), None), "2\u{202f}TbE");
        assert_eq!(format_speed(true, Some(1_000_000_000), None), "1\u{202f}PbE");
    }

    #[test]
    fn test_format_speed_no_speed() {
        assert_eq!(format_speed(true, None, None), "Connected");
        assert_eq!(format_speed(false, None, None), "no link");
        assert_eq!(format_speed(false, Some(0), Some("full")), "no link");
    }

    #[test]
    fn test_format_scaled() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1024 B");
        assert_eq!(format_bytes(1_572_864), "1.50 MiB");
        assert_eq!(format_packets(1500), "1.50 KPkts.");
        assert_eq!(format_packets(0), "0 Pkts.");
    }

    #[test]
    fn test_traffic_summary_one_decimal() {
        let stats = DeviceStats {
            rx_bytes: 1_572_864,
            tx_bytes: 4096,
            ..DeviceStats::default()
        };
        assert_eq!(format_tx_summary(&stats), "\u{25b2}\u{202f}4.0 KiB");
        assert_eq!(format_rx_summary(&stats), "\u{25bc}\u{202f}1.5 MiB");
        assert_eq!(format_tx_summary(&DeviceStats::default()), "\u{25b2}\u{202f}0 B");
    }

    #[test]
    fn test_tooltip() {
        assert_eq!(network_tooltip(None), "Port is not part of any network");

        let assoc = PortAssociation {
            networks: vec![Network::new("lan", Some("br-lan"))],
            zones: vec![Zone::new("lan", ["lan"])],
        };
        assert_eq!(
            network_tooltip(Some(&assoc)),
            "Part of network:\n  lan [zone lan]: br-lan"
        );

        let assoc = PortAssociation {
            networks: vec![Network::new("wan", Some("wan")), Network::new("wan6", None)],
            zones: vec![],
        };
        let text = network_tooltip(Some(&assoc));
        assert!(text.starts_with("Part of networks:"));
        assert!(text.contains("wan6 [no zone]: (no interfaces attached)"));
    }

    #[test]
    fn test_zone_names_sorted() {
        let assoc = PortAssociation {
            networks: vec![],
            zones: vec![Zone::new("lan10", ["a"]), Zone::new("lan2", ["b"])],
        };
        assert_eq!(zone_names(Some(&assoc)), vec!["lan2", "lan10"]);
        assert!(zone_names(None).is_empty());
    }
}
