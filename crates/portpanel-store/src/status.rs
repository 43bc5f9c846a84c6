//! Per-port administrative state kept beside the merged port list.

use std::collections::HashMap;
use std::fmt;

use crate::merge::MergedPort;

/// Port state as reported by the port status service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Operstate {
    Disabled,
    Down,
    Idle,
    Active,
    #[default]
    Unknown,
}

impl Operstate {
    pub fn parse(s: &str) -> Self {
        match s {
            "disabled" => Self::Disabled,
            "down" => Self::Down,
            "idle" => Self::Idle,
            "active" => Self::Active,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Down => "down",
            Self::Idle => "idle",
            Self::Active => "active",
            Self::Unknown => "unknown",
        }
    }

    /// Anything but `disabled` counts as administratively enabled.
    pub fn is_enabled(&self) -> bool {
        *self != Self::Disabled
    }

    pub fn text(&self) -> &'static str {
        match self {
            Self::Disabled => "Disabled",
            Self::Down => "Down",
            Self::Idle => "Idle",
            Self::Active => "Active",
            Self::Unknown => "Unknown",
        }
    }

    /// Indicator colour.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Disabled => "#FF204E",
            Self::Down => "#ccc",
            Self::Idle => "#FFA500",
            Self::Active => "#39FF13",
            Self::Unknown => "#ccc",
        }
    }

    pub fn blinks(&self) -> bool {
        *self == Self::Active
    }
}

impl fmt::Display for Operstate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime status of one port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PortRuntimeStatus {
    pub operstate: Operstate,
    /// State observed when the edit dialog was opened.
    pub current_operstate: Operstate,
    /// Only LAN ports (present in the status service report) can be
    /// enabled or disabled.
    pub is_lan_port: bool,
}

/// Key used by the status service: the device name up to the first `@`.
pub fn status_key(device: &str) -> &str {
    device.split('@').next().unwrap_or(device)
}

/// Side table from device name to [`PortRuntimeStatus`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusTable {
    entries: HashMap<String, PortRuntimeStatus>,
}

impl StatusTable {
    /// Builds entries for `ports` from the status service report. Ports the
    /// report does not mention are unknown and not switchable.
    pub fn from_report(ports: &[MergedPort], report: &HashMap<String, String>) -> Self {
        let entries = ports
            .iter()
            .map(|port| {
                let reported = report.get(status_key(&port.device));
                let operstate = reported.map_or(Operstate::Unknown, |s| Operstate::parse(s));
                let status = PortRuntimeStatus {
                    operstate,
                    current_operstate: operstate,
                    is_lan_port: reported.is_some(),
                };
                (port.device.clone(), status)
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, device: &str) -> Option<&PortRuntimeStatus> {
        self.entries.get(device)
    }

    pub fn operstate(&self, device: &str) -> Operstate {
        self.get(device).map_or(Operstate::Unknown, |s| s.operstate)
    }

    pub fn is_lan_port(&self, device: &str) -> bool {
        self.get(device).is_some_and(|s| s.is_lan_port)
    }

    /// Records a state change applied by the user.
    pub fn set_operstate(&mut self, device: &str, operstate: Operstate) {
        let entry = self.entries.entry(device.to_string()).or_default();
        entry.operstate = operstate;
        entry.current_operstate = operstate;
    }

    /// Refreshes from a new report, keeping the LAN flag of known ports.
    pub fn update(&mut self, report: &HashMap<String, String>) {
        for (device, status) in self.entries.iter_mut() {
            if let Some(state) = report.get(status_key(device)) {
                status.operstate = Operstate::parse(state);
                status.current_operstate = status.operstate;
                status.is_lan_port = true;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::DetectedPort;
    use crate::merge::merge;

    fn report(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_status_key() {
        assert_eq!(status_key("lan1@eth0"), "lan1");
        assert_eq!(status_key("lan1"), "lan1");
        assert_eq!(status_key(""), "");
    }

    #[test]
    fn test_operstate_parse() {
        assert_eq!(Operstate::parse("active"), Operstate::Active);
        assert_eq!(Operstate::parse("bogus"), Operstate::Unknown);
        assert!(!Operstate::Disabled.is_enabled());
        assert!(Operstate::Down.is_enabled());
        assert!(Operstate::Active.blinks());
        assert_eq!(Operstate::Disabled.color(), "#FF204E");
    }

    #[test]
    fn test_table_from_report() {
        let ports = merge(
            &[
                DetectedPort::new("lan1@eth0", "lan"),
                DetectedPort::new("wan", "wan"),
            ],
            None,
        );
        let table = StatusTable::from_report(&ports, &report(&[("lan1", "disabled")]));

        assert_eq!(table.operstate("lan1@eth0"), Operstate::Disabled);
        assert!(table.is_lan_port("lan1@eth0"));
        assert_eq!(table.operstate("wan"), Operstate::Unknown);
        assert!(!table.is_lan_port("wan"));
        assert!(!table.is_lan_port("missing"));
    }

    #[test]
    fn test_set_and_update() {
        let ports = merge(&[DetectedPort::new("lan1", "lan")], None);
        let mut table = StatusTable::from_report(&ports, &report(&[("lan1", "active")]));

        table.set_operstate("lan1", Operstate::Disabled);
        assert_eq!(table.get("lan1").unwrap().current_operstate, Operstate::Disabled);

        table.update(&report(&[("lan1", "idle")]));
        assert_eq!(table.operstate("lan1"), Operstate::Idle);
        assert!(table.is_lan_port("lan1"));
    }
}
