//! Physical port → logical networks and firewall zones.

use std::collections::HashMap;

use portpanel_common::natural_cmp;
use tracing::debug;

use crate::model::{Network, Zone};
use crate::vlan::VlanMapping;

/// Networks and zones using one physical port.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortAssociation {
    pub networks: Vec<Network>,
    pub zones: Vec<Zone>,
}

impl PortAssociation {
    /// Zones sorted by name in natural order.
    pub fn sorted_zones(&self) -> Vec<&Zone> {
        let mut zones: Vec<&Zone> = self.zones.iter().collect();
        zones.sort_by(|a, b| natural_cmp(&a.name, &b.name));
        zones
    }

    /// Name of the zone covering `network`, among this port's zones.
    /// When several zones list the network the last one in natural order
    /// wins.
    pub fn zone_for_network(&self, network: &str) -> Option<&str> {
        self.sorted_zones()
            .into_iter()
            .rev()
            .find(|z| z.networks.iter().any(|n| n == network))
            .map(|z| z.name.as_str())
    }
}

/// Mapping from physical port name to its [`PortAssociation`].
///
/// Ports that no network reaches are absent; callers treat a missing
/// key as "no networks, no zones".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortTopology {
    ports: HashMap<String, PortAssociation>,
}

impl PortTopology {
    /// Records every network against the leaf ports of its layer-3 device,
    /// then every zone against the leaf ports of the networks it lists.
    pub fn build(zones: &[Zone], networks: &[Network], mapping: &VlanMapping) -> Self {
        let mut ports: HashMap<String, PortAssociation> = HashMap::new();
        let mut by_name: HashMap<&str, &Network> = HashMap::new();

        for network in networks {
            let Some(l3dev) = network.device.as_deref().filter(|d| !d.is_empty()) else {
                continue;
            };

            for port in mapping.resolve_ports(l3dev) {
                ports
                    .entry(port)
                    .or_default()
                    .networks
                    .push(network.clone());
            }
            by_name.insert(network.name.as_str(), network);
        }

        for zone in zones {
            for network_name in &zone.networks {
                let Some(network) = by_name.get(network_name.as_str()) else {
                    continue;
                };
                let Some(l3dev) = network.device.as_deref() else {
                    continue;
                };

                for port in mapping.resolve_ports(l3dev) {
                    let entry = ports.entry(port).or_default();
                    if !entry.zones.iter().any(|z| z.name == zone.name) {
                        entry.zones.push(zone.clone());
                    }
                }
            }
        }

        debug!(ports = ports.len(), "Built port topology");
        Self { ports }
    }

    pub fn get(&self, port: &str) -> Option<&PortAssociation> {
        self.ports.get(port)
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}
