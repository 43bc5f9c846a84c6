//! Bridge/VLAN topology resolution for the port status panel.
//!
//! Turns OpenWrt `network` configuration into "which logical networks and
//! firewall zones use this physical port".
//!
//! | Step | Input | Output |
//! |------|-------|--------|
//! | [`resolve`] | `bridge-vlan`, `device`, `interface` sections | [`VlanMapping`] |
//! | [`PortTopology::build`] | zones, networks, [`VlanMapping`] | [`PortTopology`] |
//!
//! Both steps are pure: no I/O, no mutation of their inputs.

mod host;
mod model;
pub mod sections;
mod topology;
pub mod vlan;

pub use host::NetworkHost;
pub use model::{DeviceStats, NetDevice, Network, Zone};
pub use sections::{BridgeVlanSection, DeviceSection, InterfaceSection, NetworkSections};
pub use topology::{PortAssociation, PortTopology};
pub use vlan::{resolve, BridgeRecord, VlanMapping};
