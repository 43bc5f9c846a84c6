//! Network and firewall capability supplied by the host.

use async_trait::async_trait;
use portpanel_common::PanelResult;

use crate::model::{NetDevice, Network, Zone};
use crate::sections::NetworkSections;

/// Read access to the device's network and firewall state.
#[async_trait]
pub trait NetworkHost: Send + Sync {
    /// Firewall zones.
    async fn zones(&self) -> PanelResult<Vec<Zone>>;

    /// Logical networks with their layer-3 devices.
    async fn networks(&self) -> PanelResult<Vec<Network>>;

    /// Raw `network` config sections.
    async fn network_sections(&self) -> PanelResult<NetworkSections>;

    /// Live state of one device.
    async fn device(&self, name: &str) -> PanelResult<NetDevice>;

    /// True on boards with a legacy swconfig switch.
    async fn has_swconfig(&self) -> bool;
}
