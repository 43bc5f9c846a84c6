//! Fake network and port RPC hosts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use portpanel_common::{
    BuiltinPort, PanelError, PanelResult, PortCommand, PortRpc, SetStatusReply,
};
use portpanel_topology::{NetDevice, Network, NetworkHost, NetworkSections, Zone};

/// A [`NetworkHost`] answering from fixed data.
#[derive(Debug, Default)]
pub struct FakeNetworkHost {
    zones: Vec<Zone>,
    networks: Vec<Network>,
    sections: NetworkSections,
    devices: HashMap<String, NetDevice>,
    swconfig: bool,
}

impl FakeNetworkHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_zone(mut self, zone: Zone) -> Self {
        self.zones.push(zone);
        self
    }

    pub fn with_network(mut self, network: Network) -> Self {
        self.networks.push(network);
        self
    }

    pub fn with_sections(mut self, sections: NetworkSections) -> Self {
        self.sections = sections;
        self
    }

    pub fn with_device(mut self, device: NetDevice) -> Self {
        self.devices.insert(device.name.clone(), device);
        self
    }

    pub fn with_swconfig(mut self) -> Self {
        self.swconfig = true;
        self
    }
}

#[async_trait]
impl NetworkHost for FakeNetworkHost {
    async fn zones(&self) -> PanelResult<Vec<Zone>> {
        Ok(self.zones.clone())
    }

    async fn networks(&self) -> PanelResult<Vec<Network>> {
        Ok(self.networks.clone())
    }

    async fn network_sections(&self) -> PanelResult<NetworkSections> {
        Ok(self.sections.clone())
    }

    async fn device(&self, name: &str) -> PanelResult<NetDevice> {
        Ok(self
            .devices
            .get(name)
            .cloned()
            .unwrap_or_else(|| NetDevice::offline(name)))
    }

    async fn has_swconfig(&self) -> bool {
        self.swconfig
    }
}

/// A [`PortRpc`] with an in-memory status table.
///
/// A successful state change updates the reported operstate to `idle`
/// (enable) or `disabled` (disable).
#[derive(Debug, Default)]
pub struct FakePortRpc {
    builtin: Vec<BuiltinPort>,
    status: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<(String, PortCommand)>>,
    refuse: AtomicBool,
    unreachable: AtomicBool,
}

impl FakePortRpc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin(mut self, device: &str, role: &str, label: Option<&str>) -> Self {
        self.builtin.push(BuiltinPort {
            device: device.to_string(),
            role: role.to_string(),
            label: label.map(str::to_string),
        });
        self
    }

    pub fn with_status(self, port: &str, operstate: &str) -> Self {
        self.status
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(port.to_string(), operstate.to_string());
        self
    }

    /// State changes report `success: false` from now on.
    pub fn refuse_changes(&self) {
        self.refuse.store(true, Ordering::SeqCst);
    }

    /// Every call fails with an RPC error from now on.
    pub fn go_offline(&self) {
        self.unreachable.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(String, PortCommand)> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn check_online(&self, method: &str) -> PanelResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(PanelError::rpc("ports-status-mod", method, "Connection failed"));
        }
        Ok(())
    }
}

#[async_trait]
impl PortRpc for FakePortRpc {
    async fn builtin_ethernet_ports(&self) -> PanelResult<Vec<BuiltinPort>> {
        self.check_online("getBuiltinEthernetPorts")?;
        Ok(self.builtin.clone())
    }

    async fn ports_status(&self) -> PanelResult<HashMap<String, String>> {
        self.check_online("getPortsStatus")?;
        Ok(self.status.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn set_port_status(
        &self,
        port: &str,
        command: PortCommand,
    ) -> PanelResult<SetStatusReply> {
        self.check_online("setPortStatus")?;
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((port.to_string(), command));

        if self.refuse.load(Ordering::SeqCst) {
            return Ok(SetStatusReply { success: false });
        }

        let operstate = match command {
            PortCommand::Up => "idle",
            PortCommand::Down => "disabled",
        };
        self.status
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(port.to_string(), operstate.to_string());
        Ok(SetStatusReply { success: true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_fake_port_rpc_state_change() {
        let rpc = FakePortRpc::new().with_status("lan1", "active");
        let reply = rpc.set_port_status("lan1", PortCommand::Down).await.unwrap();
        assert!(reply.success);
        assert_eq!(rpc.ports_status().await.unwrap()["lan1"], "disabled");
        assert_eq!(rpc.calls(), vec![("lan1".to_string(), PortCommand::Down)]);

        rpc.refuse_changes();
        let reply = rpc.set_port_status("lan1", PortCommand::Up).await.unwrap();
        assert!(!reply.success);

        rpc.go_offline();
        assert!(rpc.ports_status().await.is_err());
    }

    #[test]
    fn test_fake_network_unknown_device_offline() {
        let host = FakeNetworkHost::new();
        let dev = tokio_test::block_on(host.device("lan9")).unwrap();
        assert_eq!(dev.name, "lan9");
        assert!(!dev.carrier);
        assert!(!tokio_test::block_on(host.has_swconfig()));
    }
}
