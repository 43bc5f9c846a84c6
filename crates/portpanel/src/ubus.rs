//! OpenWrt host access through the local file system and `ubus`.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use portpanel_common::shell::{self, ExecResult};
use portpanel_common::{
    BuiltinPort, HostFs, PanelError, PanelResult, PortCommand, PortRpc, SetStatusReply,
};
use portpanel_topology::sections::value_to_list;
use portpanel_topology::{DeviceStats, NetDevice, Network, NetworkHost, NetworkSections, Zone};

use crate::config::PanelConfig;

/// The device itself: files under `/etc`, utilities, `ubus` objects.
#[derive(Debug, Clone)]
pub struct UbusHost {
    ubus_cmd: String,
    swconfig_path: String,
}

impl UbusHost {
    pub fn new(config: &PanelConfig) -> Self {
        Self {
            ubus_cmd: config.commands.ubus.clone(),
            swconfig_path: config.commands.swconfig.clone(),
        }
    }

    /// `ubus call <object> <method> <args>`, parsed as JSON. An empty
    /// reply reads as `{}`.
    #[instrument(skip(self, args))]
    async fn call(&self, object: &str, method: &str, args: &Value) -> PanelResult<Value> {
        let payload = args.to_string();
        let stdout = shell::exec_or_throw(&self.ubus_cmd, &["call", object, method, &payload])
            .await
            .map_err(|e| match e {
                PanelError::ShellCommandFailed { output, .. } => {
                    PanelError::rpc(object, method, output)
                }
                other => other,
            })?;
        parse_reply(object, method, &stdout)
    }
}

fn parse_reply(object: &str, method: &str, stdout: &str) -> PanelResult<Value> {
    if stdout.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(stdout)
        .map_err(|e| PanelError::malformed_json(format!("ubus {} {}", object, method), e.to_string()))
}

#[async_trait]
impl HostFs for UbusHost {
    async fn read(&self, path: &str) -> PanelResult<Option<String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PanelError::io(path, e)),
        }
    }

    async fn write(&self, path: &str, data: &str) -> PanelResult<()> {
        tokio::fs::write(path, data)
            .await
            .map_err(|e| PanelError::io(path, e))
    }

    async fn exec(&self, program: &str, args: &[&str]) -> PanelResult<ExecResult> {
        shell::exec(program, args).await
    }
}

#[async_trait]
impl PortRpc for UbusHost {
    async fn builtin_ethernet_ports(&self) -> PanelResult<Vec<BuiltinPort>> {
        let reply = self.call("luci", "getBuiltinEthernetPorts", &json!({})).await?;
        Ok(parse_builtin_ports(&reply))
    }

    async fn ports_status(&self) -> PanelResult<HashMap<String, String>> {
        let reply = self.call("ports-status-mod", "getPortsStatus", &json!({})).await?;
        Ok(parse_ports_status(&reply))
    }

    async fn set_port_status(
        &self,
        port: &str,
        command: PortCommand,
    ) -> PanelResult<SetStatusReply> {
        let reply = self
            .call(
                "ports-status-mod",
                "setPortStatus",
                &json!({ "port": port, "status": command.as_str() }),
            )
            .await?;
        Ok(serde_json::from_value(reply).unwrap_or_default())
    }
}

#[async_trait]
impl NetworkHost for UbusHost {
    async fn zones(&self) -> PanelResult<Vec<Zone>> {
        let reply = self
            .call("uci", "get", &json!({ "config": "firewall", "type": "zone" }))
            .await?;
        Ok(parse_zones(&reply))
    }

    async fn networks(&self) -> PanelResult<Vec<Network>> {
        let reply = self.call("network.interface", "dump", &json!({})).await?;
        Ok(parse_interface_dump(&reply))
    }

    async fn network_sections(&self) -> PanelResult<NetworkSections> {
        let reply = self.call("uci", "get", &json!({ "config": "network" })).await?;
        Ok(NetworkSections::from_uci_json(&reply))
    }

    async fn device(&self, name: &str) -> PanelResult<NetDevice> {
        let reply = self
            .call("network.device", "status", &json!({ "name": name }))
            .await?;
        Ok(parse_device_status(name, &reply))
    }

    async fn has_swconfig(&self) -> bool {
        let present = tokio::fs::metadata(Path::new(&self.swconfig_path))
            .await
            .is_ok();
        debug!(present, "swconfig probe at {}", self.swconfig_path);
        present
    }
}

/// `{"result": [...]}` from `luci getBuiltinEthernetPorts`.
pub fn parse_builtin_ports(reply: &Value) -> Vec<BuiltinPort> {
    let Some(items) = reply.get("result").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let port = builtin_port(item);
            if port.is_none() {
                warn!("Skipping malformed builtin port entry: {}", item);
            }
            port
        })
        .collect()
}

fn builtin_port(value: &Value) -> Option<BuiltinPort> {
    let device = value.get("device")?.as_str()?.to_string();
    let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
    Some(BuiltinPort {
        device,
        role: text("role").unwrap_or_default(),
        label: text("label"),
    })
}

/// Device name to operstate.
pub fn parse_ports_status(reply: &Value) -> HashMap<String, String> {
    reply
        .as_object()
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

/// Firewall zones from `uci get firewall` (type zone), in config order.
pub fn parse_zones(reply: &Value) -> Vec<Zone> {
    let Some(values) = reply.get("values").and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut sections: Vec<(u64, &Value)> = values
        .values()
        .filter(|s| s.get(".type").and_then(Value::as_str).unwrap_or("zone") == "zone")
        .map(|s| (s.get(".index").and_then(Value::as_u64).unwrap_or(u64::MAX), s))
        .collect();
    sections.sort_by_key(|(index, _)| *index);

    sections
        .into_iter()
        .filter_map(|(_, s)| {
            let name = s.get("name").and_then(Value::as_str)?;
            let networks = s.get("network").map(value_to_list).unwrap_or_default();
            Some(Zone::new(name, networks))
        })
        .collect()
}

/// Logical networks from `network.interface dump`.
pub fn parse_interface_dump(reply: &Value) -> Vec<Network> {
    let Some(items) = reply.get("interface").and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let name = item.get("interface").and_then(Value::as_str)?;
            let device = ["l3_device", "device"]
                .iter()
                .find_map(|key| item.get(*key).and_then(Value::as_str))
                .filter(|d| !d.is_empty());
            Some(Network::new(name, device))
        })
        .collect()
}

/// Splits a netifd speed string (`"1000F"`, `"100H"`) into Mbit/s and
/// duplex.
pub fn parse_speed(raw: &str) -> (Option<u64>, Option<String>) {
    let (digits, duplex) = match raw.char_indices().last() {
        Some((i, 'F')) => (&raw[..i], Some("full")),
        Some((i, 'H')) => (&raw[..i], Some("half")),
        _ => (raw, None),
    };
    match digits.parse::<u64>() {
        Ok(speed) if speed > 0 => (Some(speed), duplex.map(str::to_string)),
        _ => (None, None),
    }
}

/// Live state from `network.device status`.
pub fn parse_device_status(name: &str, reply: &Value) -> NetDevice {
    let flag = |key: &str| reply.get(key).and_then(Value::as_bool).unwrap_or(false);
    let (speed, duplex) = reply
        .get("speed")
        .and_then(Value::as_str)
        .map(parse_speed)
        .unwrap_or((None, None));
    let stats = reply
        .get("statistics")
        .cloned()
        .and_then(|v| serde_json::from_value::<DeviceStats>(v).ok())
        .unwrap_or_default();

    NetDevice {
        name: name.to_string(),
        speed,
        duplex,
        carrier: flag("carrier"),
        up: flag("up"),
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_parse_builtin_ports() {
        let reply = json!({"result": [
            {"role": "lan", "device": "lan1", "netdev": "lan1", "label": "LAN 1"},
            {"role": "wan", "device": "wan"},
            {"role": "lan"}
        ]});
        let ports = parse_builtin_ports(&reply);
        assert_eq!(ports.len(), 2);
        assert_eq!(ports[0].label.as_deref(), Some("LAN 1"));
        assert_eq!(ports[1].role, "wan");
        assert!(parse_builtin_ports(&json!({})).is_empty());
    }

    #[test]
    fn test_parse_ports_status() {
        let status = parse_ports_status(&json!({"lan1": "active", "lan2": "disabled", "x": 1}));
        assert_eq!(status.len(), 2);
        assert_eq!(status["lan2"], "disabled");
    }

    #[test]
    fn test_parse_zones() {
        let reply = json!({"values": {
            "cfg03dc81": {".type": "zone", ".index": 2, "name": "wan", "network": ["wan", "wan6"]},
            "cfg02dc81": {".type": "zone", ".index": 1, "name": "lan", "network": "lan guest"},
            "cfg04dc81": {".type": "zone", ".index": 3}
        }});
        let zones = parse_zones(&reply);
        assert_eq!(zones, vec![
            Zone::new("lan", ["lan", "guest"]),
            Zone::new("wan", ["wan", "wan6"]),
        ]);
    }

    #[test]
    fn test_parse_interface_dump() {
        let reply = json!({"interface": [
            {"interface": "lan", "up": true, "l3_device": "br-lan", "device": "br-lan"},
            {"interface": "wan", "up": false, "device": "wan"},
            {"interface": "vpn", "up": false}
        ]});
        let networks = parse_interface_dump(&reply);
        assert_eq!(networks, vec![
            Network::new("lan", Some("br-lan")),
            Network::new("wan", Some("wan")),
            Network::new("vpn", None),
        ]);
    }

    #[test]
    fn test_parse_speed() {
        assert_eq!(parse_speed("1000F"), (Some(1000), Some("full".to_string())));
        assert_eq!(parse_speed("100H"), (Some(100), Some("half".to_string())));
        assert_eq!(parse_speed("2500"), (Some(2500), None));
        assert_eq!(parse_speed("-1"), (None, None));
        assert_eq!(parse_speed(""), (None, None));
    }

    #[test]
    fn test_parse_device_status() {
        let reply = json!({
            "external": false, "present": true, "type": "Network device",
            "up": true, "carrier": true, "speed": "1000F",
            "statistics": {"rx_bytes": 2048, "tx_bytes": 1024, "collisions": 0}
        });
        let dev = parse_device_status("lan1", &reply);
        assert_eq!(dev.speed, Some(1000));
        assert_eq!(dev.duplex.as_deref(), Some("full"));
        assert!(dev.carrier && dev.up);
        assert_eq!(dev.stats.rx_bytes, 2048);

        let dev = parse_device_status("lan2", &json!({}));
        assert_eq!(dev, NetDevice::offline("lan2"));
    }

    #[test]
    fn test_parse_reply_empty_and_malformed() {
        assert_eq!(parse_reply("uci", "get", "  ").unwrap(), json!({}));
        assert!(matches!(
            parse_reply("uci", "get", "{oops"),
            Err(PanelError::MalformedJson { .. })
        ));
    }

    #[tokio::test]
    async fn test_file_access() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user_defined_ports.json");
        let path = path.to_str().unwrap();
        let host = UbusHost::new(&PanelConfig::default());

        assert_eq!(host.read(path).await.unwrap(), None);
        host.write(path, "[]").await.unwrap();
        assert_eq!(host.read(path).await.unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_swconfig_probe() {
        let dir = TempDir::new().unwrap();
        let mut config = PanelConfig::default();
        config.commands.swconfig = dir.path().join("swconfig").display().to_string();
        let host = UbusHost::new(&config);
        assert!(!host.has_swconfig().await);

        std::fs::write(dir.path().join("swconfig"), "").unwrap();
        assert!(host.has_swconfig().await);
    }
}
