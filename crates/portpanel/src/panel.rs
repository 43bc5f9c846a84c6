//! The port panel session.
//!
//! [`PortPanel::load`] gathers everything the panel shows: detected ports,
//! their live device state, the network topology, the user overrides and
//! the administrative status of each port. The editing operations then
//! work against that snapshot and persist through the [`OverrideStore`].

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use portpanel_common::{
    HostFs, Level, Notifier, PanelError, PanelResult, PortCommand, PortRpc, RefreshControl,
    SetStatusReply,
};
use portpanel_store::{
    detect_ports, initial_config, merge, status_key, to_records, DetectedPort, MergedPort,
    Operstate, OverrideStore, RestoreOutcome, StatusTable, UserConfig,
};
use portpanel_topology::{resolve, NetworkHost, PortTopology};

use crate::config::PanelConfig;
use crate::refresh::PauseGuard;
use crate::render::PortRow;

/// Host capabilities the panel runs against.
#[derive(Clone)]
pub struct PanelHost {
    pub fs: Arc<dyn HostFs>,
    pub rpc: Arc<dyn PortRpc>,
    pub network: Arc<dyn NetworkHost>,
    pub notifier: Arc<dyn Notifier>,
    pub refresh: Arc<dyn RefreshControl>,
}

/// New values from the edit dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditRequest {
    pub label: String,
    pub description: String,
    /// Desired administrative state; `None` leaves it alone.
    pub enabled: Option<bool>,
}

/// Result of a state change requested alongside an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    Applied(Operstate),
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub label: String,
    pub description: String,
    /// `None` when no state change was needed or possible.
    pub status_change: Option<StatusChange>,
}

#[derive(Debug, Clone, Default)]
struct PanelView {
    ports: Vec<MergedPort>,
    topology: PortTopology,
    status: StatusTable,
}

pub struct PortPanel {
    host: PanelHost,
    config: PanelConfig,
    store: OverrideStore,
    view: Option<PanelView>,
}

impl PortPanel {
    pub fn new(host: PanelHost, config: PanelConfig) -> Self {
        let store = OverrideStore::new(
            host.fs.clone(),
            host.notifier.clone(),
            config.store_settings(),
        );
        Self {
            host,
            config,
            store,
            view: None,
        }
    }

    pub fn store(&self) -> &OverrideStore {
        &self.store
    }

    /// Loads the panel. Returns `false` when nothing is shown (legacy
    /// swconfig boards).
    #[instrument(skip(self))]
    pub async fn load(&mut self) -> PanelResult<bool> {
        if self.host.network.has_swconfig().await {
            info!("swconfig switch present, port panel disabled");
            self.view = None;
            return Ok(false);
        }

        let detected = self.detect().await;

        let zones = self.host.network.zones().await?;
        let networks = self.host.network.networks().await?;
        let sections = self.host.network.network_sections().await?;
        let mapping = resolve(&sections.bridge_vlans, &sections.devices, &sections.interfaces);
        let topology = PortTopology::build(&zones, &networks, &mapping);

        let user = match self.store.load().await {
            Some(config) => {
                debug!(ports = config.len(), "Using existing configuration");
                Some(config)
            }
            None => self.seed(&detected).await,
        };

        let ports = merge(&detected, user.as_ref());
        let report = self.live_status().await;
        let status = StatusTable::from_report(&ports, &report);

        info!(
            ports = ports.len(),
            mapped = topology.len(),
            "Port panel loaded"
        );
        self.view = Some(PanelView {
            ports,
            topology,
            status,
        });
        Ok(true)
    }

    /// Refreshes live device and status data without touching the layout.
    pub async fn poll(&mut self) -> PanelResult<()> {
        let report = self.live_status().await;
        let network = self.host.network.clone();
        let view = self.view_mut()?;

        view.status.update(&report);
        for port in view.ports.iter_mut() {
            match network.device(&port.device).await {
                Ok(dev) => port.netdev = Some(dev),
                Err(e) => debug!("No device state for {}: {}", port.device, e),
            }
        }
        Ok(())
    }

    pub fn ports(&self) -> &[MergedPort] {
        self.view
            .as_ref()
            .map(|v| v.ports.as_slice())
            .unwrap_or_default()
    }

    pub fn status(&self) -> Option<&StatusTable> {
        self.view.as_ref().map(|v| &v.status)
    }

    pub fn topology(&self) -> Option<&PortTopology> {
        self.view.as_ref().map(|v| &v.topology)
    }

    pub fn rows(&self) -> Vec<PortRow> {
        match &self.view {
            Some(view) => view
                .ports
                .iter()
                .map(|p| PortRow::build(p, &view.topology, &view.status))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Applies a label/description edit and, for LAN ports, an
    /// enable/disable request. The save and the state change run
    /// concurrently; only a failed save fails the edit.
    #[instrument(skip(self, request))]
    pub async fn edit(&mut self, device: &str, request: EditRequest) -> PanelResult<EditOutcome> {
        let _pause = PauseGuard::new(self.host.refresh.clone());
        let index = self.index_of(device)?;

        // Only typed labels are limited; the current label passes through
        // unchanged however long it is.
        let typed = request.label.trim();
        let unchanged = self.ports().get(index).is_some_and(|p| p.label == typed);
        if !unchanged {
            check_length("label", typed, self.config.limits.label_max_chars)?;
        }
        check_length(
            "description",
            request.description.trim(),
            self.config.limits.description_max_chars,
        )?;

        self.apply_edit(index, device, request).await
    }

    /// Resets the label to the factory label and clears the description.
    #[instrument(skip(self))]
    pub async fn restore_original(&mut self, device: &str) -> PanelResult<EditOutcome> {
        let _pause = PauseGuard::new(self.host.refresh.clone());
        let index = self.index_of(device)?;
        let original = self
            .ports()
            .get(index)
            .map(|p| p.original_label.clone())
            .unwrap_or_default();

        self.apply_edit(
            index,
            device,
            EditRequest {
                label: original,
                description: String::new(),
                enabled: None,
            },
        )
        .await
    }

    /// Saves the new label and description and, for LAN ports, applies
    /// the requested state. An empty label falls back to the device name.
    async fn apply_edit(
        &mut self,
        index: usize,
        device: &str,
        request: EditRequest,
    ) -> PanelResult<EditOutcome> {
        let label = match request.label.trim() {
            "" => device,
            trimmed => trimmed,
        };
        let description = request.description.trim();

        let report = self.live_status().await;
        let current = report.get(status_key(device)).map(|s| Operstate::parse(s));
        let command = match (current, request.enabled) {
            (Some(current), Some(enable)) if enable != current.is_enabled() => Some(if enable {
                PortCommand::Up
            } else {
                PortCommand::Down
            }),
            (None, Some(_)) => {
                info!("{} is not a LAN port, state left unchanged", device);
                None
            }
            _ => None,
        };

        let view = self.view_mut()?;
        view.status.update(&report);
        let mut ports = view.ports.clone();
        if let Some(port) = ports.get_mut(index) {
            port.label = label.to_string();
            port.description = description.to_string();
        }
        let records = to_records(&ports);

        let rpc = self.host.rpc.clone();
        let (saved, changed) = tokio::join!(self.store.save(&records), async move {
            match command {
                Some(cmd) => Some((cmd, rpc.set_port_status(device, cmd).await)),
                None => None,
            }
        });

        let status_change = match changed {
            Some((cmd, reply)) => Some(self.apply_status_reply(device, cmd, reply)?),
            None => None,
        };

        saved?;
        self.view_mut()?.ports = ports;
        self.host
            .notifier
            .notify(Level::Info, "Port configuration saved successfully");

        Ok(EditOutcome {
            label: label.to_string(),
            description: description.to_string(),
            status_change,
        })
    }

    /// Moves a port to `new_index` (clamped) and saves the new order.
    #[instrument(skip(self))]
    pub async fn move_port(&mut self, device: &str, new_index: usize) -> PanelResult<()> {
        let _pause = PauseGuard::new(self.host.refresh.clone());
        let index = self.index_of(device)?;

        let mut ports = self.view_mut()?.ports.clone();
        let port = ports.remove(index);
        let target = new_index.min(ports.len());
        ports.insert(target, port);

        if target == index {
            debug!("{} already at position {}", device, index);
            return Ok(());
        }

        self.store.save(&to_records(&ports)).await?;
        self.view_mut()?.ports = ports;
        self.host.notifier.notify(Level::Info, "Port order saved");
        Ok(())
    }

    pub async fn backup(&self) -> PanelResult<()> {
        self.store.create_backup().await
    }

    /// Restores the backup file and reloads.
    pub async fn restore_backup(&mut self) -> PanelResult<RestoreOutcome> {
        let _pause = PauseGuard::new(self.host.refresh.clone());
        let outcome = self.store.restore_from_backup().await?;
        self.load().await?;
        Ok(outcome)
    }

    /// Installs uploaded config content and reloads.
    pub async fn upload(&mut self, content: &str) -> PanelResult<RestoreOutcome> {
        let _pause = PauseGuard::new(self.host.refresh.clone());
        let outcome = self.store.restore_from_upload(content).await?;
        self.load().await?;
        Ok(outcome)
    }

    pub async fn download(&self) -> PanelResult<String> {
        self.store.download().await
    }

    async fn detect(&self) -> Vec<DetectedPort> {
        let builtin = self
            .host
            .rpc
            .builtin_ethernet_ports()
            .await
            .unwrap_or_else(|e| {
                warn!("Builtin port list unavailable: {}", e);
                Vec::new()
            });

        let board = if builtin.is_empty() {
            self.host
                .fs
                .read(&self.config.files.board)
                .await
                .unwrap_or_else(|e| {
                    warn!("Cannot read {}: {}", self.config.files.board, e);
                    None
                })
        } else {
            None
        };

        let mut detected = detect_ports(&builtin, board.as_deref());
        for port in detected.iter_mut() {
            match self.host.network.device(&port.device).await {
                Ok(dev) => port.netdev = Some(dev),
                Err(e) => debug!("No device state for {}: {}", port.device, e),
            }
        }
        detected
    }

    /// Writes a first configuration built from the detected ports.
    async fn seed(&self, detected: &[DetectedPort]) -> Option<UserConfig> {
        let config = initial_config(detected).ok()?;
        info!(
            ports = config.len(),
            "Creating initial port configuration"
        );

        if let Err(e) = self.store.save(config.records()).await {
            warn!("Failed to create initial configuration: {}", e);
            self.host.notifier.notify(
                Level::Warning,
                "Warning: Could not create port configuration file. Port customizations will not be saved. Check /etc directory permissions",
            );
        }
        Some(config)
    }

    async fn live_status(&self) -> HashMap<String, String> {
        self.host.rpc.ports_status().await.unwrap_or_else(|e| {
            warn!("Port status unavailable: {}", e);
            HashMap::new()
        })
    }

    fn apply_status_reply(
        &mut self,
        device: &str,
        command: PortCommand,
        reply: PanelResult<SetStatusReply>,
    ) -> PanelResult<StatusChange> {
        match reply {
            Ok(reply) if reply.success => {}
            Ok(_) => {
                warn!("setPortStatus {} {} was refused", device, command);
                self.host
                    .notifier
                    .notify(Level::Error, "Failed to change port status");
                return Ok(StatusChange::Failed);
            }
            Err(e) => {
                warn!("setPortStatus {} {} failed: {}", device, command, e);
                self.host
                    .notifier
                    .notify(Level::Error, "Error changing port status");
                return Ok(StatusChange::Failed);
            }
        }

        let (operstate, message) = match command {
            PortCommand::Up => (Operstate::Idle, "Port has been enabled successfully"),
            PortCommand::Down => (Operstate::Disabled, "Port has been disabled successfully"),
        };
        self.view_mut()?.status.set_operstate(device, operstate);
        self.host.notifier.notify(Level::Info, message);
        Ok(StatusChange::Applied(operstate))
    }

    fn view_mut(&mut self) -> PanelResult<&mut PanelView> {
        self.view
            .as_mut()
            .ok_or_else(|| PanelError::not_found("panel", "ports"))
    }

    fn index_of(&self, device: &str) -> PanelResult<usize> {
        self.ports()
            .iter()
            .position(|p| p.device == device)
            .ok_or_else(|| PanelError::not_found("port", device))
    }
}

fn check_length(field: &str, value: &str, max: usize) -> PanelResult<()> {
    let len = value.chars().count();
    if len > max {
        return Err(PanelError::invalid_input(
            field,
            format!("{} characters, at most {} allowed", len, max),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_length_counts_chars() {
        assert!(check_length("label", "Büro-Port", 9).is_ok());
        assert!(check_length("label", "Büro-Port1", 9).is_err());
        assert!(check_length("description", "", 50).is_ok());
    }
}
