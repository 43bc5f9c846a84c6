//! Capabilities supplied by the host environment.
//!
//! The panel never talks to the device directly. File access, utility
//! execution, port RPCs, user notifications and the refresh scheduler are
//! all injected through the traits below so the same logic runs against
//! `ubus` on a router and against in-memory fakes in tests.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PanelResult;
use crate::shell::ExecResult;

/// File read/write and utility execution on the device.
#[async_trait]
pub trait HostFs: Send + Sync {
    /// Reads a whole file. `Ok(None)` means the file does not exist.
    async fn read(&self, path: &str) -> PanelResult<Option<String>>;

    /// Replaces the content of a file.
    async fn write(&self, path: &str, data: &str) -> PanelResult<()>;

    /// Runs a utility with an argument vector.
    async fn exec(&self, program: &str, args: &[&str]) -> PanelResult<ExecResult>;
}

/// Port entry reported by the board's builtin ethernet port list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltinPort {
    /// Netdev name (e.g. "lan1").
    pub device: String,
    /// "lan" or "wan".
    #[serde(default)]
    pub role: String,
    /// Vendor label printed on the case, if known.
    #[serde(default)]
    pub label: Option<String>,
}

/// Requested administrative state for a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortCommand {
    /// Enable the port.
    Up,
    /// Disable the port.
    Down,
}

impl PortCommand {
    /// Wire value passed to the status RPC.
    pub fn as_str(&self) -> &'static str {
        match self {
            PortCommand::Up => "up",
            PortCommand::Down => "down",
        }
    }
}

impl fmt::Display for PortCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reply of the port state change RPC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetStatusReply {
    /// Whether the state change was applied.
    #[serde(default)]
    pub success: bool,
}

/// Port RPCs exposed by the device.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait PortRpc: Send + Sync {
    /// Builtin ethernet ports of the board; empty if unknown.
    async fn builtin_ethernet_ports(&self) -> PanelResult<Vec<BuiltinPort>>;

    /// Live operstate per port (`disabled`, `down`, `idle`, `active`).
    async fn ports_status(&self) -> PanelResult<HashMap<String, String>>;

    /// Requests an operational state change for one port.
    async fn set_port_status(&self, port: &str, command: PortCommand)
        -> PanelResult<SetStatusReply>;
}

/// Severity of a user-visible notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// Informational.
    Info,
    /// Something was skipped or degraded.
    Warning,
    /// An operation failed.
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }
}

/// User-visible notification sink.
pub trait Notifier: Send + Sync {
    fn notify(&self, level: Level, message: &str);
}

/// The host's periodic refresh scheduler.
pub trait RefreshControl: Send + Sync {
    /// Stops periodic refreshes.
    fn pause(&self);

    /// Restarts periodic refreshes.
    fn resume(&self);
}
