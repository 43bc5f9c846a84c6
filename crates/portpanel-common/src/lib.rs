//! Common infrastructure for the port status panel.
//!
//! This crate provides what every other panel crate builds on:
//!
//! - [`error`]: the shared [`PanelError`] type
//! - [`host`]: capability traits injected by the host environment
//! - [`shell`]: host utility execution (chmod, touch, ubus)
//! - [`natural`]: natural (numeric-aware) string ordering
//!
//! # Architecture
//!
//! The panel is split into leaf-first components:
//!
//! 1. Topology resolution from network configuration sections
//! 2. Detected-port inventory from board data
//! 3. The user override store persisting `/etc/user_defined_ports.json`
//! 4. The merger that combines detected ports with user overrides
//!
//! Components only see the host through [`HostFs`], [`PortRpc`],
//! [`Notifier`] and [`RefreshControl`].

pub mod error;
pub mod host;
pub mod natural;
pub mod shell;

// Re-export commonly used items at crate root
pub use error::{PanelError, PanelResult};
pub use host::{
    BuiltinPort, HostFs, Level, Notifier, PortCommand, PortRpc, RefreshControl, SetStatusReply,
};
#[cfg(feature = "mock")]
pub use host::MockPortRpc;
pub use natural::{natural_cmp, natural_sort};
pub use shell::ExecResult;
