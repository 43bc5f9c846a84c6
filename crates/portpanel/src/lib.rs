//! portpanel - router port status panel
//!
//! Shows every physical port of an OpenWrt router with its link state,
//! the networks and firewall zones it belongs to, and user-defined labels,
//! descriptions and ordering persisted in `/etc/user_defined_ports.json`.
//!
//! # Modules
//!
//! - [`panel`]: the [`PortPanel`] session (load, edit, reorder, backup)
//! - [`render`]: speed, counter and tooltip text
//! - [`gesture`]: press-and-hold drag detection
//! - [`refresh`]: scoped pause of the periodic refresh
//! - [`ubus`]: the OpenWrt host behind `ubus`
//! - [`config`]: TOML configuration

pub mod config;
pub mod gesture;
pub mod panel;
pub mod refresh;
pub mod render;
pub mod ubus;

pub use config::PanelConfig;
pub use gesture::{PointerKind, PressTracker, Release};
pub use panel::{EditOutcome, EditRequest, PanelHost, PortPanel, StatusChange};
pub use refresh::{NoRefresh, PauseGuard};
pub use render::PortRow;
pub use ubus::UbusHost;
