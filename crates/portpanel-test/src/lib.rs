//! Test infrastructure for the port status panel
//!
//! Provides:
//! - [`MemFs`]: an in-memory file system with chmod/touch semantics
//! - [`RecordingNotifier`] and [`CountingRefresh`] for asserting side effects
//! - [`FakeNetworkHost`] and [`FakePortRpc`] standing in for ubus
//! - Fixtures for common router layouts

pub mod fixtures;
mod fs;
mod hosts;
mod recorders;

pub use fixtures::*;
pub use fs::MemFs;
pub use hosts::{FakeNetworkHost, FakePortRpc};
pub use recorders::{CountingRefresh, RecordingNotifier};
