//! User port overrides: persistence, detection and merging.
//!
//! - [`OverrideStore`] owns `/etc/user_defined_ports.json` and its `.bak`
//!   copy, with verified, lock-serialized writes
//! - [`detect_ports`] lists the physical ports of the board
//! - [`merge`] combines detected ports with the stored overrides
//! - [`StatusTable`] carries the administrative state of each port

mod inventory;
mod merge;
mod record;
mod status;
mod store;

pub use inventory::{detect_ports, DetectedPort};
pub use merge::{initial_config, merge, to_records, MergedPort};
pub use record::{validate_config, UserConfig, UserPortRecord};
pub use status::{status_key, Operstate, PortRuntimeStatus, StatusTable};
pub use store::{
    OverrideStore, RestoreCandidate, RestoreOutcome, RestoreSource, StoreSettings, WriteGuard,
    USER_PORTS_BACKUP_PATH, USER_PORTS_PATH,
};
