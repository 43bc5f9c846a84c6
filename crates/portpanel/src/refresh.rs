//! Scoped suspension of periodic refreshes.

use std::sync::Arc;

use portpanel_common::RefreshControl;
use tracing::trace;

/// Pauses refreshes on creation and resumes them when dropped.
pub struct PauseGuard {
    refresh: Arc<dyn RefreshControl>,
}

impl PauseGuard {
    pub fn new(refresh: Arc<dyn RefreshControl>) -> Self {
        trace!("Pausing refresh");
        refresh.pause();
        Self { refresh }
    }
}

impl Drop for PauseGuard {
    fn drop(&mut self) {
        trace!("Resuming refresh");
        self.refresh.resume();
    }
}

/// A scheduler with nothing to pause, for one-shot runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRefresh;

impl RefreshControl for NoRefresh {
    fn pause(&self) {}

    fn resume(&self) {}
}
