//! Recording implementations of the notifier and refresh scheduler.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use portpanel_common::{Level, Notifier, RefreshControl};

/// Keeps every notification for later assertions.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(Level, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(Level, String)> {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// True if a notification at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.messages()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }

    pub fn count(&self, level: Level) -> usize {
        self.messages().iter().filter(|(l, _)| *l == level).count()
    }

    pub fn clear(&self) {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: Level, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((level, message.to_string()));
    }
}

/// Counts pause/resume calls.
#[derive(Debug, Default)]
pub struct CountingRefresh {
    pauses: AtomicUsize,
    resumes: AtomicUsize,
}

impl CountingRefresh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    pub fn resumes(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }

    /// Paused more often than resumed.
    pub fn is_paused(&self) -> bool {
        self.pauses() > self.resumes()
    }
}

impl RefreshControl for CountingRefresh {
    fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.resumes.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notifier_records() {
        let notifier = RecordingNotifier::new();
        notifier.notify(Level::Error, "Save verification failed");
        notifier.notify(Level::Info, "saved");

        assert!(notifier.contains(Level::Error, "verification"));
        assert!(!notifier.contains(Level::Info, "verification"));
        assert_eq!(notifier.count(Level::Info), 1);

        notifier.clear();
        assert!(notifier.messages().is_empty());
    }

    #[test]
    fn test_refresh_balance() {
        let refresh = CountingRefresh::new();
        refresh.pause();
        assert!(refresh.is_paused());
        refresh.resume();
        assert!(!refresh.is_paused());
        assert_eq!(refresh.pauses(), 1);
    }
}
