//! Write lock behaviour under concurrent requests.

use std::sync::Arc;

use portpanel_common::{Level, PanelError};
use portpanel_store::{OverrideStore, StoreSettings, UserPortRecord, USER_PORTS_PATH};
use portpanel_test::{MemFs, RecordingNotifier};

fn records(label: &str) -> Vec<UserPortRecord> {
    vec![UserPortRecord::new("lan1").with_label(label).with_role("lan")]
}

#[tokio::test]
async fn test_second_save_rejected_while_first_in_flight() {
    let fs = Arc::new(MemFs::new());
    let gate = fs.gate_writes();
    let notifier = Arc::new(RecordingNotifier::new());
    let store = Arc::new(OverrideStore::new(
        fs.clone(),
        notifier.clone(),
        StoreSettings::default(),
    ));

    let first = tokio::spawn({
        let store = store.clone();
        async move { store.save(&records("First")).await }
    });

    while !store.is_locked() {
        tokio::task::yield_now().await;
    }

    let second = store.save(&records("Second")).await;
    assert!(matches!(second, Err(PanelError::Locked)));
    assert!(notifier.contains(Level::Warning, "already in progress"));

    gate.add_permits(1);
    first.await.unwrap().unwrap();

    assert!(!store.is_locked());
    let written = fs.content(USER_PORTS_PATH).unwrap();
    assert!(written.contains("First"));
    assert!(!written.contains("Second"));
}

#[tokio::test]
async fn test_backup_rejected_during_save() {
    let fs = Arc::new(MemFs::new());
    fs.put(USER_PORTS_PATH, "[{\"device\":\"lan1\"}]");
    let gate = fs.gate_writes();
    let store = Arc::new(OverrideStore::new(
        fs.clone(),
        Arc::new(RecordingNotifier::new()),
        StoreSettings::default(),
    ));

    let save = tokio::spawn({
        let store = store.clone();
        async move { store.save(&records("Held")).await }
    });
    while !store.is_locked() {
        tokio::task::yield_now().await;
    }

    assert!(matches!(
        store.create_backup().await,
        Err(PanelError::Locked)
    ));

    gate.add_permits(1);
    save.await.unwrap().unwrap();

    gate.add_permits(1);
    store.create_backup().await.unwrap();
    assert!(!store.is_locked());
}

#[tokio::test]
async fn test_lock_released_after_write_failure() {
    let fs = Arc::new(MemFs::new());
    fs.fail_writes();
    let notifier = Arc::new(RecordingNotifier::new());
    let store = OverrideStore::new(fs.clone(), notifier.clone(), StoreSettings::default());

    let err = store.save(&records("x")).await.unwrap_err();
    assert!(err.is_io_failure());
    assert!(!store.is_locked());
    assert!(notifier.contains(Level::Error, "Saving port configuration failed"));
}
