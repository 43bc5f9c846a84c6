//! Persistence of the user override file.
//!
//! Every write, whether a save, a backup or a restore, runs the same
//! sequence against the target file:
//!
//! 1. make it writable (`chmod 644`, or `touch` then `chmod 644`)
//! 2. write the content
//! 3. read it back and compare the leading characters
//! 4. `chmod 444`
//!
//! A single write lock serializes these sequences; a second request while
//! one is in flight is rejected, never queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use portpanel_common::shell::{CHMOD_CMD, TOUCH_CMD};
use portpanel_common::{HostFs, Level, Notifier, PanelError, PanelResult};

use crate::record::{UserConfig, UserPortRecord};

/// Default location of the user override file.
pub const USER_PORTS_PATH: &str = "/etc/user_defined_ports.json";

/// Default location of the backup copy.
pub const USER_PORTS_BACKUP_PATH: &str = "/etc/user_defined_ports.json.bak";

/// File locations, utilities and modes used by [`OverrideStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub user_ports_path: String,
    pub backup_path: String,
    pub chmod_cmd: String,
    pub touch_cmd: String,
    /// Number of leading characters compared on read-back.
    pub verify_prefix_chars: usize,
    pub read_only_mode: String,
    pub writable_mode: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            user_ports_path: USER_PORTS_PATH.to_string(),
            backup_path: USER_PORTS_BACKUP_PATH.to_string(),
            chmod_cmd: CHMOD_CMD.to_string(),
            touch_cmd: TOUCH_CMD.to_string(),
            verify_prefix_chars: 80,
            read_only_mode: "444".to_string(),
            writable_mode: "644".to_string(),
        }
    }
}

/// Held while a write sequence runs. Dropping it releases the lock.
#[derive(Debug)]
pub struct WriteGuard<'a> {
    lock: &'a AtomicBool,
}

impl WriteGuard<'_> {
    /// Releases the lock explicitly.
    pub fn release(self) {}
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.lock.store(false, Ordering::Release);
        debug!("Write lock released");
    }
}

/// Where a restore candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreSource {
    Backup,
    Upload,
}

/// A validated configuration waiting for user confirmation before it
/// replaces the primary file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreCandidate {
    source: RestoreSource,
    content: String,
    config: UserConfig,
}

impl RestoreCandidate {
    pub fn source(&self) -> RestoreSource {
        self.source
    }

    /// Number of port entries the restore would install.
    pub fn port_count(&self) -> usize {
        self.config.len()
    }

    pub fn config(&self) -> &UserConfig {
        &self.config
    }

    /// Exact text that will be written.
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Result of a completed restore. The caller re-runs the full load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    ReloadRequired { ports: usize },
}

/// Owner of the user override file and its backup.
pub struct OverrideStore {
    fs: Arc<dyn HostFs>,
    notifier: Arc<dyn Notifier>,
    settings: StoreSettings,
    lock: AtomicBool,
}

impl OverrideStore {
    pub fn new(fs: Arc<dyn HostFs>, notifier: Arc<dyn Notifier>, settings: StoreSettings) -> Self {
        Self {
            fs,
            notifier,
            settings,
            lock: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Takes the write lock, failing with [`PanelError::Locked`] if held.
    pub fn try_acquire(&self) -> PanelResult<WriteGuard<'_>> {
        self.lock
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| PanelError::Locked)?;
        debug!("Write lock acquired");
        Ok(WriteGuard { lock: &self.lock })
    }

    pub fn is_locked(&self) -> bool {
        self.lock.load(Ordering::Acquire)
    }

    /// Reads the user override file.
    ///
    /// Absent, blank and `[]` files mean "no user config". Malformed or
    /// invalid content is reported through the notifier and also yields
    /// `None`. This never fails.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Option<UserConfig> {
        let path = self.settings.user_ports_path.as_str();

        let content = match self.fs.read(path).await {
            Ok(Some(content)) => content,
            Ok(None) => {
                debug!("No user ports config at {}", path);
                return None;
            }
            Err(e) => {
                warn!("Failed to read {}: {}", path, e);
                return None;
            }
        };

        let trimmed = content.trim();
        if trimmed.is_empty() || trimmed == "[]" {
            debug!("User ports config at {} is empty", path);
            return None;
        }

        match UserConfig::parse(&content, path) {
            Ok(config) => {
                info!(ports = config.len(), "Loaded user ports config");
                Some(config)
            }
            Err(e @ PanelError::MalformedJson { .. }) => {
                error!("Port config parse error: {}", e);
                self.notifier.notify(
                    Level::Error,
                    "Port config parse error. Use \"Restore backup .bak\" from edit modal.",
                );
                None
            }
            Err(e) => {
                error!("Port config rejected: {}", e);
                self.notifier.notify(
                    Level::Error,
                    "Port config file is corrupted. Use \"Restore backup .bak\" from edit modal.",
                );
                None
            }
        }
    }

    /// Persists `records` in order.
    ///
    /// Rejected up front when the lock is held or `records` is empty or
    /// contains an entry without a device. The lock is released on every
    /// exit path.
    #[instrument(skip(self, records), fields(ports = records.len()))]
    pub async fn save(&self, records: &[UserPortRecord]) -> PanelResult<()> {
        let guard = match self.try_acquire() {
            Ok(guard) => guard,
            Err(e) => {
                warn!("Save already in progress, skipping");
                self.notifier
                    .notify(Level::Warning, "Save operation already in progress");
                return Err(e);
            }
        };

        let config = match UserConfig::new(records.to_vec()) {
            Ok(config) => config,
            Err(e) => {
                error!("Refusing to save invalid configuration: {}", e);
                self.notifier
                    .notify(Level::Error, "Cannot save empty configuration");
                return Err(e);
            }
        };

        let content = config.to_json_pretty()?;
        let path = self.settings.user_ports_path.clone();

        let result = self.write_verified(&path, &content).await;
        drop(guard);

        match &result {
            Ok(()) => info!(ports = config.len(), "Saved user ports config to {}", path),
            Err(PanelError::NotWritable { .. }) => self.notifier.notify(
                Level::Error,
                "Cannot make config file writable. Check /etc permissions.",
            ),
            Err(PanelError::VerificationFailed { .. }) => self.notifier.notify(
                Level::Error,
                "Save verification failed - file content mismatch!",
            ),
            Err(e) => self
                .notifier
                .notify(Level::Error, &format!("Saving port configuration failed: {}", e)),
        }
        result
    }

    /// Copies the current, valid user file to the backup path.
    #[instrument(skip(self))]
    pub async fn create_backup(&self) -> PanelResult<()> {
        let _guard = self.try_acquire().inspect_err(|_| {
            self.notifier
                .notify(Level::Warning, "Save operation already in progress");
        })?;

        let path = self.settings.user_ports_path.clone();
        let content = match self.fs.read(&path).await {
            Ok(Some(content)) if !content.trim().is_empty() => content,
            Ok(_) => {
                warn!("No config file to backup at {}", path);
                self.notifier.notify(Level::Warning, "No config file to backup");
                return Err(PanelError::not_found("file", path));
            }
            Err(e) => {
                self.notifier
                    .notify(Level::Error, &format!("Backup creation failed: {}", e));
                return Err(e);
            }
        };

        if let Err(e) = serde_json::from_str::<Value>(&content)
            .map_err(|e| PanelError::malformed_json(path.as_str(), e.to_string()))
            .and_then(|value| UserConfig::from_json(&value))
        {
            error!("Refusing to back up corrupted config: {}", e);
            self.notifier
                .notify(Level::Error, "Config file is corrupted, cannot create backup");
            return Err(e);
        }

        let backup = self.settings.backup_path.clone();
        match self.write_verified(&backup, &content).await {
            Ok(()) => {
                info!("Backup written to {}", backup);
                self.notifier
                    .notify(Level::Info, &format!("Backup file created: {}", backup));
                Ok(())
            }
            Err(e) => {
                let message = match &e {
                    PanelError::VerificationFailed { .. } => {
                        "Backup write verification failed!".to_string()
                    }
                    other => format!("Backup creation failed: {}", other),
                };
                self.notifier.notify(Level::Error, &message);
                Err(e)
            }
        }
    }

    /// Reads and validates the backup file. Nothing is written.
    #[instrument(skip(self))]
    pub async fn inspect_backup(&self) -> PanelResult<RestoreCandidate> {
        let path = self.settings.backup_path.as_str();

        let content = match self.fs.read(path).await {
            Ok(Some(content)) if !content.trim().is_empty() => content,
            Ok(_) => {
                self.notifier.notify(Level::Warning, "No backup file found");
                return Err(PanelError::not_found("file", path));
            }
            Err(e) => {
                self.notifier
                    .notify(Level::Error, &format!("Restore failed: {}", e));
                return Err(e);
            }
        };

        match UserConfig::parse(&content, path) {
            Ok(config) => Ok(RestoreCandidate {
                source: RestoreSource::Backup,
                content,
                config,
            }),
            Err(e) => {
                self.notifier
                    .notify(Level::Error, &format!("Backup file is corrupted: {}", e));
                Err(e)
            }
        }
    }

    /// Validates uploaded file content. The written form is the
    /// normalized re-serialization, not the raw upload.
    pub fn inspect_upload(&self, content: &str) -> PanelResult<RestoreCandidate> {
        let config = UserConfig::parse(content, "upload").inspect_err(|e| {
            self.notifier
                .notify(Level::Error, &format!("Invalid configuration file: {}", e));
        })?;
        let content = config.to_json_pretty()?;

        Ok(RestoreCandidate {
            source: RestoreSource::Upload,
            content,
            config,
        })
    }

    /// Writes a confirmed candidate over the user file.
    #[instrument(skip(self, candidate), fields(source = ?candidate.source, ports = candidate.port_count()))]
    pub async fn restore(&self, candidate: &RestoreCandidate) -> PanelResult<RestoreOutcome> {
        let _guard = self.try_acquire().inspect_err(|_| {
            self.notifier
                .notify(Level::Warning, "Save operation already in progress");
        })?;

        let path = self.settings.user_ports_path.clone();
        match self.write_verified(&path, &candidate.content).await {
            Ok(()) => {
                let message = match candidate.source {
                    RestoreSource::Backup => "Configuration restored from backup. Reloading...",
                    RestoreSource::Upload => "Configuration uploaded successfully. Reloading...",
                };
                info!("{}", message);
                self.notifier.notify(Level::Info, message);
                Ok(RestoreOutcome::ReloadRequired {
                    ports: candidate.port_count(),
                })
            }
            Err(e) => {
                self.notifier
                    .notify(Level::Error, &format!("Restore failed: {}", e));
                Err(e)
            }
        }
    }

    /// Validates then restores the backup in one step.
    pub async fn restore_from_backup(&self) -> PanelResult<RestoreOutcome> {
        let candidate = self.inspect_backup().await?;
        self.restore(&candidate).await
    }

    /// Validates then restores uploaded content in one step.
    pub async fn restore_from_upload(&self, content: &str) -> PanelResult<RestoreOutcome> {
        let candidate = self.inspect_upload(content)?;
        self.restore(&candidate).await
    }

    /// Raw content of the user file.
    pub async fn download(&self) -> PanelResult<String> {
        let path = self.settings.user_ports_path.as_str();
        match self.fs.read(path).await {
            Ok(Some(content)) => Ok(content),
            Ok(None) => {
                self.notifier
                    .notify(Level::Warning, "Configuration file not found");
                Err(PanelError::not_found("file", path))
            }
            Err(e) => {
                self.notifier
                    .notify(Level::Error, &format!("Download failed: {}", e));
                Err(e)
            }
        }
    }

    /// Writable, write, verify, read-only. The caller holds the lock.
    async fn write_verified(&self, path: &str, content: &str) -> PanelResult<()> {
        if !self.ensure_writable(path).await {
            error!("Cannot make {} writable", path);
            return Err(PanelError::NotWritable {
                path: path.to_string(),
            });
        }

        self.fs.write(path, content).await?;

        if !self.verify_written(path, content).await {
            error!("Read-back of {} does not match written content", path);
            return Err(PanelError::VerificationFailed {
                path: path.to_string(),
            });
        }

        self.set_read_only(path).await;
        Ok(())
    }

    async fn ensure_writable(&self, path: &str) -> bool {
        let chmod = self.settings.chmod_cmd.as_str();
        let mode = self.settings.writable_mode.as_str();

        match self.fs.exec(chmod, &[mode, path]).await {
            Ok(result) if result.success() => return true,
            Ok(result) => debug!(
                "chmod {} {} failed ({}), creating file",
                mode,
                path,
                result.combined_output()
            ),
            Err(e) => {
                warn!("Failed to run {}: {}", chmod, e);
                return false;
            }
        }

        match self.fs.exec(&self.settings.touch_cmd, &[path]).await {
            Ok(result) if result.success() => {
                if let Err(e) = self.fs.exec(chmod, &[mode, path]).await {
                    warn!("Failed to run {} after touch: {}", chmod, e);
                }
                true
            }
            Ok(result) => {
                warn!("Cannot create {}: {}", path, result.combined_output());
                false
            }
            Err(e) => {
                warn!("Failed to run {}: {}", self.settings.touch_cmd, e);
                false
            }
        }
    }

    async fn verify_written(&self, path: &str, expected: &str) -> bool {
        let actual = match self.fs.read(path).await {
            Ok(Some(actual)) if !actual.is_empty() => actual,
            Ok(_) => {
                warn!("{} is empty after write", path);
                return false;
            }
            Err(e) => {
                warn!("Failed to read back {}: {}", path, e);
                return false;
            }
        };

        let n = self.settings.verify_prefix_chars;
        let prefix = |s: &str| s.trim().chars().take(n).collect::<String>();
        prefix(&actual) == prefix(expected)
    }

    async fn set_read_only(&self, path: &str) {
        let mode = self.settings.read_only_mode.as_str();
        match self.fs.exec(&self.settings.chmod_cmd, &[mode, path]).await {
            Ok(result) if result.success() => {}
            Ok(result) => warn!(
                "Could not set {} read-only: {}",
                path,
                result.combined_output()
            ),
            Err(e) => warn!("Could not set {} read-only: {}", path, e),
        }
    }
}

impl std::fmt::Debug for OverrideStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverrideStore")
            .field("settings", &self.settings)
            .field("locked", &self.is_locked())
            .finish()
    }
}
