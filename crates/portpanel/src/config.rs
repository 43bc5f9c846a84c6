//! Configuration file support for portpanel
//!
//! Loads and validates the panel configuration from TOML files.
//! Default location: /etc/portpanel.toml, overridable with the
//! `PORTPANEL_CONFIG` environment variable.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use portpanel_common::shell::{CHMOD_CMD, TOUCH_CMD, UBUS_CMD};
use portpanel_common::{PanelError, PanelResult};
use portpanel_store::{StoreSettings, USER_PORTS_BACKUP_PATH, USER_PORTS_PATH};

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/portpanel.toml";

/// Environment variable overriding [`DEFAULT_CONFIG_PATH`].
pub const CONFIG_ENV_VAR: &str = "PORTPANEL_CONFIG";

/// File locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesConfig {
    /// User override file
    #[serde(default = "default_user_ports")]
    pub user_ports: String,

    /// Backup copy of the user override file
    #[serde(default = "default_backup")]
    pub backup: String,

    /// Board description used when the builtin port list is empty
    #[serde(default = "default_board")]
    pub board: String,
}

/// Host utilities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandsConfig {
    #[serde(default = "default_chmod")]
    pub chmod: String,

    #[serde(default = "default_touch")]
    pub touch: String,

    #[serde(default = "default_ubus")]
    pub ubus: String,

    /// Presence of this binary marks a legacy swconfig switch
    #[serde(default = "default_swconfig")]
    pub swconfig: String,
}

/// Write sequence tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Leading characters compared after a write
    #[serde(default = "default_verify_prefix_chars")]
    pub verify_prefix_chars: usize,

    /// Mode applied after a verified write
    #[serde(default = "default_read_only_mode")]
    pub read_only_mode: String,

    /// Mode applied before writing
    #[serde(default = "default_writable_mode")]
    pub writable_mode: String,
}

/// Edit input limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_label_max_chars")]
    pub label_max_chars: usize,

    #[serde(default = "default_description_max_chars")]
    pub description_max_chars: usize,
}

/// Complete portpanel configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelConfig {
    #[serde(default)]
    pub files: FilesConfig,

    #[serde(default)]
    pub commands: CommandsConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub limits: LimitsConfig,
}

// Default functions
fn default_user_ports() -> String {
    USER_PORTS_PATH.to_string()
}

fn default_backup() -> String {
    USER_PORTS_BACKUP_PATH.to_string()
}

fn default_board() -> String {
    "/etc/board.json".to_string()
}

fn default_chmod() -> String {
    CHMOD_CMD.to_string()
}

fn default_touch() -> String {
    TOUCH_CMD.to_string()
}

fn default_ubus() -> String {
    UBUS_CMD.to_string()
}

fn default_swconfig() -> String {
    "/sbin/swconfig".to_string()
}

fn default_verify_prefix_chars() -> usize {
    80
}

fn default_read_only_mode() -> String {
    "444".to_string()
}

fn default_writable_mode() -> String {
    "644".to_string()
}

fn default_label_max_chars() -> usize {
    9
}

fn default_description_max_chars() -> usize {
    50
}

// Default implementations
impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            user_ports: default_user_ports(),
            backup: default_backup(),
            board: default_board(),
        }
    }
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            chmod: default_chmod(),
            touch: default_touch(),
            ubus: default_ubus(),
            swconfig: default_swconfig(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            verify_prefix_chars: default_verify_prefix_chars(),
            read_only_mode: default_read_only_mode(),
            writable_mode: default_writable_mode(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            label_max_chars: default_label_max_chars(),
            description_max_chars: default_description_max_chars(),
        }
    }
}

impl PanelConfig {
    /// Config path from the environment, or the default location.
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV_VAR)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> PanelResult<Self> {
        let path = path.as_ref();

        match std::fs::read_to_string(path) {
            Ok(content) => {
                let config: Self = toml::from_str(&content).map_err(|e| {
                    PanelError::Configuration(format!(
                        "Failed to parse config file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                info!("Loaded configuration from {}", path.display());
                config.validate()?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(PanelError::io(path.display().to_string(), e)),
        }
    }

    /// Load from the default location or defaults
    pub fn load() -> PanelResult<Self> {
        Self::load_or_default(Self::default_path())
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> PanelResult<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| {
            PanelError::Configuration(format!("Failed to serialize config: {}", e))
        })?;

        std::fs::write(path, content).map_err(|e| PanelError::io(path.display().to_string(), e))
    }

    /// Store settings derived from this configuration
    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            user_ports_path: self.files.user_ports.clone(),
            backup_path: self.files.backup.clone(),
            chmod_cmd: self.commands.chmod.clone(),
            touch_cmd: self.commands.touch.clone(),
            verify_prefix_chars: self.store.verify_prefix_chars,
            read_only_mode: self.store.read_only_mode.clone(),
            writable_mode: self.store.writable_mode.clone(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> PanelResult<()> {
        let paths = [
            ("files.user_ports", &self.files.user_ports),
            ("files.backup", &self.files.backup),
            ("files.board", &self.files.board),
            ("commands.chmod", &self.commands.chmod),
            ("commands.touch", &self.commands.touch),
            ("commands.ubus", &self.commands.ubus),
        ];
        for (name, value) in paths {
            if value.trim().is_empty() {
                return Err(PanelError::Configuration(format!("{} must not be empty", name)));
            }
        }

        if self.files.user_ports == self.files.backup {
            return Err(PanelError::Configuration(
                "files.backup must differ from files.user_ports".to_string(),
            ));
        }

        if self.store.verify_prefix_chars == 0 {
            return Err(PanelError::Configuration(
                "verify_prefix_chars must be > 0".to_string(),
            ));
        }

        for (name, mode) in [
            ("read_only_mode", &self.store.read_only_mode),
            ("writable_mode", &self.store.writable_mode),
        ] {
            if u32::from_str_radix(mode, 8).is_err() {
                return Err(PanelError::Configuration(format!(
                    "{} must be an octal mode, got '{}'",
                    name, mode
                )));
            }
        }

        if self.limits.label_max_chars == 0 || self.limits.description_max_chars == 0 {
            return Err(PanelError::Configuration(
                "limits must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = PanelConfig::default();
        assert_eq!(config.files.user_ports, "/etc/user_defined_ports.json");
        assert_eq!(config.files.backup, "/etc/user_defined_ports.json.bak");
        assert_eq!(config.commands.chmod, "/bin/chmod");
        assert_eq!(config.store.verify_prefix_chars, 80);
        assert_eq!(config.limits.label_max_chars, 9);
        assert_eq!(config.limits.description_max_chars, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[files]\nuser_ports = \"/tmp/ports.json\"\n\n[limits]\nlabel_max_chars = 12").unwrap();

        let config = PanelConfig::load_or_default(file.path()).unwrap();
        assert_eq!(config.files.user_ports, "/tmp/ports.json");
        assert_eq!(config.files.backup, "/etc/user_defined_ports.json.bak");
        assert_eq!(config.limits.label_max_chars, 12);
        assert_eq!(config.limits.description_max_chars, 50);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = PanelConfig::load_or_default("/nonexistent/portpanel.toml").unwrap();
        assert_eq!(config, PanelConfig::default());
    }

    #[test]
    fn test_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[files\nuser_ports = ").unwrap();
        assert!(matches!(
            PanelConfig::load_or_default(file.path()),
            Err(PanelError::Configuration(_))
        ));
    }

    #[test]
    fn test_validation() {
        let mut config = PanelConfig::default();
        config.store.verify_prefix_chars = 0;
        assert!(config.validate().is_err());

        let mut config = PanelConfig::default();
        config.store.read_only_mode = "r--".to_string();
        assert!(config.validate().is_err());

        let mut config = PanelConfig::default();
        config.files.backup = config.files.user_ports.clone();
        assert!(config.validate().is_err());

        let mut config = PanelConfig::default();
        config.commands.ubus = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let file = NamedTempFile::new().unwrap();
        let mut config = PanelConfig::default();
        config.files.board = "/tmp/board.json".to_string();
        config.save(file.path()).unwrap();

        let loaded = PanelConfig::load_or_default(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_store_settings() {
        let settings = PanelConfig::default().store_settings();
        assert_eq!(settings, StoreSettings::default());
    }

    #[test]
    #[serial]
    fn test_default_path_from_env() {
        std::env::set_var(CONFIG_ENV_VAR, "/tmp/custom.toml");
        assert_eq!(PanelConfig::default_path(), PathBuf::from("/tmp/custom.toml"));

        std::env::remove_var(CONFIG_ENV_VAR);
        assert_eq!(PanelConfig::default_path(), PathBuf::from(DEFAULT_CONFIG_PATH));
    }
}
