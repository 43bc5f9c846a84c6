//! The on-disk user override record and its validation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use portpanel_common::{PanelError, PanelResult};

/// One user-edited port entry of `/etc/user_defined_ports.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPortRecord {
    pub device: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub role: String,
    #[serde(rename = "originalLabel", default)]
    pub original_label: String,
    #[serde(default)]
    pub description: String,
}

impl UserPortRecord {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Self::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    pub fn with_original_label(mut self, original_label: impl Into<String>) -> Self {
        self.original_label = original_label.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Reads a record from an already validated JSON element. Non-string
    /// optional fields read as empty.
    fn from_value(value: &Value) -> Option<Self> {
        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let device = value.get("device")?.as_str()?.to_string();

        Some(Self {
            device,
            label: text("label"),
            role: text("role"),
            original_label: text("originalLabel"),
            description: text("description"),
        })
    }

    /// Canonical shape written to disk: empty labels fall back to the
    /// device name.
    pub fn normalized(&self) -> Self {
        let or_device = |s: &str| {
            if s.is_empty() {
                self.device.clone()
            } else {
                s.to_string()
            }
        };

        Self {
            device: self.device.clone(),
            label: or_device(&self.label),
            role: self.role.clone(),
            original_label: or_device(&self.original_label),
            description: self.description.clone(),
        }
    }
}

/// Checks the structural shape of a parsed user config: a non-empty array
/// whose every element carries a non-empty string `device`.
pub fn validate_config(value: &Value) -> PanelResult<()> {
    let items = value
        .as_array()
        .ok_or_else(|| PanelError::invalid_config("config is not an array"))?;

    if items.is_empty() {
        return Err(PanelError::invalid_config("config is an empty array"));
    }

    for (index, item) in items.iter().enumerate() {
        let valid = item
            .get("device")
            .and_then(Value::as_str)
            .is_some_and(|d| !d.is_empty());
        if !valid {
            return Err(PanelError::invalid_config(format!(
                "invalid device field at index {}",
                index
            )));
        }
    }

    debug!(ports = items.len(), "Config validation passed");
    Ok(())
}

/// A validated, non-empty, ordered list of user port records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserConfig {
    records: Vec<UserPortRecord>,
}

impl UserConfig {
    /// Wraps records after checking the collection invariants.
    pub fn new(records: Vec<UserPortRecord>) -> PanelResult<Self> {
        if records.is_empty() {
            return Err(PanelError::invalid_config("config is an empty array"));
        }
        if let Some(index) = records.iter().position(|r| r.device.is_empty()) {
            return Err(PanelError::invalid_config(format!(
                "invalid device field at index {}",
                index
            )));
        }
        Ok(Self { records })
    }

    /// Parses and validates JSON text. `source_name` only labels errors.
    pub fn parse(content: &str, source_name: &str) -> PanelResult<Self> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| PanelError::malformed_json(source_name, e.to_string()))?;
        Self::from_json(&value)
    }

    pub fn from_json(value: &Value) -> PanelResult<Self> {
        if let Err(e) = validate_config(value) {
            warn!("Invalid ports configuration detected: {}", e);
            return Err(e);
        }

        let records = value
            .as_array()
            .map(|items| items.iter().filter_map(UserPortRecord::from_value).collect())
            .unwrap_or_default();
        Self::new(records)
    }

    pub fn records(&self) -> &[UserPortRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Pretty-printed (2-space indent) JSON of the normalized records.
    pub fn to_json_pretty(&self) -> PanelResult<String> {
        let normalized: Vec<UserPortRecord> =
            self.records.iter().map(UserPortRecord::normalized).collect();
        serde_json::to_string_pretty(&normalized)
            .map_err(|e| PanelError::invalid_config(format!("failed to serialize: {}", e)))
    }

    pub fn into_records(self) -> Vec<UserPortRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_validation_rejects() {
        assert!(validate_config(&json!([])).is_err());
        assert!(validate_config(&json!({"device": "lan1"})).is_err());
        assert!(validate_config(&json!("lan1")).is_err());
        assert!(validate_config(&json!([{"device": "lan1"}, {"label": "x"}])).is_err());
        assert!(validate_config(&json!([{"device": ""}])).is_err());
        assert!(validate_config(&json!([{"device": 5}])).is_err());
        assert!(validate_config(&json!([null])).is_err());
    }

    #[test]
    fn test_validation_accepts_minimal() {
        assert!(validate_config(&json!([{"device": "lan1"}])).is_ok());
    }

    #[test]
    fn test_parse_lenient_fields() {
        let config = UserConfig::parse(
            r#"[{"device":"lan1","label":7,"originalLabel":"LAN 1","description":"uplink"}]"#,
            "test",
        )
        .unwrap();
        let record = &config.records()[0];
        assert_eq!(record.label, "");
        assert_eq!(record.original_label, "LAN 1");
        assert_eq!(record.description, "uplink");
    }

    #[test]
    fn test_parse_malformed() {
        let err = UserConfig::parse("[{\"device\":", "/etc/user_defined_ports.json").unwrap_err();
        assert!(matches!(err, PanelError::MalformedJson { .. }));
    }

    #[test]
    fn test_normalized_defaults() {
        let record = UserPortRecord::new("lan3").with_role("lan").normalized();
        assert_eq!(record.label, "lan3");
        assert_eq!(record.original_label, "lan3");
        assert_eq!(record.description, "");
    }

    #[test]
    fn test_pretty_json_shape() {
        let config = UserConfig::new(vec![UserPortRecord::new("wan")
            .with_label("WAN")
            .with_role("wan")])
        .unwrap();
        let json = config.to_json_pretty().unwrap();
        let expected = "[\n  {\n    \"device\": \"wan\",\n    \"label\": \"WAN\",\n    \"role\": \"wan\",\n    \"originalLabel\": \"wan\",\n    \"description\": \"\"\n  }\n]";
        assert_eq!(json, expected);
    }

    #[test]
    fn test_new_rejects_empty() {
        assert!(UserConfig::new(vec![]).is_err());
        assert!(UserConfig::new(vec![UserPortRecord::new("")]).is_err());
    }
}
