use crate::errors::EditorError;
use crate::flush::DEFAULT_FLUSH_DELAY;
use crate::identity::DEFAULT_TRACKED;
use crate::ingest::DEFAULT_ALLOWED_MIME_TYPES;
use crate::routing::RoutingConfig;
use crate::tree::NodeType;
use crate::undo_stack::DEFAULT_MAX_LEVELS;
use crate::variables::{InvalidPolicy, ValidationConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_NAME: &str = "elemental.config.json";

/// Editor configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Debounce window for form updates and autosave
    #[serde(default = "default_flush_delay_ms")]
    pub flush_delay_ms: u64,

    /// Persist automatically in uncontrolled mode
    #[serde(default = "default_true")]
    pub autosave: bool,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub variables: VariableSettings,

    #[serde(default = "default_allowed_mime_types")]
    pub allowed_mime_types: Vec<String>,

    /// Node types that receive a `node-<uuid>` id
    #[serde(default = "default_tracked_node_types")]
    pub tracked_node_types: Vec<NodeType>,

    #[serde(default = "default_history_depth")]
    pub history_depth: usize,
}

/// Declarative part of the variable validation config
///
/// Custom predicates cannot live in a file; hosts add them with
/// [`ValidationConfig::with_validator`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableSettings {
    #[serde(default)]
    pub on_invalid: InvalidPolicy,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_message: Option<String>,

    #[serde(default)]
    pub override_format_validation: bool,

    /// Turn off the `{{` suggestion list
    #[serde(default)]
    pub disabled: bool,
}

fn default_flush_delay_ms() -> u64 {
    DEFAULT_FLUSH_DELAY.as_millis() as u64
}

fn default_true() -> bool {
    true
}

fn default_allowed_mime_types() -> Vec<String> {
    DEFAULT_ALLOWED_MIME_TYPES.iter().map(|s| s.to_string()).collect()
}

fn default_tracked_node_types() -> Vec<NodeType> {
    DEFAULT_TRACKED.to_vec()
}

fn default_history_depth() -> usize {
    DEFAULT_MAX_LEVELS
}

impl EditorConfig {
    /// Load config from a directory, falling back to defaults when absent
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, EditorError> {
        let config_path = dir.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_json(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_json(source: &str) -> Result<Self, EditorError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn flush_delay(&self) -> Duration {
        Duration::from_millis(self.flush_delay_ms)
    }

    pub fn to_validation_config(&self) -> ValidationConfig {
        let mut config = ValidationConfig::default()
            .with_policy(self.variables.on_invalid)
            .override_format_validation(self.variables.override_format_validation);
        if let Some(message) = &self.variables.invalid_message {
            config = config.with_message(message.clone());
        }
        config
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            flush_delay_ms: default_flush_delay_ms(),
            autosave: true,
            routing: RoutingConfig::default(),
            variables: VariableSettings::default(),
            allowed_mime_types: default_allowed_mime_types(),
            tracked_node_types: default_tracked_node_types(),
            history_depth: default_history_depth(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elemental_document::ChannelKind;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "flushDelayMs": 250,
            "autosave": false,
            "routing": { "method": "all", "channels": ["email", "sms"] },
            "variables": { "onInvalid": "remove", "invalidMessage": "Unknown variable" },
            "allowedMimeTypes": ["image/png"],
            "trackedNodeTypes": ["paragraph", "image"]
        }"#;

        let config = EditorConfig::from_json(json).unwrap();
        assert_eq!(config.flush_delay(), Duration::from_millis(250));
        assert!(!config.autosave);
        assert_eq!(config.routing.channels, vec![ChannelKind::Email, ChannelKind::Sms]);
        assert_eq!(config.variables.on_invalid, InvalidPolicy::Remove);
        assert_eq!(config.allowed_mime_types, vec!["image/png"]);
        assert_eq!(config.tracked_node_types, vec![NodeType::Paragraph, NodeType::Image]);
        assert_eq!(config.history_depth, 100);

        let validation = config.to_validation_config();
        assert_eq!(validation.on_invalid, InvalidPolicy::Remove);
        assert_eq!(
            validation.invalid_message.map(|m| m.render("x")),
            Some("Unknown variable".to_string())
        );
    }

    #[test]
    fn test_default_config() {
        let config = EditorConfig::default();
        assert_eq!(config.flush_delay_ms, 500);
        assert!(config.autosave);
        assert_eq!(config.routing.channels, vec![ChannelKind::Email]);
        assert_eq!(config.tracked_node_types.len(), 8);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(EditorConfig::load(dir.path()).unwrap(), EditorConfig::default());
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), r#"{ "flushDelayMs": 100 }"#).unwrap();

        let config = EditorConfig::load(dir.path()).unwrap();
        assert_eq!(config.flush_delay_ms, 100);
        assert!(config.autosave);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        assert!(matches!(
            EditorConfig::from_json(r#"{ "flushDelayMs": "soon" }"#),
            Err(EditorError::Config(_))
        ));
    }
}
