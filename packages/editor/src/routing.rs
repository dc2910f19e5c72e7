//! Channel routing and value ownership
//!
//! A document holds one channel block per channel. Only the active channel is
//! mounted as an editing tree; the others stay untouched in the document, so
//! switching tabs never loses edits.

use crate::errors::EditorError;
use elemental_document::ChannelKind;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMethod {
    /// Deliver on the first channel that works
    #[default]
    Single,
    /// Deliver on every channel
    All,
}

/// Which channel tabs the editor offers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingConfig {
    #[serde(default)]
    pub method: RoutingMethod,

    #[serde(default = "default_channels")]
    pub channels: Vec<ChannelKind>,
}

fn default_channels() -> Vec<ChannelKind> {
    vec![ChannelKind::Email]
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            method: RoutingMethod::default(),
            channels: default_channels(),
        }
    }
}

impl RoutingConfig {
    pub fn new(method: RoutingMethod, channels: Vec<ChannelKind>) -> Self {
        Self { method, channels }
    }

    pub fn offers(&self, channel: ChannelKind) -> bool {
        self.channels.contains(&channel)
    }
}

/// Who owns the document value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueMode {
    /// The host supplies every value; edits are only reported upward
    Controlled,
    /// The editor's state is authoritative and autosaves itself
    #[default]
    Uncontrolled,
}

#[derive(Debug, Clone)]
pub struct RoutingState {
    config: RoutingConfig,
    active: ChannelKind,
}

impl RoutingState {
    /// Start on the first offered channel (email when none are offered)
    pub fn new(config: RoutingConfig) -> Self {
        let active = config.channels.first().copied().unwrap_or(ChannelKind::Email);
        Self { config, active }
    }

    pub fn active(&self) -> ChannelKind {
        self.active
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    pub fn channels(&self) -> &[ChannelKind] {
        &self.config.channels
    }

    pub fn offers(&self, channel: ChannelKind) -> bool {
        self.config.offers(channel)
    }

    /// Switch the active channel; returns false if it already was active
    pub fn set_active(&mut self, channel: ChannelKind) -> Result<bool, EditorError> {
        if !self.offers(channel) {
            return Err(EditorError::ChannelNotRouted(channel));
        }
        if self.active == channel {
            return Ok(false);
        }
        debug!(from = %self.active, to = %channel, "Switching channel");
        self.active = channel;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: RoutingConfig = serde_json::from_str(r#"{"channels": ["sms", "push"]}"#).unwrap();
        assert_eq!(config.method, RoutingMethod::Single);
        assert_eq!(config.channels, vec![ChannelKind::Sms, ChannelKind::Push]);

        let config: RoutingConfig = serde_json::from_str(r#"{"method": "all"}"#).unwrap();
        assert_eq!(config.method, RoutingMethod::All);
        assert_eq!(config.channels, vec![ChannelKind::Email]);
    }

    #[test]
    fn test_set_active_requires_offered_channel() {
        let mut state = RoutingState::new(RoutingConfig::new(
            RoutingMethod::Single,
            vec![ChannelKind::Email, ChannelKind::Sms],
        ));

        assert_eq!(state.active(), ChannelKind::Email);
        assert!(state.set_active(ChannelKind::Sms).unwrap());
        assert!(!state.set_active(ChannelKind::Sms).unwrap());
        assert!(matches!(
            state.set_active(ChannelKind::Slack),
            Err(EditorError::ChannelNotRouted(ChannelKind::Slack))
        ));
        assert_eq!(state.active(), ChannelKind::Sms);
    }
}
