use crate::ContentElement;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Delivery channel a block of content is written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Email,
    Sms,
    Push,
    Inbox,
    Slack,
    Msteams,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 6] = [
        ChannelKind::Email,
        ChannelKind::Sms,
        ChannelKind::Push,
        ChannelKind::Inbox,
        ChannelKind::Slack,
        ChannelKind::Msteams,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Email => "email",
            ChannelKind::Sms => "sms",
            ChannelKind::Push => "push",
            ChannelKind::Inbox => "inbox",
            ChannelKind::Slack => "slack",
            ChannelKind::Msteams => "msteams",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChannelKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown channel: {}", s))
    }
}

/// Content written for one channel
///
/// Serialised as `{"type": "channel", "channel": "email", "elements": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "channel")]
pub struct ChannelBlock {
    pub channel: ChannelKind,

    #[serde(default)]
    pub elements: Vec<ContentElement>,
}

impl ChannelBlock {
    pub fn new(channel: ChannelKind) -> Self {
        Self {
            channel,
            elements: Vec::new(),
        }
    }

    pub fn with_elements(channel: ChannelKind, elements: Vec<ContentElement>) -> Self {
        Self { channel, elements }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_block_carries_type_tag() {
        let block = ChannelBlock::new(ChannelKind::Msteams);
        let json = serde_json::to_value(&block).unwrap();

        assert_eq!(json["type"], "channel");
        assert_eq!(json["channel"], "msteams");
    }

    #[test]
    fn test_channel_kind_from_str() {
        assert_eq!("SMS".parse::<ChannelKind>().unwrap(), ChannelKind::Sms);
        assert!("fax".parse::<ChannelKind>().is_err());
    }

    #[test]
    fn test_rejects_wrong_block_tag() {
        let json = r#"{"type": "group", "channel": "email", "elements": []}"#;
        assert!(serde_json::from_str::<ChannelBlock>(json).is_err());
    }
}
