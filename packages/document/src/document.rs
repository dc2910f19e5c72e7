//! # Template Document
//!
//! Root of the persisted template format. This JSON shape is the only
//! contract shared with storage backends and HTML converters, so loading is
//! strict: anything that does not match the schema fails instead of being
//! coerced.

use crate::{ChannelBlock, ChannelKind, DocumentError, DocumentResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

pub const DEFAULT_VERSION: &str = "2022-01-01";

/// Versioned multi-channel template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDocument {
    pub version: String,

    #[serde(default)]
    pub elements: Vec<ChannelBlock>,
}

impl TemplateDocument {
    /// Create a document with one empty block per channel
    pub fn empty(channels: &[ChannelKind]) -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            elements: channels.iter().copied().map(ChannelBlock::new).collect(),
        }
    }

    /// Parse and validate a document from JSON
    pub fn from_json(source: &str) -> DocumentResult<Self> {
        let document: TemplateDocument = serde_json::from_str(source)?;
        document.validate()?;
        debug!(
            version = %document.version,
            channels = document.elements.len(),
            "Loaded template document"
        );
        Ok(document)
    }

    /// Load and validate a document from a JSON file
    pub fn load(path: impl AsRef<Path>) -> DocumentResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_json(&source)
    }

    pub fn to_json_pretty(&self) -> DocumentResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Structural checks that serde cannot express
    pub fn validate(&self) -> DocumentResult<()> {
        if self.version.trim().is_empty() {
            return Err(DocumentError::MissingVersion);
        }

        let mut seen = HashSet::new();
        for block in &self.elements {
            if !seen.insert(block.channel) {
                return Err(DocumentError::DuplicateChannel(block.channel));
            }
        }

        Ok(())
    }

    pub fn channel(&self, kind: ChannelKind) -> Option<&ChannelBlock> {
        self.elements.iter().find(|block| block.channel == kind)
    }

    pub fn channel_mut(&mut self, kind: ChannelKind) -> Option<&mut ChannelBlock> {
        self.elements.iter_mut().find(|block| block.channel == kind)
    }

    /// Get the block for a channel, appending an empty one if missing
    pub fn ensure_channel(&mut self, kind: ChannelKind) -> &mut ChannelBlock {
        let index = match self.elements.iter().position(|block| block.channel == kind) {
            Some(index) => index,
            None => {
                self.elements.push(ChannelBlock::new(kind));
                self.elements.len() - 1
            }
        };
        &mut self.elements[index]
    }

    /// Channels present in the document, in document order
    pub fn channels(&self) -> Vec<ChannelKind> {
        self.elements.iter().map(|block| block.channel).collect()
    }
}

impl Default for TemplateDocument {
    fn default() -> Self {
        Self::empty(&[ChannelKind::Email])
    }
}
