//! Error types for the editor

use elemental_document::{ChannelKind, DocumentError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Step error: {0}")]
    Step(#[from] crate::mutations::StepError),

    #[error("Conversion error: {0}")]
    Convert(#[from] crate::document::ConvertError),

    #[error("Store error: {0}")]
    Store(#[from] crate::autosave::StoreError),

    #[error("Invalid config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Channel {0} is not offered by the routing config")]
    ChannelNotRouted(ChannelKind),

    #[error("Cannot commit variable: {0}")]
    InvalidCommit(String),

    #[error("Editor session is closed")]
    Closed,
}
