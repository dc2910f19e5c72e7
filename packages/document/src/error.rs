//! Error types for document loading

use crate::ChannelKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document version must not be empty")]
    MissingVersion,

    #[error("Channel {0} appears more than once")]
    DuplicateChannel(ChannelKind),
}

pub type DocumentResult<T> = Result<T, DocumentError>;
