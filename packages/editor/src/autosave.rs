//! Debounced persistence of the template document
//!
//! Every change to the value schedules a save; rapid edits collapse into one
//! write of the latest document. The save runs through the session's flush
//! registry, so closing the session writes whatever is still pending.

use crate::flush::{lock, DebouncedUpdate, FlushRegistry};
use chrono::{DateTime, Utc};
use elemental_document::{DocumentError, TemplateDocument};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

pub const AUTOSAVE_FLUSH_ID: &str = "autosave";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Save rejected: {0}")]
    Rejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),
}

/// Where saved templates go
pub trait TemplateStore: Send + Sync {
    fn save(&self, document: &TemplateDocument) -> Result<(), StoreError>;
}

/// Keeps every saved revision in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    saved: Mutex<Vec<TemplateDocument>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<TemplateDocument> {
        lock(&self.saved).last().cloned()
    }

    pub fn count(&self) -> usize {
        lock(&self.saved).len()
    }
}

impl TemplateStore for MemoryStore {
    fn save(&self, document: &TemplateDocument) -> Result<(), StoreError> {
        lock(&self.saved).push(document.clone());
        Ok(())
    }
}

/// Writes the document as pretty JSON to a single file
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TemplateStore for FileStore {
    fn save(&self, document: &TemplateDocument) -> Result<(), StoreError> {
        let json = document.to_json_pretty()?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SaveStatus {
    Idle,
    Pending,
    Saved { at: DateTime<Utc> },
    Error { message: String },
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveStatus::Idle => f.write_str("idle"),
            SaveStatus::Pending => f.write_str("saving..."),
            SaveStatus::Saved { at } => write!(f, "saved at {}", at.format("%H:%M:%S")),
            SaveStatus::Error { message } => write!(f, "save failed: {}", message),
        }
    }
}

pub(crate) type SharedStatus = Arc<Mutex<SaveStatus>>;

/// Write the document and record the outcome
pub(crate) fn save_now(store: &dyn TemplateStore, status: &SharedStatus, document: &TemplateDocument) -> Result<(), StoreError> {
    match store.save(document) {
        Ok(()) => {
            let at = Utc::now();
            info!(%at, "Template saved");
            *lock(status) = SaveStatus::Saved { at };
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Template save failed");
            *lock(status) = SaveStatus::Error { message: e.to_string() };
            Err(e)
        }
    }
}

pub struct Autosave {
    update: DebouncedUpdate<TemplateDocument>,
    status: SharedStatus,
}

impl Autosave {
    pub fn new(registry: &FlushRegistry, delay: Duration, store: Arc<dyn TemplateStore>, status: SharedStatus) -> Self {
        let save_status = status.clone();
        let update = DebouncedUpdate::new(AUTOSAVE_FLUSH_ID, delay, registry, move |document: TemplateDocument| {
            // Failures are recorded in the status
            let _ = save_now(store.as_ref(), &save_status, &document);
        });
        Self { update, status }
    }

    pub fn schedule(&self, document: TemplateDocument) {
        *lock(&self.status) = SaveStatus::Pending;
        self.update.trigger(document);
    }

    /// Save the pending document now; returns false if nothing was pending
    pub fn flush(&self) -> bool {
        self.update.execute_update()
    }

    pub fn has_pending(&self) -> bool {
        self.update.has_pending()
    }

    /// Drop the pending document; an explicit save is about to write it
    pub fn cancel(&self) {
        self.update.cancel();
    }

    pub fn status(&self) -> SaveStatus {
        lock(&self.status).clone()
    }
}

impl fmt::Debug for Autosave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Autosave")
            .field("update", &self.update)
            .field("status", &self.status())
            .finish()
    }
}
