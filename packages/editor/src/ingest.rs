//! # File Drop / Paste Ingestion
//!
//! The gate sits at the editing-surface boundary. It decides whether a drop
//! or paste is ours to handle, and if so hands the accepted files plus an
//! insertion point to an upload collaborator.
//!
//! ```text
//! SurfaceEvent ──▶ resolve position ──▶ filter MIME ──▶ Handled(UploadRequest)
//!                        │                   │                  │
//!                        ▼                   ▼                  ▼
//!              Declined(Unresolvable)  Declined(NoAccepted)  spawn_upload
//!                                                               │
//!                                                     UploadHandle::join
//!                                                               │
//!                                          TemplateEditor::insert_uploaded_images
//! ```
//!
//! The gate itself does no I/O. Uploads run as tokio tasks with a
//! cancellation token, so an abandoned upload can be cancelled without
//! touching the tree afterwards.

use crate::selection::SelectionState;
use crate::tree::{NodeTree, NodeType, Position};
use bytes::Bytes;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_ALLOWED_MIME_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/gif", "image/webp"];

#[derive(Clone, PartialEq, Eq)]
pub struct FileItem {
    pub name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl FileItem {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }
}

impl fmt::Debug for FileItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileItem")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    Drop { x: f64, y: f64, files: Vec<FileItem> },
    Paste { files: Vec<FileItem> },
}

impl SurfaceEvent {
    pub fn files(&self) -> &[FileItem] {
        match self {
            SurfaceEvent::Drop { files, .. } | SurfaceEvent::Paste { files } => files,
        }
    }
}

/// The editing engine's coordinate-to-position lookup
pub trait CoordinateMapper {
    fn position_at(&self, x: f64, y: f64) -> Option<Position>;
}

impl<F> CoordinateMapper for F
where
    F: Fn(f64, f64) -> Option<Position>,
{
    fn position_at(&self, x: f64, y: f64) -> Option<Position> {
        self(x, y)
    }
}

/// Where new blocks go: child `index` of the node at `parent`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertionPoint {
    pub parent: Position,
    pub index: usize,
}

impl InsertionPoint {
    /// After the last block of the document
    pub fn end_of(tree: &NodeTree) -> Self {
        Self {
            parent: Position::root(),
            index: tree.children_len(tree.root()),
        }
    }

    /// Insertion point for a block dropped onto the node at `position`
    ///
    /// Containers that hold blocks (the document, a column) receive it at
    /// their end. Anything else gets it right after the nearest block whose
    /// parent can hold an image.
    pub fn for_position(tree: &NodeTree, position: &Position) -> Option<Self> {
        let mut key = tree.node_at(position)?;
        loop {
            let node = tree.get(key)?;
            if node.node_type().allows_child(NodeType::Image) {
                return Some(Self {
                    parent: tree.position_of(key)?,
                    index: node.children().len(),
                });
            }
            let parent_key = node.parent()?;
            let parent = tree.get(parent_key)?;
            if parent.node_type().allows_child(NodeType::Image) {
                let at = tree.position_of(key)?;
                return Some(Self {
                    parent: tree.position_of(parent_key)?,
                    index: at.index()? + 1,
                });
            }
            key = parent_key;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    /// The drop coordinate does not map to a place in the document
    Unresolvable,
    /// None of the files has an allowed type
    NoAcceptedFiles,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub files: Vec<FileItem>,
    pub point: InsertionPoint,
}

/// `Declined` lets default handling proceed; `Handled` suppresses it
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Declined(DeclineReason),
    Handled(UploadRequest),
}

impl GateDecision {
    pub fn is_handled(&self) -> bool {
        matches!(self, GateDecision::Handled(_))
    }
}

#[derive(Debug, Clone)]
pub struct IngestionGate {
    allowed: Vec<String>,
}

impl IngestionGate {
    /// Allowlist entries are exact MIME types or `type/*`
    pub fn new(allowed: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            allowed: allowed.into_iter().map(|s| s.into().to_ascii_lowercase()).collect(),
        }
    }

    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    pub fn accepts(&self, mime_type: &str) -> bool {
        let mime_type = mime_type.trim().to_ascii_lowercase();
        self.allowed.iter().any(|allowed| match allowed.strip_suffix("/*") {
            Some(family) => mime_type
                .split_once('/')
                .map(|(kind, _)| kind == family)
                .unwrap_or(false),
            None => *allowed == mime_type,
        })
    }

    pub fn filter(&self, files: &[FileItem]) -> Vec<FileItem> {
        files.iter().filter(|file| self.accepts(&file.mime_type)).cloned().collect()
    }

    /// Decide whether the surface event is handed to the uploader
    pub fn intercept(
        &self,
        event: &SurfaceEvent,
        mapper: &dyn CoordinateMapper,
        selection: &SelectionState,
        tree: &NodeTree,
    ) -> GateDecision {
        let point = match event {
            SurfaceEvent::Drop { x, y, .. } => mapper
                .position_at(*x, *y)
                .and_then(|position| InsertionPoint::for_position(tree, &position)),
            SurfaceEvent::Paste { .. } => match selection.selected() {
                Some(selected) => InsertionPoint::for_position(tree, &selected.position),
                None => Some(InsertionPoint::end_of(tree)),
            },
        };

        let Some(point) = point else {
            debug!("Declining surface event: position unresolvable");
            return GateDecision::Declined(DeclineReason::Unresolvable);
        };

        let files = self.filter(event.files());
        if files.is_empty() {
            debug!(offered = event.files().len(), "Declining surface event: no accepted files");
            return GateDecision::Declined(DeclineReason::NoAcceptedFiles);
        }

        info!(files = files.len(), parent = %point.parent, index = point.index, "Handing files to uploader");
        GateDecision::Handled(UploadRequest { files, point })
    }
}

impl Default for IngestionGate {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_MIME_TYPES)
    }
}

/// Credentials for the hosted upload API
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadConfig {
    pub api_url: String,
    pub token: String,
    pub tenant_id: String,
    pub client_key: String,
}

impl fmt::Debug for UploadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadConfig")
            .field("api_url", &self.api_url)
            .field("token", &"<redacted>")
            .field("tenant_id", &self.tenant_id)
            .field("client_key", &"<redacted>")
            .finish()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("Upload cancelled")]
    Cancelled,

    #[error("Upload of {file} failed: {message}")]
    Failed { file: String, message: String },

    #[error("Upload task failed: {0}")]
    Join(String),
}

/// Uploads one file and returns its hosted URL
pub trait ImageUploader: Send + Sync {
    fn upload<'a>(&'a self, file: &'a FileItem, config: &'a UploadConfig) -> BoxFuture<'a, Result<String, UploadError>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub point: InsertionPoint,
    /// Hosted URLs in file order
    pub urls: Vec<String>,
}

pub struct UploadHandle {
    token: CancellationToken,
    task: Option<JoinHandle<Result<UploadOutcome, UploadError>>>,
}

impl UploadHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait for every file; the first failure is returned as-is
    pub async fn join(mut self) -> Result<UploadOutcome, UploadError> {
        let Some(task) = self.task.take() else {
            return Err(UploadError::Cancelled);
        };
        match task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(UploadError::Cancelled),
            Err(e) => Err(UploadError::Join(e.to_string())),
        }
    }
}

impl Drop for UploadHandle {
    fn drop(&mut self) {
        // Nobody is left to receive the URLs
        if self.task.is_some() {
            self.token.cancel();
        }
    }
}

impl fmt::Debug for UploadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Start uploading the request's files in order on the current tokio runtime
pub fn spawn_upload(request: UploadRequest, uploader: Arc<dyn ImageUploader>, config: UploadConfig) -> UploadHandle {
    let token = CancellationToken::new();
    let task_token = token.clone();

    let task = tokio::spawn(async move {
        let UploadRequest { files, point } = request;
        let mut urls = Vec::with_capacity(files.len());

        for file in &files {
            tokio::select! {
                biased;

                _ = task_token.cancelled() => {
                    debug!(file = %file.name, "Upload cancelled");
                    return Err(UploadError::Cancelled);
                }

                result = uploader.upload(file, &config) => {
                    match result {
                        Ok(url) => urls.push(url),
                        Err(e) => {
                            warn!(file = %file.name, error = %e, "Upload failed");
                            return Err(e);
                        }
                    }
                }
            }
        }

        Ok(UploadOutcome { point, urls })
    });

    UploadHandle {
        token,
        task: Some(task),
    }
}
