//! # Elemental Editor
//!
//! Headless core of the multi-channel notification template editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ document: versioned multi-channel JSON      │
//! └─────────────────────────────────────────────┘
//!                     ↓ channel_to_tree
//! ┌─────────────────────────────────────────────┐
//! │ editor: TemplateEditor session              │
//! │  - Transactions of invertible steps         │
//! │  - Post-effects: node ids, variable checks  │
//! │  - Selection and property-form sync         │
//! │  - Debounced updates with flush on exit     │
//! │  - Per-channel undo, autosave, uploads      │
//! └─────────────────────────────────────────────┘
//!                     ↓ tree_to_elements
//! ┌─────────────────────────────────────────────┐
//! │ host: on_change listener or TemplateStore   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **The tree is the editing truth**: the document value is serialised
//!    from it after every commit
//! 2. **One snapshot per dispatch**: every post-effect reads the same
//!    post-transaction tree and their steps are merged into one follow-up
//! 3. **Nothing pending is lost**: leaving a channel, saving or closing
//!    flushes every debounced update first
//! 4. **Stale forms are harmless**: a form write for a node type that is no
//!    longer selected is a no-op
//!
//! ## Usage
//!
//! ```rust,ignore
//! use elemental_editor::{EditorOptions, Position, Step, TemplateEditor, Transaction};
//! use elemental_document::TemplateDocument;
//!
//! let document = TemplateDocument::load("welcome.json")?;
//! let mut editor = TemplateEditor::new(document, EditorOptions::new())?;
//!
//! editor.on_change(|value| println!("{}", value.to_json_pretty().unwrap()));
//! editor.dispatch(Transaction::user().with_step(Step::set_attr(
//!     Position::new(vec![0]),
//!     "align",
//!     serde_json::json!("center"),
//! )))?;
//!
//! editor.close()?;
//! ```

pub mod attribute_sync;
pub mod autosave;
pub mod config;
pub mod document;
mod errors;
pub mod flush;
pub mod identity;
pub mod ingest;
pub mod mutations;
pub mod post_effects;
pub mod routing;
pub mod selection;
mod session;
pub mod tree;
pub mod undo_stack;
pub mod variables;

pub use attribute_sync::{AttributeSyncBridge, FormFields, SyncOutcome};
pub use autosave::{Autosave, FileStore, MemoryStore, SaveStatus, StoreError, TemplateStore};
pub use config::{EditorConfig, VariableSettings, DEFAULT_CONFIG_NAME};
pub use document::{channel_to_tree, tree_to_elements, ConvertError};
pub use errors::EditorError;
pub use flush::{DebouncedUpdate, FlushRegistry, DEFAULT_FLUSH_DELAY};
pub use identity::{generate_id, IdentityAssigner, ID_PREFIX};
pub use ingest::{
    spawn_upload, CoordinateMapper, DeclineReason, FileItem, GateDecision, ImageUploader, IngestionGate,
    InsertionPoint, SurfaceEvent, UploadConfig, UploadError, UploadHandle, UploadOutcome, UploadRequest,
};
pub use mutations::{AttrPatch, Origin, Step, StepError, Transaction};
pub use post_effects::{EffectRun, Notice, PostEffect, PostEffectEngine};
pub use routing::{RoutingConfig, RoutingMethod, RoutingState, ValueMode};
pub use selection::{FormRequest, SelectedNode, Selection, SelectionState};
pub use session::{ChangeListener, DispatchResult, EditorOptions, FormUpdate, TemplateEditor};
pub use tree::{Attrs, Node, NodeKey, NodeSpec, NodeTree, NodeType, Position};
pub use undo_stack::{HistoryBatch, UndoStack};
pub use variables::{Commit, InvalidPolicy, Suggester, ValidationConfig, VariableValidator};

// Re-export the document model for convenience
pub use elemental_document::{ChannelBlock, ChannelKind, ContentElement, TemplateDocument};
