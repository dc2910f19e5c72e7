//! # Attribute Sync
//!
//! Binds a property form to "whichever node of type T is selected".
//!
//! ```text
//!  selection / document event            form submit (debounced)
//!            │                                     │
//!            ▼                                     ▼
//!   resolve block at anchor              resolve block at anchor
//!            │ type == T?                          │ type == T?
//!            ▼                                     ▼
//!   copy differing attrs ──▶ form        SetAttributes ──▶ dispatch
//! ```
//!
//! A type mismatch on either side is a silent no-op. The selection may move
//! between the moment a form is read and the moment it is written back.

use crate::errors::EditorError;
use crate::mutations::{AttrPatch, Step, Transaction};
use crate::selection::{SelectedNode, SelectionState};
use crate::session::TemplateEditor;
use crate::tree::{Attrs, NodeTree, NodeType};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Field storage of a property form
pub trait FormFields {
    fn get(&self, name: &str) -> Option<&Value>;
    fn set(&mut self, name: &str, value: Value);
}

impl FormFields for BTreeMap<String, Value> {
    fn get(&self, name: &str) -> Option<&Value> {
        BTreeMap::get(self, name)
    }

    fn set(&mut self, name: &str, value: Value) {
        self.insert(name.to_string(), value);
    }
}

impl FormFields for HashMap<String, Value> {
    fn get(&self, name: &str) -> Option<&Value> {
        HashMap::get(self, name)
    }

    fn set(&mut self, name: &str, value: Value) {
        self.insert(name.to_string(), value);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// This many fields were overwritten
    Updated(usize),
    /// The form already matched the node
    Unchanged,
    /// Nothing selected, or the selected node has another type
    NotApplicable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSyncBridge {
    target: NodeType,
}

impl AttributeSyncBridge {
    pub fn new(target: NodeType) -> Self {
        Self { target }
    }

    pub fn target(&self) -> NodeType {
        self.target
    }

    /// The selected block, if it has the bridge's type
    pub fn resolve(&self, tree: &NodeTree, selection: &SelectionState) -> Option<SelectedNode> {
        selection
            .resolve_block(tree)
            .filter(|block| block.node_type == self.target)
    }

    /// Copy the selected node's attributes into the form where they differ
    pub fn sync_form(&self, tree: &NodeTree, selection: &SelectionState, form: &mut impl FormFields) -> SyncOutcome {
        let Some(node) = self
            .resolve(tree, selection)
            .and_then(|selected| tree.get(selected.key))
        else {
            return SyncOutcome::NotApplicable;
        };

        let mut updated = 0;
        for (name, value) in node.attrs() {
            if form.get(name) != Some(value) {
                form.set(name, value.clone());
                updated += 1;
            }
        }

        if updated == 0 {
            SyncOutcome::Unchanged
        } else {
            SyncOutcome::Updated(updated)
        }
    }

    /// Write form values to the selected node as one transaction
    ///
    /// Returns `Ok(false)` without touching the tree when nothing of the
    /// bridge's type is selected or no value differs. The `id` attribute is
    /// never overwritten.
    pub fn update_node_attributes(&self, editor: &mut TemplateEditor, attrs: Attrs) -> Result<bool, EditorError> {
        let Some(selected) = self.resolve(editor.tree(), editor.selection_state()) else {
            debug!(target_type = %self.target, "Selection does not match form; skipping update");
            return Ok(false);
        };
        let Some(node) = editor.tree().get(selected.key) else {
            return Ok(false);
        };

        let mut patch = AttrPatch::new();
        for (name, value) in attrs {
            if name == "id" {
                if node.id().is_some_and(|id| Some(id) != value.as_str()) {
                    warn!(node = %selected.position, "Ignoring attempt to change a node id");
                }
                continue;
            }
            if node.attr(&name) != Some(&value) {
                patch.insert(name, Some(value));
            }
        }

        if patch.is_empty() {
            return Ok(false);
        }

        editor.dispatch(Transaction::user().with_step(Step::SetAttributes {
            at: selected.position,
            attrs: patch,
        }))?;
        Ok(true)
    }
}
