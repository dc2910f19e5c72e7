//! # Edit Session
//!
//! [`TemplateEditor`] owns one template document and the editing state around
//! it: the mounted tree of the active channel, the selection, per-channel
//! history, post-effects, the flush registry and autosave.
//!
//! ## Dispatch
//!
//! ```text
//! Transaction ─▶ apply ─▶ post-effects ─▶ write back ─▶ history
//!                  │           │              │
//!                  └── rollback on failure ◀──┘
//!                                             ─▶ selection refresh
//!                                             ─▶ on_change listeners
//!                                             ─▶ autosave (uncontrolled)
//! ```
//!
//! Every handler of one dispatch sees the same post-transaction tree. The
//! document value is kept current after every commit, so [`value`] never
//! needs to rebuild anything.
//!
//! ## Value ownership
//!
//! - **Uncontrolled**: the session is authoritative; external values are
//!   ignored and autosave persists edits
//! - **Controlled**: the host passes every value through [`set_value`] and
//!   persists it; edits are only reported through `on_change`
//!
//! [`value`]: TemplateEditor::value
//! [`set_value`]: TemplateEditor::set_value

use crate::attribute_sync::AttributeSyncBridge;
use crate::autosave::{save_now, Autosave, SaveStatus, SharedStatus, TemplateStore};
use crate::config::EditorConfig;
use crate::document::{channel_to_tree, tree_to_elements};
use crate::errors::EditorError;
use crate::flush::{lock, DebouncedUpdate, FlushRegistry};
use crate::identity::IdentityAssigner;
use crate::ingest::{CoordinateMapper, GateDecision, IngestionGate, InsertionPoint, SurfaceEvent};
use crate::mutations::{Origin, Step, StepError, Transaction};
use crate::post_effects::{EffectRun, Notice, PostEffectEngine};
use crate::routing::{RoutingState, ValueMode};
use crate::selection::{resolve_click, FormRequest, SelectedNode, Selection, SelectionState};
use crate::tree::{Attrs, NodeSpec, NodeTree, NodeType, Position};
use crate::undo_stack::UndoStack;
use crate::variables::{Commit, Suggester, ValidationConfig, VariableValidator};
use elemental_document::{ChannelBlock, ChannelKind, ContentElement, TemplateDocument};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

pub type ChangeListener = Box<dyn Fn(&TemplateDocument) + Send + Sync>;

/// Attribute values submitted by a property form
#[derive(Debug, Clone, PartialEq)]
pub struct FormUpdate {
    pub target: NodeType,
    pub attrs: Attrs,
}

type FormInbox = Arc<Mutex<Vec<FormUpdate>>>;

pub struct EditorOptions {
    pub mode: ValueMode,
    pub config: EditorConfig,
    pub store: Option<Arc<dyn TemplateStore>>,
    /// Overrides the declarative settings in `config.variables`
    pub validation: Option<ValidationConfig>,
    /// Example data for the suggestion list
    pub variables: Value,
}

impl EditorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn controlled() -> Self {
        Self::default().with_mode(ValueMode::Controlled)
    }

    pub fn with_mode(mut self, mode: ValueMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_config(mut self, config: EditorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn TemplateStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_validation(mut self, validation: ValidationConfig) -> Self {
        self.validation = Some(validation);
        self
    }

    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = variables;
        self
    }
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            mode: ValueMode::Uncontrolled,
            config: EditorConfig::default(),
            store: None,
            validation: None,
            variables: Value::Null,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchResult {
    pub changed: bool,
    /// Notices raised by this dispatch only
    pub notices: Vec<Notice>,
}

pub struct TemplateEditor {
    id: String,
    document: TemplateDocument,
    tree: NodeTree,
    routing: RoutingState,
    mode: ValueMode,
    selection: SelectionState,
    histories: HashMap<ChannelKind, UndoStack>,
    /// Trees of channels switched away from; history positions refer to them
    parked: HashMap<ChannelKind, NodeTree>,
    identity: IdentityAssigner,
    effects: PostEffectEngine,
    flush: FlushRegistry,
    autosave: Option<Autosave>,
    store: Option<Arc<dyn TemplateStore>>,
    status: SharedStatus,
    forms: FormInbox,
    listeners: Vec<ChangeListener>,
    suggester: Suggester,
    gate: IngestionGate,
    config: EditorConfig,
    notices: Vec<Notice>,
    version: u64,
    closed: bool,
}

impl TemplateEditor {
    /// Open a session on `document`
    ///
    /// The document is validated up front. The active channel is mounted and
    /// its nodes are identified and validated before this returns.
    pub fn new(document: TemplateDocument, options: EditorOptions) -> Result<Self, EditorError> {
        document.validate()?;

        let EditorOptions {
            mode,
            config,
            store,
            validation,
            variables,
        } = options;

        let identity = IdentityAssigner::new(config.tracked_node_types.iter().copied());
        let validation = validation.unwrap_or_else(|| config.to_validation_config());
        let effects = PostEffectEngine::with_effects(identity.clone(), VariableValidator::new(validation));

        let flush = FlushRegistry::new();
        let status: SharedStatus = Arc::new(Mutex::new(SaveStatus::Idle));
        let autosave = match (&store, mode) {
            (Some(store), ValueMode::Uncontrolled) if config.autosave => {
                Some(Autosave::new(&flush, config.flush_delay(), store.clone(), status.clone()))
            }
            _ => None,
        };

        let mut suggester = Suggester::from_variables(&variables);
        suggester.set_disabled(config.variables.disabled);

        let mut editor = Self {
            id: format!("session-{}", Uuid::new_v4()),
            document,
            tree: NodeTree::new(),
            routing: RoutingState::new(config.routing.clone()),
            mode,
            selection: SelectionState::new(),
            histories: HashMap::new(),
            parked: HashMap::new(),
            identity,
            effects,
            flush,
            autosave,
            store,
            status,
            forms: Arc::new(Mutex::new(Vec::new())),
            listeners: Vec::new(),
            suggester,
            gate: IngestionGate::new(config.allowed_mime_types.iter().cloned()),
            config,
            notices: Vec::new(),
            version: 0,
            closed: false,
        };
        editor.mount()?;

        info!(session = %editor.id, channel = %editor.routing.active(), ?mode, "Editor session opened");
        Ok(editor)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current full document, every channel included
    pub fn value(&self) -> &TemplateDocument {
        &self.document
    }

    /// Mounted tree of the active channel
    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    pub fn mode(&self) -> ValueMode {
        self.mode
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Bumped on every committed change
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn active_channel(&self) -> ChannelKind {
        self.routing.active()
    }

    pub fn channels(&self) -> &[ChannelKind] {
        self.routing.channels()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn on_change(&mut self, listener: impl Fn(&TemplateDocument) + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Apply a transaction and everything that follows from it
    #[instrument(skip(self, transaction), fields(session = %self.id, origin = ?transaction.origin, steps = transaction.steps.len()))]
    pub fn dispatch(&mut self, transaction: Transaction) -> Result<DispatchResult, EditorError> {
        self.ensure_open()?;
        if transaction.is_empty() {
            return Ok(DispatchResult::default());
        }

        let inverses = transaction.apply(&mut self.tree)?;

        let run = match self.effects.run(&mut self.tree) {
            Ok(run) => run,
            Err(e) => {
                rollback(&mut self.tree, &inverses);
                return Err(e.into());
            }
        };

        if let Err(e) = self.write_back() {
            rollback(&mut self.tree, &run.inverses);
            rollback(&mut self.tree, &inverses);
            return Err(e);
        }

        if transaction.add_to_history {
            let mut steps = transaction.steps;
            steps.extend(run.steps);
            let mut undo = run.inverses;
            undo.extend(inverses);
            self.history_mut().record(steps, undo);
        }

        self.selection.refresh(&self.tree);
        self.notices.extend(run.notices.iter().cloned());
        self.publish();

        Ok(DispatchResult {
            changed: true,
            notices: run.notices,
        })
    }

    /// Replace the value from outside; only honoured in controlled mode
    pub fn set_value(&mut self, document: TemplateDocument) -> Result<bool, EditorError> {
        self.ensure_open()?;
        if self.mode == ValueMode::Uncontrolled {
            debug!(session = %self.id, "Ignoring external value in uncontrolled mode");
            return Ok(false);
        }
        document.validate()?;

        let previous = std::mem::replace(&mut self.document, document);
        match self.mount() {
            Ok(stamped) => {
                self.histories.clear();
                self.parked.clear();
                if stamped {
                    // Report assigned ids back to the owner
                    self.publish();
                }
                Ok(true)
            }
            Err(e) => {
                self.document = previous;
                Err(e)
            }
        }
    }

    /// Switch the mounted channel; edits in other channels stay in the value
    pub fn set_active_channel(&mut self, channel: ChannelKind) -> Result<bool, EditorError> {
        self.ensure_open()?;
        let previous = self.routing.active();
        if previous == channel {
            return Ok(false);
        }
        if !self.routing.offers(channel) {
            return Err(EditorError::ChannelNotRouted(channel));
        }

        // Pending form edits belong to the channel being left
        self.flush_all()?;

        self.routing.set_active(channel)?;
        let leaving = std::mem::replace(&mut self.tree, NodeTree::new());
        self.parked.insert(previous, leaving);
        match self.mount() {
            Ok(stamped) => {
                if stamped {
                    self.publish();
                }
                Ok(true)
            }
            Err(e) => {
                self.routing.set_active(previous)?;
                if let Some(tree) = self.parked.remove(&previous) {
                    self.tree = tree;
                }
                Err(e)
            }
        }
    }

    pub fn set_selection(&mut self, selection: &Selection) -> Option<SelectedNode> {
        self.selection.set(&self.tree, selection).cloned()
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn selected_node(&self) -> Option<&SelectedNode> {
        self.selection.selected()
    }

    pub fn selection_state(&self) -> &SelectionState {
        &self.selection
    }

    /// Which form a click at `position` should open
    pub fn click(&self, position: &Position) -> Option<FormRequest> {
        resolve_click(&self.tree, position)
    }

    /// Write form values to the selected node if it has type `target`
    pub fn update_node_attributes(&mut self, target: NodeType, attrs: Attrs) -> Result<bool, EditorError> {
        AttributeSyncBridge::new(target).update_node_attributes(self, attrs)
    }

    /// Debounced form writer registered in this session's flush registry
    ///
    /// Expired or flushed values are queued and applied by
    /// [`apply_form_updates`](Self::apply_form_updates); `flush_all`, `save`
    /// and `close` apply them automatically.
    pub fn debounced_form(&self, id: impl Into<String>, target: NodeType) -> DebouncedUpdate<Attrs> {
        let inbox = self.forms.clone();
        DebouncedUpdate::new(id, self.config.flush_delay(), &self.flush, move |attrs: Attrs| {
            lock(&inbox).push(FormUpdate { target, attrs });
        })
    }

    /// Apply queued form updates; returns how many changed the tree
    pub fn apply_form_updates(&mut self) -> Result<usize, EditorError> {
        let updates: Vec<FormUpdate> = std::mem::take(&mut *lock(&self.forms));
        let mut applied = 0;
        for update in updates {
            if AttributeSyncBridge::new(update.target).update_node_attributes(self, update.attrs)? {
                applied += 1;
            }
        }
        Ok(applied)
    }

    pub fn undo(&mut self) -> Result<bool, EditorError> {
        self.ensure_open()?;
        let active = self.routing.active();
        let Some(history) = self.histories.get_mut(&active) else {
            return Ok(false);
        };
        if !history.undo(&mut self.tree)? {
            return Ok(false);
        }
        self.after_replay()?;
        Ok(true)
    }

    pub fn redo(&mut self) -> Result<bool, EditorError> {
        self.ensure_open()?;
        let active = self.routing.active();
        let Some(history) = self.histories.get_mut(&active) else {
            return Ok(false);
        };
        if !history.redo(&mut self.tree)? {
            return Ok(false);
        }
        self.after_replay()?;
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        self.histories
            .get(&self.routing.active())
            .map(UndoStack::can_undo)
            .unwrap_or(false)
    }

    pub fn can_redo(&self) -> bool {
        self.histories
            .get(&self.routing.active())
            .map(UndoStack::can_redo)
            .unwrap_or(false)
    }

    /// Identify every tracked node now; returns how many got an id
    pub fn assign_node_ids(&mut self) -> Result<usize, EditorError> {
        let Some(transaction) = self.identity.plan(&self.tree) else {
            return Ok(0);
        };
        let count = transaction.steps.len();
        self.dispatch(transaction)?;
        Ok(count)
    }

    /// Swap the validation config and re-validate every chip
    pub fn set_validation(&mut self, validation: ValidationConfig) -> Result<DispatchResult, EditorError> {
        self.ensure_open()?;
        self.effects = PostEffectEngine::with_effects(self.identity.clone(), VariableValidator::new(validation));

        let run = self.effects.run(&mut self.tree)?;
        if run.steps.is_empty() {
            self.notices.extend(run.notices.iter().cloned());
            return Ok(DispatchResult {
                changed: false,
                notices: run.notices,
            });
        }
        if let Err(e) = self.write_back() {
            rollback(&mut self.tree, &run.inverses);
            return Err(e);
        }
        self.selection.refresh(&self.tree);
        self.notices.extend(run.notices.iter().cloned());
        self.publish();
        Ok(DispatchResult {
            changed: true,
            notices: run.notices,
        })
    }

    pub fn suggester(&self) -> &Suggester {
        &self.suggester
    }

    pub fn suggester_mut(&mut self) -> &mut Suggester {
        &mut self.suggester
    }

    pub fn set_variables(&mut self, variables: &Value) {
        let mut suggester = Suggester::from_variables(variables);
        suggester.set_disabled(self.config.variables.disabled);
        self.suggester = suggester;
    }

    /// Replace the typed `{{...` in the text run at `at` with a chip
    ///
    /// `commit.from..commit.to` are byte offsets into that text run.
    pub fn commit_variable(&mut self, at: &Position, commit: &Commit) -> Result<DispatchResult, EditorError> {
        self.ensure_open()?;
        let key = self
            .tree
            .node_at(at)
            .ok_or_else(|| StepError::NodeNotFound(at.clone()))?;
        let node = self.tree.get(key).ok_or_else(|| StepError::NodeNotFound(at.clone()))?;
        if node.node_type() != NodeType::Text {
            return Err(StepError::NotText(at.clone()).into());
        }

        let text = node.text().unwrap_or_default();
        let (from, to) = (commit.from, commit.to);
        if from > to || to > text.len() || !text.is_char_boundary(from) || !text.is_char_boundary(to) {
            return Err(EditorError::InvalidCommit(format!(
                "range {}..{} does not fit a text run of {} bytes",
                from,
                to,
                text.len()
            )));
        }
        let before = text[..from].to_string();
        let after = text[to..].to_string();

        let parent = at.parent().ok_or(StepError::RootImmutable)?;
        let mut index = at.index().ok_or(StepError::RootImmutable)?;

        let mut transaction = Transaction::user();
        if before.is_empty() {
            transaction.push(Step::RemoveNode { at: at.clone() });
        } else {
            transaction.push(Step::SetText {
                at: at.clone(),
                text: before,
            });
            index += 1;
        }
        transaction.push(Step::InsertNode {
            parent: parent.clone(),
            index,
            node: NodeSpec::variable(commit.name.clone()),
        });
        if !after.is_empty() {
            transaction.push(Step::InsertNode {
                parent,
                index: index + 1,
                node: NodeSpec::text(after),
            });
        }

        self.suggester.close();
        debug!(variable = %commit.name, at = %at, "Committing variable chip");
        self.dispatch(transaction)
    }

    /// Run a drop or paste through the ingestion gate
    pub fn intercept(&self, event: &SurfaceEvent, mapper: &dyn CoordinateMapper) -> GateDecision {
        self.gate.intercept(event, mapper, &self.selection, &self.tree)
    }

    /// Insert one image block per uploaded URL at `point`
    pub fn insert_uploaded_images(&mut self, point: &InsertionPoint, urls: &[String]) -> Result<DispatchResult, EditorError> {
        let mut transaction = Transaction::new(Origin::Upload);
        for (offset, url) in urls.iter().enumerate() {
            transaction.push(Step::InsertNode {
                parent: point.parent.clone(),
                index: point.index + offset,
                node: NodeSpec::new(NodeType::Image).with_attr("src", Value::String(url.clone())),
            });
        }
        self.dispatch(transaction)
    }

    pub fn flush_registry(&self) -> &FlushRegistry {
        &self.flush
    }

    /// Deliver every pending debounced update now
    ///
    /// Form updates land in the tree; if that schedules another autosave it
    /// is written immediately as well. Returns how many flush functions ran.
    pub fn flush_all(&mut self) -> Result<usize, EditorError> {
        let flushed = self.flush.flush_all();
        if self.apply_form_updates()? > 0 {
            if let Some(autosave) = &self.autosave {
                autosave.flush();
            }
        }
        Ok(flushed)
    }

    /// Save now; returns false when no store is configured
    pub fn save(&mut self) -> Result<bool, EditorError> {
        self.ensure_open()?;
        let Some(store) = self.store.clone() else {
            debug!(session = %self.id, "No store configured; nothing to save");
            return Ok(false);
        };

        self.cancel_autosave();
        self.flush.flush_all();
        self.apply_form_updates()?;
        self.cancel_autosave();

        save_now(store.as_ref(), &self.status, &self.document)?;
        Ok(true)
    }

    pub fn save_status(&self) -> SaveStatus {
        lock(&self.status).clone()
    }

    /// Notices raised since the last drain
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Flush everything and end the session
    pub fn close(&mut self) -> Result<(), EditorError> {
        if self.closed {
            return Ok(());
        }
        let result = self.flush_all();
        self.closed = true;
        self.listeners.clear();
        self.autosave = None;
        info!(session = %self.id, version = self.version, "Editor session closed");
        result.map(|_| ())
    }

    fn ensure_open(&self) -> Result<(), EditorError> {
        if self.closed {
            Err(EditorError::Closed)
        } else {
            Ok(())
        }
    }

    /// Build, identify and validate the active channel's tree
    ///
    /// A parked tree is resumed as is; otherwise the channel is parsed from
    /// the value. Nothing is replaced unless every stage succeeds. Returns
    /// whether the post-effects changed the mounted channel.
    fn mount(&mut self) -> Result<bool, EditorError> {
        let active = self.routing.active();
        let parked = self.parked.remove(&active);
        let resumed = parked.is_some();
        let mut tree = match parked {
            Some(tree) => tree,
            None => {
                let block = self
                    .document
                    .channel(active)
                    .cloned()
                    .unwrap_or_else(|| ChannelBlock::new(active));
                channel_to_tree(&block)?
            }
        };

        let (run, elements) = match stage(&self.effects, &mut tree) {
            Ok(staged) => staged,
            Err(e) => {
                if resumed {
                    self.parked.insert(active, tree);
                }
                return Err(e);
            }
        };

        self.tree = tree;
        self.document.ensure_channel(active).elements = elements;
        self.selection.clear();
        self.notices.extend(run.notices);

        debug!(channel = %active, nodes = self.tree.len(), "Mounted channel");
        Ok(!run.steps.is_empty())
    }

    /// Serialise the mounted tree into the document
    fn write_back(&mut self) -> Result<(), EditorError> {
        let elements = tree_to_elements(&self.tree)?;
        self.document.ensure_channel(self.routing.active()).elements = elements;
        Ok(())
    }

    fn after_replay(&mut self) -> Result<(), EditorError> {
        self.write_back()?;
        self.selection.refresh(&self.tree);
        self.publish();
        Ok(())
    }

    /// Announce a committed change
    fn publish(&mut self) {
        self.version += 1;
        for listener in &self.listeners {
            listener(&self.document);
        }
        if self.mode == ValueMode::Uncontrolled {
            if let Some(autosave) = &self.autosave {
                autosave.schedule(self.document.clone());
            }
        }
    }

    fn cancel_autosave(&self) {
        if let Some(autosave) = &self.autosave {
            autosave.cancel();
        }
    }

    fn history_mut(&mut self) -> &mut UndoStack {
        let depth = self.config.history_depth;
        self.histories
            .entry(self.routing.active())
            .or_insert_with(|| UndoStack::with_max_levels(depth))
    }
}

/// Run the post-effects on `tree` and serialise it; `tree` is untouched on error
fn stage(effects: &PostEffectEngine, tree: &mut NodeTree) -> Result<(EffectRun, Vec<ContentElement>), EditorError> {
    let run = effects.run(tree)?;
    match tree_to_elements(tree) {
        Ok(elements) => Ok((run, elements)),
        Err(e) => {
            rollback(tree, &run.inverses);
            Err(e.into())
        }
    }
}

fn rollback(tree: &mut NodeTree, inverses: &[Step]) {
    for inverse in inverses {
        if let Err(e) = inverse.apply(tree) {
            error!(error = %e, "Rollback step failed");
        }
    }
}

impl Drop for TemplateEditor {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(session = %self.id, error = %e, "Flush on drop failed");
        }
    }
}

impl fmt::Debug for TemplateEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateEditor")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("channel", &self.routing.active())
            .field("version", &self.version)
            .field("nodes", &self.tree.len())
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autosave::MemoryStore;
    use elemental_document::{ContentElement, TextElement};
    use serde_json::json;

    fn document() -> TemplateDocument {
        let mut document = TemplateDocument::empty(&[ChannelKind::Email]);
        document.ensure_channel(ChannelKind::Email).elements =
            vec![ContentElement::Text(TextElement::new("Hello {{user.firstName}}!"))];
        document
    }

    #[test]
    fn test_mount_assigns_ids_into_value() {
        let editor = TemplateEditor::new(document(), EditorOptions::new()).unwrap();

        let email = editor.value().channel(ChannelKind::Email).unwrap();
        assert!(email.elements[0].id().is_some_and(|id| id.starts_with("node-")));
        assert_eq!(editor.version(), 0);
    }

    #[test]
    fn test_dispatch_notifies_and_records_history() {
        let mut editor = TemplateEditor::new(document(), EditorOptions::new()).unwrap();
        let seen = Arc::new(Mutex::new(0));
        let counter = seen.clone();
        editor.on_change(move |_| *lock(&counter) += 1);

        editor
            .dispatch(Transaction::user().with_step(Step::set_attr(
                Position::new(vec![0]),
                "align",
                json!("center"),
            )))
            .unwrap();

        assert_eq!(*lock(&seen), 1);
        assert!(editor.can_undo());
        assert!(editor.undo().unwrap());
        assert_eq!(*lock(&seen), 2);
        assert!(editor.can_redo());
    }

    #[test]
    fn test_conversion_failure_rolls_back() {
        let mut editor = TemplateEditor::new(document(), EditorOptions::new()).unwrap();
        let before = editor.value().clone();

        let result = editor.dispatch(Transaction::user().with_step(Step::set_attr(
            Position::new(vec![0]),
            "align",
            json!("sideways"),
        )));

        assert!(matches!(result, Err(EditorError::Convert(_))));
        assert_eq!(editor.value(), &before);
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_closed_session_rejects_dispatch() {
        let store = Arc::new(MemoryStore::new());
        let mut editor =
            TemplateEditor::new(document(), EditorOptions::new().with_store(store.clone())).unwrap();

        editor
            .dispatch(Transaction::user().with_step(Step::set_attr(
                Position::new(vec![0]),
                "color",
                json!("#333333"),
            )))
            .unwrap();
        editor.close().unwrap();

        // Close flushed the pending autosave
        assert_eq!(store.count(), 1);
        assert!(matches!(
            editor.dispatch(Transaction::user().with_step(Step::RemoveNode {
                at: Position::new(vec![0])
            })),
            Err(EditorError::Closed)
        ));
    }

    #[test]
    fn test_commit_variable_splits_text_run() {
        let mut document = TemplateDocument::empty(&[ChannelKind::Email]);
        document.ensure_channel(ChannelKind::Email).elements =
            vec![ContentElement::Text(TextElement::new("Dear {{user.fi, welcome"))];
        let mut editor = TemplateEditor::new(document, EditorOptions::new()).unwrap();

        let commit = Commit {
            name: "user.firstName".to_string(),
            from: 5,
            to: 14,
        };
        editor.commit_variable(&Position::new(vec![0, 0]), &commit).unwrap();

        let paragraph = editor.tree().node_at(&Position::new(vec![0])).unwrap();
        assert_eq!(editor.tree().text_content(paragraph), "Dear {{user.firstName}}, welcome");
    }

    #[test]
    fn test_commit_variable_rejects_bad_range() {
        let mut editor = TemplateEditor::new(document(), EditorOptions::new()).unwrap();
        let commit = Commit {
            name: "user.id".to_string(),
            from: 4,
            to: 99,
        };

        assert!(matches!(
            editor.commit_variable(&Position::new(vec![0, 0]), &commit),
            Err(EditorError::InvalidCommit(_))
        ));
    }
}
