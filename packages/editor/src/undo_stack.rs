//! # Undo/Redo Stack
//!
//! Tracks transaction history for one channel and replays it on demand.
//!
//! ## Design
//!
//! - Each transaction records the inverses returned when it was applied
//! - Undo applies the inverses atomically and moves the batch to the redo stack
//! - Redo reapplies the original steps and refreshes the stored inverses
//! - New batches clear the redo stack
//! - Batches can span several transactions (`begin_batch` / `end_batch`)
//!
//! Replays run with [`Origin::History`] and are never recorded themselves.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut stack = UndoStack::new();
//! stack.apply(&transaction, &mut tree)?;
//!
//! stack.undo(&mut tree)?;
//! stack.redo(&mut tree)?;
//! ```

use crate::mutations::{Origin, Step, StepError, Transaction};
use crate::tree::NodeTree;
use tracing::warn;

pub const DEFAULT_MAX_LEVELS: usize = 100;

/// Steps that are undone/redone together
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryBatch {
    /// Steps in application order
    pub steps: Vec<Step>,

    /// Inverses in undo order
    pub inverses: Vec<Step>,

    pub description: Option<String>,
}

impl HistoryBatch {
    pub fn new(steps: Vec<Step>, inverses: Vec<Step>) -> Self {
        Self {
            steps,
            inverses,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn extend(&mut self, steps: Vec<Step>, mut inverses: Vec<Step>) {
        self.steps.extend(steps);
        // Later work is undone first
        inverses.append(&mut self.inverses);
        self.inverses = inverses;
    }
}

#[derive(Debug)]
pub struct UndoStack {
    undo_stack: Vec<HistoryBatch>,
    redo_stack: Vec<HistoryBatch>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    current_batch: Option<HistoryBatch>,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::with_max_levels(DEFAULT_MAX_LEVELS)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            current_batch: None,
        }
    }

    /// Apply a transaction and record it, unless it opted out of history
    pub fn apply(&mut self, transaction: &Transaction, tree: &mut NodeTree) -> Result<(), StepError> {
        let inverses = transaction.apply(tree)?;
        if transaction.add_to_history {
            self.record(transaction.steps.clone(), inverses);
        }
        Ok(())
    }

    /// Record steps that were already applied
    pub fn record(&mut self, steps: Vec<Step>, inverses: Vec<Step>) {
        if steps.is_empty() {
            return;
        }
        match &mut self.current_batch {
            Some(batch) => batch.extend(steps, inverses),
            None => self.push_batch(HistoryBatch::new(steps, inverses)),
        }
    }

    /// Start a batch of transactions (will be undone/redone together)
    pub fn begin_batch(&mut self) {
        self.current_batch = Some(HistoryBatch::new(Vec::new(), Vec::new()));
    }

    /// End the current batch and push it to the undo stack
    pub fn end_batch(&mut self) {
        if let Some(batch) = self.current_batch.take() {
            if !batch.steps.is_empty() {
                self.push_batch(batch);
            }
        }
    }

    pub fn set_batch_description(&mut self, description: impl Into<String>) {
        if let Some(batch) = &mut self.current_batch {
            batch.description = Some(description.into());
        }
    }

    fn push_batch(&mut self, batch: HistoryBatch) {
        self.undo_stack.push(batch);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        // New action invalidates the redo future
        self.redo_stack.clear();
    }

    /// Undo the most recent batch; returns false if there was nothing to undo
    pub fn undo(&mut self, tree: &mut NodeTree) -> Result<bool, StepError> {
        let Some(batch) = self.undo_stack.pop() else {
            return Ok(false);
        };

        match replay(&batch.inverses, tree) {
            Ok(_) => {
                self.redo_stack.push(batch);
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "Undo failed; history left unchanged");
                self.undo_stack.push(batch);
                Err(e)
            }
        }
    }

    /// Redo the most recently undone batch
    pub fn redo(&mut self, tree: &mut NodeTree) -> Result<bool, StepError> {
        let Some(mut batch) = self.redo_stack.pop() else {
            return Ok(false);
        };

        match replay(&batch.steps, tree) {
            Ok(inverses) => {
                batch.inverses = inverses;
                self.undo_stack.push(batch);
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "Redo failed; history left unchanged");
                self.redo_stack.push(batch);
                Err(e)
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_batch = None;
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.last().and_then(|batch| batch.description.as_deref())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().and_then(|batch| batch.description.as_deref())
    }
}

fn replay(steps: &[Step], tree: &mut NodeTree) -> Result<Vec<Step>, StepError> {
    Transaction {
        steps: steps.to_vec(),
        origin: Origin::History,
        add_to_history: false,
    }
    .apply(tree)
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}
