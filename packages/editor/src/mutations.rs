//! # Tree Mutations
//!
//! Primitive steps on the node tree and the transactions that group them.
//!
//! ## Design Principles
//!
//! 1. **Position-addressed**: steps name nodes by path, so a recorded step can
//!    be replayed on a rebuilt tree (undo, redo)
//! 2. **Validated**: each step checks its preconditions before touching the tree
//! 3. **Invertible**: applying a step returns the step that undoes it
//! 4. **Atomic transactions**: a failing step rolls back the steps before it
//!
//! ## Step Semantics
//!
//! ### SetAttributes
//! - Merges into the existing map; a `None` value removes the key
//!
//! ### InsertNode
//! - `index` is clamped to the parent's child count
//! - Fails if the parent cannot hold the node type
//!
//! ### MoveNode
//! - `to_parent` is resolved before the node is detached
//! - `index` is interpreted after the node is detached
//! - Fails if the target is the node itself or one of its descendants

use crate::tree::{NodeSpec, NodeTree, NodeType, Position};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::error;

/// Attribute changes; `None` removes the attribute
pub type AttrPatch = BTreeMap<String, Option<Value>>;

/// One primitive tree mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    SetAttributes {
        at: Position,
        attrs: AttrPatch,
    },

    /// Replace the text of a text run
    SetText {
        at: Position,
        text: String,
    },

    InsertNode {
        parent: Position,
        index: usize,
        node: NodeSpec,
    },

    /// Remove a node and all descendants
    RemoveNode {
        at: Position,
    },

    MoveNode {
        from: Position,
        to_parent: Position,
        index: usize,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StepError {
    #[error("Node not found at {0}")]
    NodeNotFound(Position),

    #[error("Parent not found at {0}")]
    ParentNotFound(Position),

    #[error("Would create cycle")]
    CycleDetected,

    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    #[error("Node at {0} is not text")]
    NotText(Position),

    #[error("The root node cannot be removed or moved")]
    RootImmutable,
}

impl Step {
    /// Set a single attribute
    pub fn set_attr(at: Position, name: impl Into<String>, value: Value) -> Self {
        let mut attrs = AttrPatch::new();
        attrs.insert(name.into(), Some(value));
        Step::SetAttributes { at, attrs }
    }

    /// Whether this step changes the shape of the tree
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Step::InsertNode { .. } | Step::RemoveNode { .. } | Step::MoveNode { .. }
        )
    }

    /// Validate without applying
    pub fn validate(&self, tree: &NodeTree) -> Result<(), StepError> {
        match self {
            Step::SetAttributes { at, .. } => {
                tree.node_at(at).ok_or_else(|| StepError::NodeNotFound(at.clone()))?;
                Ok(())
            }

            Step::SetText { at, .. } => {
                let key = tree.node_at(at).ok_or_else(|| StepError::NodeNotFound(at.clone()))?;
                match tree.get(key).map(|node| node.node_type()) {
                    Some(NodeType::Text) => Ok(()),
                    _ => Err(StepError::NotText(at.clone())),
                }
            }

            Step::InsertNode { parent, node, .. } => {
                let parent_key = tree
                    .node_at(parent)
                    .ok_or_else(|| StepError::ParentNotFound(parent.clone()))?;
                let parent_type = tree
                    .get(parent_key)
                    .map(|n| n.node_type())
                    .ok_or_else(|| StepError::ParentNotFound(parent.clone()))?;

                if !parent_type.allows_child(node.node_type) {
                    return Err(StepError::InvalidStructure(format!(
                        "{} cannot contain {}",
                        parent_type, node.node_type
                    )));
                }
                if !node.is_well_formed() {
                    return Err(StepError::InvalidStructure(format!(
                        "malformed {} subtree",
                        node.node_type
                    )));
                }
                Ok(())
            }

            Step::RemoveNode { at } => {
                if at.is_root() {
                    return Err(StepError::RootImmutable);
                }
                tree.node_at(at).ok_or_else(|| StepError::NodeNotFound(at.clone()))?;
                Ok(())
            }

            Step::MoveNode { from, to_parent, .. } => {
                if from.is_root() {
                    return Err(StepError::RootImmutable);
                }
                let node = tree.node_at(from).ok_or_else(|| StepError::NodeNotFound(from.clone()))?;
                let parent = tree
                    .node_at(to_parent)
                    .ok_or_else(|| StepError::ParentNotFound(to_parent.clone()))?;

                if tree.is_ancestor_or_self(node, parent) {
                    return Err(StepError::CycleDetected);
                }

                let node_type = tree.get(node).map(|n| n.node_type());
                let parent_type = tree.get(parent).map(|n| n.node_type());
                match (parent_type, node_type) {
                    (Some(p), Some(c)) if p.allows_child(c) => Ok(()),
                    (Some(p), Some(c)) => Err(StepError::InvalidStructure(format!(
                        "{} cannot contain {}",
                        p, c
                    ))),
                    _ => Err(StepError::ParentNotFound(to_parent.clone())),
                }
            }
        }
    }

    /// Apply to the tree, returning the inverse step
    pub fn apply(&self, tree: &mut NodeTree) -> Result<Step, StepError> {
        self.validate(tree)?;

        match self {
            Step::SetAttributes { at, attrs } => Self::apply_set_attributes(tree, at, attrs),
            Step::SetText { at, text } => Self::apply_set_text(tree, at, text),
            Step::InsertNode {
                parent,
                index,
                node,
            } => Self::apply_insert(tree, parent, *index, node),
            Step::RemoveNode { at } => Self::apply_remove(tree, at),
            Step::MoveNode {
                from,
                to_parent,
                index,
            } => Self::apply_move(tree, from, to_parent, *index),
        }
    }

    fn apply_set_attributes(tree: &mut NodeTree, at: &Position, attrs: &AttrPatch) -> Result<Step, StepError> {
        let key = tree.node_at(at).ok_or_else(|| StepError::NodeNotFound(at.clone()))?;
        let node = tree.get_mut(key).ok_or_else(|| StepError::NodeNotFound(at.clone()))?;

        let mut inverse = AttrPatch::new();
        for (name, value) in attrs {
            let previous = match value {
                Some(value) => node.attrs_mut().insert(name.clone(), value.clone()),
                None => node.attrs_mut().remove(name),
            };
            inverse.insert(name.clone(), previous);
        }

        Ok(Step::SetAttributes {
            at: at.clone(),
            attrs: inverse,
        })
    }

    fn apply_set_text(tree: &mut NodeTree, at: &Position, text: &str) -> Result<Step, StepError> {
        let key = tree.node_at(at).ok_or_else(|| StepError::NodeNotFound(at.clone()))?;
        let node = tree.get_mut(key).ok_or_else(|| StepError::NodeNotFound(at.clone()))?;

        let previous = node.text().unwrap_or_default().to_string();
        node.set_text(text.to_string());

        Ok(Step::SetText {
            at: at.clone(),
            text: previous,
        })
    }

    fn apply_insert(tree: &mut NodeTree, parent: &Position, index: usize, node: &NodeSpec) -> Result<Step, StepError> {
        let parent_key = tree
            .node_at(parent)
            .ok_or_else(|| StepError::ParentNotFound(parent.clone()))?;

        let key = tree.insert_spec(parent_key, index, node);
        let at = tree
            .position_of(key)
            .ok_or_else(|| StepError::InvalidStructure("inserted node is unreachable".to_string()))?;

        Ok(Step::RemoveNode { at })
    }

    fn apply_remove(tree: &mut NodeTree, at: &Position) -> Result<Step, StepError> {
        let key = tree.node_at(at).ok_or_else(|| StepError::NodeNotFound(at.clone()))?;
        let snapshot = tree.snapshot(key).ok_or_else(|| StepError::NodeNotFound(at.clone()))?;
        let parent = at.parent().ok_or(StepError::RootImmutable)?;
        let index = at.index().unwrap_or(0);

        tree.remove(key);

        Ok(Step::InsertNode {
            parent,
            index,
            node: snapshot,
        })
    }

    fn apply_move(tree: &mut NodeTree, from: &Position, to_parent: &Position, index: usize) -> Result<Step, StepError> {
        let key = tree.node_at(from).ok_or_else(|| StepError::NodeNotFound(from.clone()))?;
        let new_parent = tree
            .node_at(to_parent)
            .ok_or_else(|| StepError::ParentNotFound(to_parent.clone()))?;
        let old_parent = tree
            .get(key)
            .and_then(|node| node.parent())
            .ok_or(StepError::RootImmutable)?;

        let old_index = tree
            .detach(key)
            .ok_or_else(|| StepError::NodeNotFound(from.clone()))?;
        tree.attach(key, new_parent, index);

        let moved_to = tree
            .position_of(key)
            .ok_or_else(|| StepError::InvalidStructure("moved node is unreachable".to_string()))?;
        let back_to = tree
            .position_of(old_parent)
            .ok_or_else(|| StepError::InvalidStructure("old parent is unreachable".to_string()))?;

        Ok(Step::MoveNode {
            from: moved_to,
            to_parent: back_to,
            index: old_index,
        })
    }
}

/// Where a transaction came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Direct user edit (typing, form submission, drag-and-drop)
    User,
    /// Follow-up produced by post-effects
    PostEffect,
    /// Undo or redo replay
    History,
    /// Image insertion after an upload
    Upload,
}

/// Steps applied to the tree as one unit
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub steps: Vec<Step>,
    pub origin: Origin,
    pub add_to_history: bool,
}

impl Transaction {
    pub fn new(origin: Origin) -> Self {
        Self {
            steps: Vec::new(),
            origin,
            add_to_history: true,
        }
    }

    /// Empty user transaction
    pub fn user() -> Self {
        Self::new(Origin::User)
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn without_history(mut self) -> Self {
        self.add_to_history = false;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Apply every step or none
    ///
    /// Returns the inverse steps in the order they must be applied to undo
    /// the transaction.
    pub fn apply(&self, tree: &mut NodeTree) -> Result<Vec<Step>, StepError> {
        let mut inverses: Vec<Step> = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            match step.apply(tree) {
                Ok(inverse) => inverses.push(inverse),
                Err(e) => {
                    for inverse in inverses.iter().rev() {
                        if let Err(rollback) = inverse.apply(tree) {
                            error!(error = %rollback, "Rollback step failed");
                        }
                    }
                    return Err(e);
                }
            }
        }

        inverses.reverse();
        Ok(inverses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree() -> NodeTree {
        NodeTree::from_specs(&[
            NodeSpec::paragraph(vec![NodeSpec::text("Hello")]).with_attr("align", json!("left")),
            NodeSpec::new(NodeType::Divider),
            NodeSpec::new(NodeType::Columns).with_children(vec![
                NodeSpec::new(NodeType::Column),
                NodeSpec::new(NodeType::Column),
            ]),
        ])
    }

    fn pos(path: &[usize]) -> Position {
        Position::new(path.to_vec())
    }

    #[test]
    fn test_step_serialization() {
        let step = Step::set_attr(pos(&[0]), "align", json!("center"));

        let json = serde_json::to_string(&step).unwrap();
        let deserialized: Step = serde_json::from_str(&json).unwrap();

        assert_eq!(step, deserialized);
    }

    #[test]
    fn test_set_attributes_inverse_restores_and_removes() {
        let mut tree = tree();
        let mut attrs = AttrPatch::new();
        attrs.insert("align".to_string(), Some(json!("center")));
        attrs.insert("color".to_string(), Some(json!("#ff0000")));
        let step = Step::SetAttributes { at: pos(&[0]), attrs };

        let inverse = step.apply(&mut tree).unwrap();
        let paragraph = tree.node_at(&pos(&[0])).unwrap();
        assert_eq!(tree.get(paragraph).unwrap().attr("align"), Some(&json!("center")));

        inverse.apply(&mut tree).unwrap();
        let node = tree.get(paragraph).unwrap();
        assert_eq!(node.attr("align"), Some(&json!("left")));
        assert_eq!(node.attr("color"), None);
    }

    #[test]
    fn test_set_text_rejects_blocks() {
        let mut tree = tree();
        let step = Step::SetText {
            at: pos(&[0]),
            text: "nope".to_string(),
        };

        assert_eq!(step.apply(&mut tree), Err(StepError::NotText(pos(&[0]))));
    }

    #[test]
    fn test_insert_rejects_inline_at_root() {
        let mut tree = tree();
        let step = Step::InsertNode {
            parent: Position::root(),
            index: 0,
            node: NodeSpec::text("loose"),
        };

        assert!(matches!(step.apply(&mut tree), Err(StepError::InvalidStructure(_))));
    }

    #[test]
    fn test_remove_then_inverse_restores_subtree() {
        let mut tree = tree();
        let before = tree.to_specs();

        let inverse = Step::RemoveNode { at: pos(&[0]) }.apply(&mut tree).unwrap();
        assert_eq!(tree.to_specs().len(), 2);

        inverse.apply(&mut tree).unwrap();
        assert_eq!(tree.to_specs(), before);
    }

    #[test]
    fn test_root_cannot_be_removed() {
        let mut tree = tree();
        let step = Step::RemoveNode { at: Position::root() };

        assert_eq!(step.apply(&mut tree), Err(StepError::RootImmutable));
    }

    #[test]
    fn test_move_into_column_and_back() {
        let mut tree = tree();
        let before = tree.to_specs();

        let step = Step::MoveNode {
            from: pos(&[1]),
            to_parent: pos(&[2, 1]),
            index: 0,
        };
        let inverse = step.apply(&mut tree).unwrap();

        // Divider left the root, so columns shifted to index 1
        let divider = tree.node_at(&pos(&[1, 1, 0])).unwrap();
        assert_eq!(tree.get(divider).unwrap().node_type(), NodeType::Divider);

        inverse.apply(&mut tree).unwrap();
        assert_eq!(tree.to_specs(), before);
    }

    #[test]
    fn test_move_detects_cycle() {
        let mut tree = tree();
        let step = Step::MoveNode {
            from: pos(&[2]),
            to_parent: pos(&[2, 0]),
            index: 0,
        };

        assert_eq!(step.apply(&mut tree), Err(StepError::CycleDetected));
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let mut tree = tree();
        let before = tree.to_specs();

        let transaction = Transaction::user()
            .with_step(Step::set_attr(pos(&[0]), "align", json!("right")))
            .with_step(Step::RemoveNode { at: pos(&[1]) })
            .with_step(Step::RemoveNode { at: pos(&[9]) });

        let result = transaction.apply(&mut tree);

        assert_eq!(result, Err(StepError::NodeNotFound(pos(&[9]))));
        assert_eq!(tree.to_specs(), before);
    }

    #[test]
    fn test_transaction_inverses_undo_in_order() {
        let mut tree = tree();
        let before = tree.to_specs();

        let transaction = Transaction::user()
            .with_step(Step::InsertNode {
                parent: Position::root(),
                index: 0,
                node: NodeSpec::new(NodeType::Image),
            })
            .with_step(Step::set_attr(pos(&[1]), "align", json!("center")))
            .with_step(Step::RemoveNode { at: pos(&[2]) });

        let inverses = transaction.apply(&mut tree).unwrap();
        for inverse in &inverses {
            inverse.apply(&mut tree).unwrap();
        }

        assert_eq!(tree.to_specs(), before);
    }
}
