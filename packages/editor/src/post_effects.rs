//! # Post-Effect System
//!
//! Transactions trigger follow-up changes that keep the tree consistent.
//!
//! ## Design
//!
//! After a transaction is applied, every registered effect inspects the
//! resulting tree and proposes steps of its own:
//! - A tracked block without an id (or with a copied one) → assign a fresh id
//! - A variable chip whose name fails validation → mark it or remove it
//! - A chip that became valid again → clear its `invalid` flag
//!
//! All effects read the same post-transaction tree. Their steps are merged
//! into one follow-up transaction: attribute steps first, then removals in
//! reverse document order, so no step invalidates the position of another.
//!
//! Post-effects are:
//! - **Deterministic**: the same tree always yields the same steps (ids aside)
//! - **Idempotent**: running them on their own output yields nothing

use crate::identity::IdentityAssigner;
use crate::mutations::{Origin, Step, StepError, Transaction};
use crate::tree::{NodeTree, NodeType};
use crate::variables::{InvalidPolicy, VariableValidator};
use serde_json::Value;
use std::cmp::Reverse;
use std::fmt;
use tracing::{debug, warn};

/// Something the host should surface to the user (a toast, a banner)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    InvalidVariable {
        name: String,
        message: Option<String>,
        removed: bool,
    },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::InvalidVariable {
                name,
                message: Some(message),
                ..
            } => write!(f, "{}: {}", name, message),
            Notice::InvalidVariable { name, removed, .. } => {
                if *removed {
                    write!(f, "Removed invalid variable `{}`", name)
                } else {
                    write!(f, "Invalid variable `{}`", name)
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectOutput {
    pub steps: Vec<Step>,
    pub notices: Vec<Notice>,
}

/// Post-effect run against the tree after each transaction
pub trait PostEffect: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Inspect the tree and propose follow-up steps
    fn analyze(&self, tree: &NodeTree) -> EffectOutput;
}

impl PostEffect for IdentityAssigner {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn analyze(&self, tree: &NodeTree) -> EffectOutput {
        EffectOutput {
            steps: self.missing_steps(tree),
            notices: Vec::new(),
        }
    }
}

impl PostEffect for VariableValidator {
    fn name(&self) -> &'static str {
        "variable-validation"
    }

    fn analyze(&self, tree: &NodeTree) -> EffectOutput {
        let mut output = EffectOutput::default();

        for (key, position) in tree.descendants() {
            let Some(node) = tree.get(key) else {
                continue;
            };
            if node.node_type() != NodeType::Variable {
                continue;
            }

            let name = node.attr_str("id").unwrap_or_default();
            let marked = node.attr("invalid").and_then(Value::as_bool).unwrap_or(false);
            let validity = self.check(name);

            if validity.is_valid() {
                if node.attr("invalid").is_some() {
                    let mut attrs = crate::mutations::AttrPatch::new();
                    attrs.insert("invalid".to_string(), None);
                    output.steps.push(Step::SetAttributes { at: position, attrs });
                }
                continue;
            }

            match self.policy() {
                InvalidPolicy::Mark if marked => {}
                InvalidPolicy::Mark => {
                    debug!(variable = name, ?validity, "Marking invalid variable");
                    output.steps.push(Step::set_attr(position, "invalid", Value::Bool(true)));
                    output.notices.push(Notice::InvalidVariable {
                        name: name.to_string(),
                        message: self.message(name),
                        removed: false,
                    });
                }
                InvalidPolicy::Remove => {
                    debug!(variable = name, ?validity, "Removing invalid variable");
                    output.steps.push(Step::RemoveNode { at: position });
                    output.notices.push(Notice::InvalidVariable {
                        name: name.to_string(),
                        message: self.message(name),
                        removed: true,
                    });
                }
            }
        }

        output
    }
}

/// Steps applied by one engine run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectRun {
    pub steps: Vec<Step>,
    /// Inverses in undo order
    pub inverses: Vec<Step>,
    pub notices: Vec<Notice>,
}

impl EffectRun {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty() && self.notices.is_empty()
    }
}

/// Post-effect engine that applies all registered effects
#[derive(Debug)]
pub struct PostEffectEngine {
    effects: Vec<Box<dyn PostEffect>>,
}

impl PostEffectEngine {
    /// Create engine with default effects
    pub fn new() -> Self {
        Self::with_effects(IdentityAssigner::default(), VariableValidator::default())
    }

    pub fn with_effects(identity: IdentityAssigner, validator: VariableValidator) -> Self {
        Self {
            effects: vec![Box::new(identity), Box::new(validator)],
        }
    }

    pub fn push(&mut self, effect: impl PostEffect + 'static) {
        self.effects.push(Box::new(effect));
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Analyze the tree and merge every effect's proposal into an ordered plan
    pub fn analyze(&self, tree: &NodeTree) -> EffectOutput {
        let mut attribute_steps = Vec::new();
        let mut removals = Vec::new();
        let mut notices = Vec::new();

        for effect in &self.effects {
            let output = effect.analyze(tree);
            if !output.steps.is_empty() {
                debug!(effect = effect.name(), steps = output.steps.len(), "Post-effect proposed steps");
            }
            for step in output.steps {
                match step {
                    Step::RemoveNode { at } => removals.push(at),
                    other => attribute_steps.push(other),
                }
            }
            notices.extend(output.notices);
        }

        removals.sort_by_key(|at| Reverse(at.clone()));
        removals.dedup();

        // Attribute changes on a node that is about to go are pointless
        attribute_steps.retain(|step| match step {
            Step::SetAttributes { at, .. } => !removals.iter().any(|r| r == at || r.is_ancestor_of(at)),
            _ => true,
        });

        let mut steps = attribute_steps;
        steps.extend(removals.into_iter().map(|at| Step::RemoveNode { at }));

        EffectOutput { steps, notices }
    }

    /// Analyze and apply in one follow-up transaction
    pub fn run(&self, tree: &mut NodeTree) -> Result<EffectRun, StepError> {
        let EffectOutput { steps, notices } = self.analyze(tree);

        if steps.is_empty() {
            return Ok(EffectRun {
                notices,
                ..EffectRun::default()
            });
        }

        let transaction = Transaction {
            steps,
            origin: Origin::PostEffect,
            add_to_history: false,
        };

        let inverses = transaction.apply(tree).map_err(|e| {
            warn!(error = %e, "Post-effect transaction failed");
            e
        })?;

        Ok(EffectRun {
            steps: transaction.steps,
            inverses,
            notices,
        })
    }
}

impl Default for PostEffectEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{NodeSpec, Position};
    use crate::variables::ValidationConfig;
    use serde_json::json;

    fn tree_with_variables(names: &[&str]) -> NodeTree {
        let mut inline = vec![NodeSpec::text("Hi ")];
        inline.extend(names.iter().map(|name| NodeSpec::variable(*name)));
        NodeTree::from_specs(&[NodeSpec::paragraph(inline)])
    }

    fn variable_at(tree: &NodeTree, index: usize) -> Option<(String, Option<bool>)> {
        let key = tree.node_at(&Position::new(vec![0, index]))?;
        let node = tree.get(key)?;
        Some((
            node.attr_str("id").unwrap_or_default().to_string(),
            node.attr("invalid").and_then(Value::as_bool),
        ))
    }

    #[test]
    fn test_post_effect_engine_creation() {
        let engine = PostEffectEngine::new();
        assert_eq!(engine.len(), 2);
    }

    #[test]
    fn test_identity_and_mark_in_one_run() {
        let mut tree = tree_with_variables(&["user.firstName", "bad name"]);
        let engine = PostEffectEngine::new();

        let run = engine.run(&mut tree).unwrap();

        // paragraph id + invalid mark
        assert_eq!(run.steps.len(), 2);
        assert_eq!(run.notices.len(), 1);
        assert_eq!(variable_at(&tree, 1), Some(("user.firstName".to_string(), None)));
        assert_eq!(variable_at(&tree, 2), Some(("bad name".to_string(), Some(true))));

        let paragraph = tree.node_at(&Position::new(vec![0])).unwrap();
        assert!(tree.get(paragraph).unwrap().id().is_some());
    }

    #[test]
    fn test_second_run_is_a_no_op() {
        let mut tree = tree_with_variables(&["bad name"]);
        let engine = PostEffectEngine::new();

        engine.run(&mut tree).unwrap();
        let again = engine.run(&mut tree).unwrap();

        assert!(again.is_empty());
    }

    #[test]
    fn test_remove_policy_deletes_in_reverse_order() {
        let mut tree = tree_with_variables(&["bad one", "user.id", "bad two"]);
        let validator = VariableValidator::new(
            ValidationConfig::default()
                .with_policy(InvalidPolicy::Remove)
                .with_message("Unknown variable"),
        );
        let engine = PostEffectEngine::with_effects(IdentityAssigner::default(), validator);

        let run = engine.run(&mut tree).unwrap();

        let removals: Vec<&Step> = run.steps.iter().filter(|s| s.is_structural()).collect();
        assert_eq!(
            removals,
            vec![
                &Step::RemoveNode {
                    at: Position::new(vec![0, 3])
                },
                &Step::RemoveNode {
                    at: Position::new(vec![0, 1])
                },
            ]
        );
        assert_eq!(variable_at(&tree, 1), Some(("user.id".to_string(), None)));
        assert_eq!(variable_at(&tree, 2), None);
        assert!(run
            .notices
            .iter()
            .all(|n| matches!(n, Notice::InvalidVariable { removed: true, message: Some(m), .. } if m == "Unknown variable")));
    }

    #[test]
    fn test_valid_chip_loses_stale_mark() {
        let mut tree = NodeTree::from_specs(&[NodeSpec::paragraph(vec![
            NodeSpec::variable("user.id").with_attr("invalid", json!(true))
        ])
        .with_attr("id", json!("node-p"))]);

        let run = PostEffectEngine::new().run(&mut tree).unwrap();

        assert_eq!(run.steps.len(), 1);
        assert_eq!(variable_at(&tree, 0), Some(("user.id".to_string(), None)));
    }

    #[test]
    fn test_inverses_restore_tree() {
        let mut tree = tree_with_variables(&["bad name"]);
        let before = tree.to_specs();

        let run = PostEffectEngine::new().run(&mut tree).unwrap();
        for inverse in &run.inverses {
            inverse.apply(&mut tree).unwrap();
        }

        assert_eq!(tree.to_specs(), before);
    }

    #[test]
    fn test_notice_display() {
        let notice = Notice::InvalidVariable {
            name: "x y".to_string(),
            message: None,
            removed: true,
        };
        assert_eq!(notice.to_string(), "Removed invalid variable `x y`");
    }
}
