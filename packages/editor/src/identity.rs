//! # Node Identity
//!
//! Every node of a tracked type carries exactly one non-empty `id`
//! (`node-<uuid>`). Identifiers are assigned the first time a node is seen and
//! never change afterwards. Fresh UUIDs mean an identifier is never handed to
//! a second node, even after the first one was deleted.
//!
//! Assignment is planned as a single transaction so downstream listeners see
//! one update, not one per node. Planning on an already identified tree yields
//! nothing.

use crate::mutations::{Origin, Step, StepError, Transaction};
use crate::tree::{NodeTree, NodeType};
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use tracing::debug;
use uuid::Uuid;

pub const ID_PREFIX: &str = "node-";

pub fn generate_id() -> String {
    format!("{}{}", ID_PREFIX, Uuid::new_v4())
}

pub const DEFAULT_TRACKED: [NodeType; 8] = [
    NodeType::Paragraph,
    NodeType::Blockquote,
    NodeType::Image,
    NodeType::Button,
    NodeType::Divider,
    NodeType::List,
    NodeType::Columns,
    NodeType::Column,
];

#[derive(Debug, Clone)]
pub struct IdentityAssigner {
    tracked: BTreeSet<NodeType>,
}

impl IdentityAssigner {
    pub fn new(tracked: impl IntoIterator<Item = NodeType>) -> Self {
        Self {
            tracked: tracked.into_iter().collect(),
        }
    }

    pub fn tracks(&self, node_type: NodeType) -> bool {
        self.tracked.contains(&node_type)
    }

    pub fn tracked(&self) -> impl Iterator<Item = NodeType> + '_ {
        self.tracked.iter().copied()
    }

    /// Steps that give every tracked node a unique id
    ///
    /// Nodes without an id get a fresh one. When two nodes share an id (a
    /// copy-paste of an identified block), the first in document order keeps
    /// it and the later one is re-identified.
    pub fn missing_steps(&self, tree: &NodeTree) -> Vec<Step> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut steps = Vec::new();

        for (key, position) in tree.descendants() {
            let Some(node) = tree.get(key) else {
                continue;
            };
            if !self.tracks(node.node_type()) {
                continue;
            }
            match node.id() {
                Some(id) if seen.insert(id) => {}
                _ => steps.push(Step::set_attr(position, "id", Value::String(generate_id()))),
            }
        }

        steps
    }

    /// Identity transaction for the tree, or `None` when every node is identified
    pub fn plan(&self, tree: &NodeTree) -> Option<Transaction> {
        let steps = self.missing_steps(tree);
        if steps.is_empty() {
            return None;
        }
        debug!(count = steps.len(), "Assigning node ids");
        Some(Transaction {
            steps,
            origin: Origin::PostEffect,
            add_to_history: false,
        })
    }

    /// Plan and apply in one go; returns how many nodes were identified
    pub fn assign(&self, tree: &mut NodeTree) -> Result<usize, StepError> {
        match self.plan(tree) {
            Some(transaction) => {
                transaction.apply(tree)?;
                Ok(transaction.steps.len())
            }
            None => Ok(0),
        }
    }
}

impl Default for IdentityAssigner {
    fn default() -> Self {
        Self::new(DEFAULT_TRACKED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::NodeSpec;
    use serde_json::json;

    fn ids(tree: &NodeTree) -> Vec<String> {
        tree.descendants()
            .into_iter()
            .filter_map(|(key, _)| tree.get(key).and_then(|n| n.id()).map(str::to_string))
            .collect()
    }

    fn sample() -> NodeTree {
        NodeTree::from_specs(&[
            NodeSpec::paragraph(vec![NodeSpec::text("a"), NodeSpec::variable("user.id")]),
            NodeSpec::new(NodeType::Image).with_attr("id", json!("node-existing")),
            NodeSpec::new(NodeType::Columns).with_children(vec![NodeSpec::new(NodeType::Column)
                .with_children(vec![NodeSpec::new(NodeType::Divider)])]),
            NodeSpec::new(NodeType::Meta),
        ])
    }

    #[test]
    fn test_generated_ids_have_prefix() {
        let id = generate_id();
        assert!(id.starts_with("node-"));
        assert_eq!(id.len(), "node-".len() + 36);
    }

    #[test]
    fn test_assigns_only_missing_tracked_nodes() {
        let mut tree = sample();
        let assigner = IdentityAssigner::default();

        let assigned = assigner.assign(&mut tree).unwrap();

        // paragraph, columns, column, divider
        assert_eq!(assigned, 4);
        let all = ids(&tree);
        assert_eq!(all.len(), 5);
        assert!(all.contains(&"node-existing".to_string()));

        let unique: HashSet<&String> = all.iter().collect();
        assert_eq!(unique.len(), all.len());
    }

    #[test]
    fn test_second_pass_is_a_no_op() {
        let mut tree = sample();
        let assigner = IdentityAssigner::default();

        assigner.assign(&mut tree).unwrap();
        let first = ids(&tree);

        assert!(assigner.plan(&tree).is_none());
        assert_eq!(assigner.assign(&mut tree).unwrap(), 0);
        assert_eq!(ids(&tree), first);
    }

    #[test]
    fn test_duplicate_ids_are_reassigned_after_first() {
        let mut tree = NodeTree::from_specs(&[
            NodeSpec::new(NodeType::Divider).with_attr("id", json!("node-dup")),
            NodeSpec::new(NodeType::Divider).with_attr("id", json!("node-dup")),
        ]);

        IdentityAssigner::default().assign(&mut tree).unwrap();

        let all = ids(&tree);
        assert_eq!(all[0], "node-dup");
        assert_ne!(all[1], "node-dup");
    }

    #[test]
    fn test_variable_and_meta_nodes_are_untracked() {
        let mut tree = NodeTree::from_specs(&[
            NodeSpec::paragraph(vec![NodeSpec::variable("user.id")]).with_attr("id", json!("node-p")),
            NodeSpec::new(NodeType::Meta),
        ]);

        assert_eq!(IdentityAssigner::default().assign(&mut tree).unwrap(), 0);
    }

    #[test]
    fn test_empty_tree_is_a_no_op() {
        let tree = NodeTree::new();
        assert!(IdentityAssigner::default().plan(&tree).is_none());
    }
}
