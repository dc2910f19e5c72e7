//! Selected-node tracking
//!
//! The selection never owns the node it points at. It keeps the anchor's
//! [`NodeKey`] and re-resolves it on every selection and document event; a
//! key that no longer resolves means "nothing selected".

use crate::tree::{NodeKey, NodeTree, NodeType, Position};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cursor or node selection, addressed by the anchor's position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Position,
}

impl Selection {
    pub fn at(anchor: impl Into<Position>) -> Self {
        Self { anchor: anchor.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedNode {
    pub key: NodeKey,
    pub node_type: NodeType,
    pub position: Position,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    anchor: Option<NodeKey>,
    selected: Option<SelectedNode>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the node at `selection.anchor`; an unresolvable anchor clears
    /// the selection
    pub fn set(&mut self, tree: &NodeTree, selection: &Selection) -> Option<&SelectedNode> {
        self.anchor = tree.node_at(&selection.anchor).filter(|key| *key != tree.root());
        self.refresh(tree)
    }

    /// Re-resolve the anchor against the current tree
    pub fn refresh(&mut self, tree: &NodeTree) -> Option<&SelectedNode> {
        self.selected = self.anchor.and_then(|key| {
            let node = tree.get(key)?;
            let position = tree.position_of(key)?;
            Some(SelectedNode {
                key,
                node_type: node.node_type(),
                position,
            })
        });
        if self.selected.is_none() {
            self.anchor = None;
        }
        self.selected.as_ref()
    }

    pub fn clear(&mut self) {
        self.anchor = None;
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&SelectedNode> {
        self.selected.as_ref()
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selected.as_ref().map(|selected| Selection {
            anchor: selected.position.clone(),
        })
    }

    /// Nearest block at or above the anchor
    pub fn resolve_block(&self, tree: &NodeTree) -> Option<SelectedNode> {
        let selected = self.selected.as_ref()?;
        nearest_block(tree, selected.key)
    }
}

/// Walk up from `key` to the first non-inline node below the root
pub fn nearest_block(tree: &NodeTree, key: NodeKey) -> Option<SelectedNode> {
    let mut current = key;
    loop {
        let node = tree.get(current)?;
        if current == tree.root() {
            return None;
        }
        if !node.node_type().is_inline() {
            return Some(SelectedNode {
                key: current,
                node_type: node.node_type(),
                position: tree.position_of(current)?,
            });
        }
        current = node.parent()?;
    }
}

/// Which property form a click should open
#[derive(Debug, Clone, PartialEq)]
pub enum FormRequest {
    Link { href: String },
    Variable { name: String },
    Block { node_type: NodeType, key: NodeKey },
}

/// Decide which form a click at `position` opens
///
/// A `link` mark wins over everything else, so clicking a linked chip edits
/// the link rather than the variable.
pub fn resolve_click(tree: &NodeTree, position: &Position) -> Option<FormRequest> {
    let key = tree.node_at(position)?;
    let node = tree.get(key)?;

    if let Some(href) = node.attr("link").and_then(link_href) {
        return Some(FormRequest::Link { href });
    }

    if node.node_type() == NodeType::Variable {
        return Some(FormRequest::Variable {
            name: node.attr_str("id").unwrap_or_default().to_string(),
        });
    }

    nearest_block(tree, key).map(|block| FormRequest::Block {
        node_type: block.node_type,
        key: block.key,
    })
}

fn link_href(mark: &Value) -> Option<String> {
    match mark {
        Value::String(href) => Some(href.clone()),
        Value::Object(map) => map.get("href").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutations::Step;
    use crate::tree::NodeSpec;
    use serde_json::json;

    fn tree() -> NodeTree {
        NodeTree::from_specs(&[
            NodeSpec::paragraph(vec![
                NodeSpec::text("Visit "),
                NodeSpec::text("our site").with_attr("link", json!({ "href": "https://example.com" })),
                NodeSpec::variable("user.firstName"),
            ]),
            NodeSpec::new(NodeType::Image),
        ])
    }

    fn pos(path: &[usize]) -> Position {
        Position::new(path.to_vec())
    }

    #[test]
    fn test_selection_follows_node_across_edits() {
        let mut tree = tree();
        let mut state = SelectionState::new();
        state.set(&tree, &Selection::at(vec![1]));

        Step::InsertNode {
            parent: Position::root(),
            index: 0,
            node: NodeSpec::new(NodeType::Divider),
        }
        .apply(&mut tree)
        .unwrap();

        let selected = state.refresh(&tree).unwrap();
        assert_eq!(selected.node_type, NodeType::Image);
        assert_eq!(selected.position, pos(&[2]));
    }

    #[test]
    fn test_selection_nulls_when_node_removed() {
        let mut tree = tree();
        let mut state = SelectionState::new();
        state.set(&tree, &Selection::at(vec![1]));

        Step::RemoveNode { at: pos(&[1]) }.apply(&mut tree).unwrap();

        assert!(state.refresh(&tree).is_none());
        assert!(state.selection().is_none());
    }

    #[test]
    fn test_unresolvable_anchor_selects_nothing() {
        let tree = tree();
        let mut state = SelectionState::new();

        assert!(state.set(&tree, &Selection::at(vec![7])).is_none());
        assert!(state.set(&tree, &Selection::at(Position::root())).is_none());
    }

    #[test]
    fn test_resolve_block_walks_up_from_inline() {
        let tree = tree();
        let mut state = SelectionState::new();
        state.set(&tree, &Selection::at(vec![0, 2]));

        let block = state.resolve_block(&tree).unwrap();
        assert_eq!(block.node_type, NodeType::Paragraph);
        assert_eq!(block.position, pos(&[0]));
    }

    #[test]
    fn test_click_intents() {
        let tree = tree();

        assert_eq!(
            resolve_click(&tree, &pos(&[0, 1])),
            Some(FormRequest::Link {
                href: "https://example.com".to_string()
            })
        );
        assert_eq!(
            resolve_click(&tree, &pos(&[0, 2])),
            Some(FormRequest::Variable {
                name: "user.firstName".to_string()
            })
        );
        assert!(matches!(
            resolve_click(&tree, &pos(&[0, 0])),
            Some(FormRequest::Block {
                node_type: NodeType::Paragraph,
                ..
            })
        ));
        assert_eq!(resolve_click(&tree, &pos(&[4])), None);
    }
}
