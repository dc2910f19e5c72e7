//! # Node Tree
//!
//! Arena-backed editing surface for a single channel.
//!
//! Nodes live in one addressable store and are referred to either by
//! [`NodeKey`] (stable while the node exists) or by [`Position`] (child-index
//! path from the root, stable only until the next structural edit). Neither
//! owns the node: a key whose slot has been freed or reused resolves to `None`,
//! so a stale reference can never reach a different node.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Node attribute map
pub type Attrs = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Doc,
    Paragraph,
    Blockquote,
    Image,
    Button,
    Divider,
    List,
    ListItem,
    Columns,
    Column,
    Meta,
    Text,
    Variable,
    HardBreak,
}

impl NodeType {
    pub fn is_inline(self) -> bool {
        matches!(self, NodeType::Text | NodeType::Variable | NodeType::HardBreak)
    }

    /// Whether a node of type `child` may be placed directly inside `self`
    pub fn allows_child(self, child: NodeType) -> bool {
        match self {
            NodeType::Doc | NodeType::Column => {
                !child.is_inline() && !matches!(child, NodeType::Doc | NodeType::ListItem | NodeType::Column)
            }
            NodeType::Paragraph | NodeType::Blockquote | NodeType::ListItem => child.is_inline(),
            NodeType::List => child == NodeType::ListItem,
            NodeType::Columns => child == NodeType::Column,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Doc => "doc",
            NodeType::Paragraph => "paragraph",
            NodeType::Blockquote => "blockquote",
            NodeType::Image => "image",
            NodeType::Button => "button",
            NodeType::Divider => "divider",
            NodeType::List => "list",
            NodeType::ListItem => "list_item",
            NodeType::Columns => "columns",
            NodeType::Column => "column",
            NodeType::Meta => "meta",
            NodeType::Text => "text",
            NodeType::Variable => "variable",
            NodeType::HardBreak => "hard_break",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generational handle into a [`NodeTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey {
    index: u32,
    generation: u32,
}

/// Child-index path from the root; the empty path is the root itself
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Position(Vec<usize>);

impl Position {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new(path: Vec<usize>) -> Self {
        Self(path)
    }

    pub fn child(&self, index: usize) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        Self(path)
    }

    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Index within the parent
    pub fn index(&self) -> Option<usize> {
        self.0.last().copied()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// True if `other` lies strictly inside the subtree at `self`
    pub fn is_ancestor_of(&self, other: &Position) -> bool {
        other.0.len() > self.0.len() && other.0.starts_with(&self.0)
    }
}

impl From<Vec<usize>> for Position {
    fn from(path: Vec<usize>) -> Self {
        Self(path)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for index in &self.0 {
            write!(f, "/{}", index)?;
        }
        Ok(())
    }
}

/// A live node in the tree
#[derive(Debug, Clone)]
pub struct Node {
    node_type: NodeType,
    attrs: Attrs,
    text: Option<String>,
    children: Vec<NodeKey>,
    parent: Option<NodeKey>,
}

impl Node {
    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).and_then(Value::as_str)
    }

    /// Non-empty `id` attribute
    pub fn id(&self) -> Option<&str> {
        self.attr_str("id").filter(|id| !id.is_empty())
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub(crate) fn attrs_mut(&mut self) -> &mut Attrs {
        &mut self.attrs
    }

    pub(crate) fn set_text(&mut self, text: String) {
        self.text = Some(text);
    }
}

/// Detached subtree, used to insert nodes and to snapshot removed ones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub node_type: NodeType,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: Attrs,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    pub fn new(node_type: NodeType) -> Self {
        Self {
            node_type,
            attrs: Attrs::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::new(NodeType::Text)
        }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::new(NodeType::Variable).with_attr("id", Value::String(name.into()))
    }

    pub fn paragraph(children: Vec<NodeSpec>) -> Self {
        Self::new(NodeType::Paragraph).with_children(children)
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attrs.insert(name.into(), value);
        self
    }

    pub fn with_children(mut self, children: Vec<NodeSpec>) -> Self {
        self.children = children;
        self
    }

    /// Whether every parent/child pair in this subtree is allowed
    pub fn is_well_formed(&self) -> bool {
        self.children
            .iter()
            .all(|child| self.node_type.allows_child(child.node_type) && child.is_well_formed())
    }
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena of nodes rooted at a `Doc` node
pub struct NodeTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeKey,
    live: usize,
}

impl NodeTree {
    pub fn new() -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeKey {
                index: 0,
                generation: 0,
            },
            live: 0,
        };
        tree.root = tree.alloc(Node {
            node_type: NodeType::Doc,
            attrs: Attrs::new(),
            text: None,
            children: Vec::new(),
            parent: None,
        });
        tree
    }

    /// Build a tree whose root holds the given blocks
    ///
    /// Specs the root cannot hold are skipped.
    pub fn from_specs(blocks: &[NodeSpec]) -> Self {
        let mut tree = Self::new();
        let root = tree.root;
        for spec in blocks.iter().filter(|spec| NodeType::Doc.allows_child(spec.node_type)) {
            let index = tree.children_len(root);
            tree.insert_spec(root, index, spec);
        }
        tree
    }

    pub fn root(&self) -> NodeKey {
        self.root
    }

    /// Number of live nodes, root included
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.children_len(self.root) == 0
    }

    pub fn get(&self, key: NodeKey) -> Option<&Node> {
        self.slots
            .get(key.index as usize)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub(crate) fn get_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.slots
            .get_mut(key.index as usize)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.get(key).is_some()
    }

    pub fn children_len(&self, key: NodeKey) -> usize {
        self.get(key).map(|node| node.children.len()).unwrap_or(0)
    }

    pub fn node_at(&self, position: &Position) -> Option<NodeKey> {
        let mut current = self.root;
        for &index in position.as_slice() {
            current = *self.get(current)?.children.get(index)?;
        }
        Some(current)
    }

    pub fn position_of(&self, key: NodeKey) -> Option<Position> {
        let mut path = Vec::new();
        let mut current = key;
        let mut node = self.get(current)?;

        while let Some(parent_key) = node.parent {
            let parent = self.get(parent_key)?;
            let index = parent.children.iter().position(|child| *child == current)?;
            path.push(index);
            current = parent_key;
            node = parent;
        }

        if current != self.root {
            return None;
        }
        path.reverse();
        Some(Position(path))
    }

    /// True if `ancestor` is `key` or contains it
    pub fn is_ancestor_or_self(&self, ancestor: NodeKey, key: NodeKey) -> bool {
        let mut current = Some(key);
        while let Some(k) = current {
            if k == ancestor {
                return true;
            }
            current = self.get(k).and_then(|node| node.parent);
        }
        false
    }

    /// All nodes below the root in document (pre-)order, with their positions
    pub fn descendants(&self) -> Vec<(NodeKey, Position)> {
        let mut out = Vec::new();
        self.collect_descendants(self.root, &Position::root(), &mut out);
        out
    }

    fn collect_descendants(&self, key: NodeKey, position: &Position, out: &mut Vec<(NodeKey, Position)>) {
        let Some(node) = self.get(key) else {
            return;
        };
        for (index, child) in node.children.iter().enumerate() {
            let child_position = position.child(index);
            out.push((*child, child_position.clone()));
            self.collect_descendants(*child, &child_position, out);
        }
    }

    /// Detached copy of the subtree at `key`
    pub fn snapshot(&self, key: NodeKey) -> Option<NodeSpec> {
        let node = self.get(key)?;
        Some(NodeSpec {
            node_type: node.node_type,
            attrs: node.attrs.clone(),
            text: node.text.clone(),
            children: node
                .children
                .iter()
                .filter_map(|child| self.snapshot(*child))
                .collect(),
        })
    }

    /// Snapshot of every top-level block
    pub fn to_specs(&self) -> Vec<NodeSpec> {
        self.get(self.root)
            .map(|root| root.children.iter().filter_map(|key| self.snapshot(*key)).collect())
            .unwrap_or_default()
    }

    /// Plain text of a node, with variable chips rendered as `{{name}}`
    pub fn text_content(&self, key: NodeKey) -> String {
        let mut out = String::new();
        self.write_text(key, &mut out);
        out
    }

    fn write_text(&self, key: NodeKey, out: &mut String) {
        let Some(node) = self.get(key) else {
            return;
        };
        match node.node_type {
            NodeType::Text => out.push_str(node.text.as_deref().unwrap_or_default()),
            NodeType::Variable => {
                out.push_str("{{");
                out.push_str(node.attr_str("id").unwrap_or_default());
                out.push_str("}}");
            }
            NodeType::HardBreak => out.push('\n'),
            _ => {
                for child in &node.children {
                    self.write_text(*child, out);
                }
            }
        }
    }

    fn alloc(&mut self, node: Node) -> NodeKey {
        self.live += 1;
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                NodeKey {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeKey {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        }
    }

    /// Insert a subtree below `parent`; `index` is clamped to the child count
    pub(crate) fn insert_spec(&mut self, parent: NodeKey, index: usize, spec: &NodeSpec) -> NodeKey {
        let key = self.alloc(Node {
            node_type: spec.node_type,
            attrs: spec.attrs.clone(),
            text: spec.text.clone(),
            children: Vec::new(),
            parent: Some(parent),
        });

        for (i, child) in spec.children.iter().enumerate() {
            self.insert_spec(key, i, child);
        }

        if let Some(parent_node) = self.get_mut(parent) {
            let index = index.min(parent_node.children.len());
            parent_node.children.insert(index, key);
        }
        key
    }

    /// Unlink a node from its parent without freeing it; returns its old index
    pub(crate) fn detach(&mut self, key: NodeKey) -> Option<usize> {
        let parent_key = self.get(key)?.parent?;
        let parent = self.get_mut(parent_key)?;
        let index = parent.children.iter().position(|child| *child == key)?;
        parent.children.remove(index);
        if let Some(node) = self.get_mut(key) {
            node.parent = None;
        }
        Some(index)
    }

    pub(crate) fn attach(&mut self, key: NodeKey, parent: NodeKey, index: usize) -> usize {
        let Some(parent_node) = self.get_mut(parent) else {
            return 0;
        };
        let index = index.min(parent_node.children.len());
        parent_node.children.insert(index, key);
        if let Some(node) = self.get_mut(key) {
            node.parent = Some(parent);
        }
        index
    }

    /// Detach and free a subtree, retiring every key in it
    pub(crate) fn remove(&mut self, key: NodeKey) {
        self.detach(key);
        self.free_subtree(key);
    }

    fn free_subtree(&mut self, key: NodeKey) {
        let Some(slot) = self.slots.get_mut(key.index as usize) else {
            return;
        };
        if slot.generation != key.generation {
            return;
        }
        let Some(node) = slot.node.take() else {
            return;
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index);
        self.live -= 1;

        for child in node.children {
            self.free_subtree(child);
        }
    }
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NodeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeTree")
            .field("nodes", &self.live)
            .field("blocks", &self.to_specs())
            .finish()
    }
}
