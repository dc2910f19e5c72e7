//! # Surface Conversion
//!
//! Maps a channel's content elements onto the editing tree and back.
//!
//! ```text
//! ChannelBlock ──channel_to_tree──▶ NodeTree ──tree_to_elements──▶ Vec<ContentElement>
//! ```
//!
//! Element attributes travel through serde, so every schema field (including
//! `id`) becomes a node attribute of the same name. `content` strings are split
//! into inline children: text runs, variable chips and hard breaks.

use crate::tree::{Attrs, NodeKey, NodeSpec, NodeTree, NodeType};
use crate::variables::variable_pattern;
use elemental_document::{
    ActionElement, ChannelBlock, Column, ColumnsElement, ContentElement, DividerElement,
    ImageElement, ListElement, ListItem, MetaElement, QuoteElement, TextElement,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Invalid {node_type} attributes: {source}")]
    Attributes {
        node_type: NodeType,
        source: serde_json::Error,
    },

    #[error("{node_type} has no attribute named `{name}`")]
    UnknownAttribute { node_type: NodeType, name: String },

    #[error("{0} cannot appear at this level of a channel")]
    UnexpectedNode(NodeType),
}

/// Build the editing tree for one channel
pub fn channel_to_tree(block: &ChannelBlock) -> Result<NodeTree, ConvertError> {
    let specs = block
        .elements
        .iter()
        .map(element_to_spec)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(NodeTree::from_specs(&specs))
}

/// Serialise the editing tree back into channel elements
pub fn tree_to_elements(tree: &NodeTree) -> Result<Vec<ContentElement>, ConvertError> {
    let root = tree.root();
    let children = tree.get(root).map(|node| node.children().to_vec()).unwrap_or_default();
    children.into_iter().map(|key| node_to_element(tree, key)).collect()
}

/// Convert one element (and its nested content) into a detached subtree
pub fn element_to_spec(element: &ContentElement) -> Result<NodeSpec, ConvertError> {
    let spec = match element {
        ContentElement::Meta(meta) => NodeSpec {
            attrs: to_attrs(NodeType::Meta, meta, &[])?,
            ..NodeSpec::new(NodeType::Meta)
        },
        ContentElement::Text(text) => NodeSpec {
            attrs: to_attrs(NodeType::Paragraph, text, &["content"])?,
            children: parse_inline(&text.content),
            ..NodeSpec::new(NodeType::Paragraph)
        },
        ContentElement::Quote(quote) => NodeSpec {
            attrs: to_attrs(NodeType::Blockquote, quote, &["content"])?,
            children: parse_inline(&quote.content),
            ..NodeSpec::new(NodeType::Blockquote)
        },
        ContentElement::Image(image) => NodeSpec {
            attrs: to_attrs(NodeType::Image, image, &[])?,
            ..NodeSpec::new(NodeType::Image)
        },
        ContentElement::Action(action) => NodeSpec {
            attrs: to_attrs(NodeType::Button, action, &[])?,
            ..NodeSpec::new(NodeType::Button)
        },
        ContentElement::Divider(divider) => NodeSpec {
            attrs: to_attrs(NodeType::Divider, divider, &[])?,
            ..NodeSpec::new(NodeType::Divider)
        },
        ContentElement::List(list) => {
            let mut children = Vec::with_capacity(list.items.len());
            for item in &list.items {
                children.push(NodeSpec {
                    attrs: to_attrs(NodeType::ListItem, item, &["content"])?,
                    children: parse_inline(&item.content),
                    ..NodeSpec::new(NodeType::ListItem)
                });
            }
            NodeSpec {
                attrs: to_attrs(NodeType::List, list, &["items"])?,
                children,
                ..NodeSpec::new(NodeType::List)
            }
        }
        ContentElement::Columns(columns) => {
            let mut children = Vec::with_capacity(columns.columns.len());
            for column in &columns.columns {
                children.push(NodeSpec {
                    attrs: to_attrs(NodeType::Column, column, &["elements"])?,
                    children: column
                        .elements
                        .iter()
                        .map(element_to_spec)
                        .collect::<Result<Vec<_>, _>>()?,
                    ..NodeSpec::new(NodeType::Column)
                });
            }
            NodeSpec {
                attrs: to_attrs(NodeType::Columns, columns, &["columns"])?,
                children,
                ..NodeSpec::new(NodeType::Columns)
            }
        }
    };
    Ok(spec)
}

fn node_to_element(tree: &NodeTree, key: NodeKey) -> Result<ContentElement, ConvertError> {
    let Some(node) = tree.get(key) else {
        return Err(ConvertError::UnexpectedNode(NodeType::Doc));
    };
    let node_type = node.node_type();
    let attrs = node.attrs();

    let element = match node_type {
        NodeType::Meta => ContentElement::Meta(from_attrs::<MetaElement>(node_type, attrs, Map::new())?),
        NodeType::Paragraph => ContentElement::Text(from_attrs::<TextElement>(
            node_type,
            attrs,
            content_field(tree, key),
        )?),
        NodeType::Blockquote => ContentElement::Quote(from_attrs::<QuoteElement>(
            node_type,
            attrs,
            content_field(tree, key),
        )?),
        NodeType::Image => ContentElement::Image(from_attrs::<ImageElement>(node_type, attrs, Map::new())?),
        NodeType::Button => ContentElement::Action(from_attrs::<ActionElement>(node_type, attrs, Map::new())?),
        NodeType::Divider => ContentElement::Divider(from_attrs::<DividerElement>(node_type, attrs, Map::new())?),
        NodeType::List => {
            let mut items: Vec<ListItem> = Vec::with_capacity(node.children().len());
            for item_key in node.children() {
                let item = tree
                    .get(*item_key)
                    .ok_or(ConvertError::UnexpectedNode(NodeType::ListItem))?;
                if item.node_type() != NodeType::ListItem {
                    return Err(ConvertError::UnexpectedNode(item.node_type()));
                }
                items.push(from_attrs(NodeType::ListItem, item.attrs(), content_field(tree, *item_key))?);
            }
            let mut extra = Map::new();
            extra.insert(
                "items".to_string(),
                serde_json::to_value(items).map_err(|source| ConvertError::Attributes { node_type, source })?,
            );
            ContentElement::List(from_attrs::<ListElement>(node_type, attrs, extra)?)
        }
        NodeType::Columns => {
            let mut columns = Vec::with_capacity(node.children().len());
            for column_key in node.children() {
                let column = tree
                    .get(*column_key)
                    .ok_or(ConvertError::UnexpectedNode(NodeType::Column))?;
                if column.node_type() != NodeType::Column {
                    return Err(ConvertError::UnexpectedNode(column.node_type()));
                }
                let mut parsed: Column = from_attrs(NodeType::Column, column.attrs(), Map::new())?;
                parsed.elements = column
                    .children()
                    .iter()
                    .map(|child| node_to_element(tree, *child))
                    .collect::<Result<Vec<_>, _>>()?;
                columns.push(parsed);
            }
            let mut parsed: ColumnsElement = from_attrs(node_type, attrs, Map::new())?;
            parsed.columns = columns;
            ContentElement::Columns(parsed)
        }
        other => return Err(ConvertError::UnexpectedNode(other)),
    };
    Ok(element)
}

fn content_field(tree: &NodeTree, key: NodeKey) -> Map<String, Value> {
    let mut extra = Map::new();
    extra.insert("content".to_string(), Value::String(tree.text_content(key)));
    extra
}

fn to_attrs<T: Serialize>(node_type: NodeType, value: &T, skip: &[&str]) -> Result<Attrs, ConvertError> {
    let value = serde_json::to_value(value).map_err(|source| ConvertError::Attributes { node_type, source })?;
    let mut attrs = Attrs::new();
    if let Value::Object(map) = value {
        for (name, value) in map {
            if name != "type" && !skip.contains(&name.as_str()) {
                attrs.insert(name, value);
            }
        }
    }
    Ok(attrs)
}

/// Rebuild an element from node attributes
///
/// A non-null attribute the element schema has no field for is an error:
/// serde would drop it silently and the tree would drift from the value.
fn from_attrs<T: Serialize + DeserializeOwned>(
    node_type: NodeType,
    attrs: &Attrs,
    extra: Map<String, Value>,
) -> Result<T, ConvertError> {
    let mut map: Map<String, Value> = attrs
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    map.extend(extra);
    let names: Vec<String> = map.keys().cloned().collect();

    let parsed: T = serde_json::from_value(Value::Object(map))
        .map_err(|source| ConvertError::Attributes { node_type, source })?;

    let known = serde_json::to_value(&parsed).map_err(|source| ConvertError::Attributes { node_type, source })?;
    if let Value::Object(known) = known {
        if let Some(name) = names.into_iter().find(|name| !known.contains_key(name)) {
            return Err(ConvertError::UnknownAttribute { node_type, name });
        }
    }
    Ok(parsed)
}

/// Split a `content` string into inline nodes
///
/// `{{ name }}` becomes a variable chip (surrounding whitespace trimmed) and
/// `\n` a hard break.
pub fn parse_inline(content: &str) -> Vec<NodeSpec> {
    let mut out = Vec::new();
    let mut last = 0;

    for captures in variable_pattern().captures_iter(content) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        push_text(&mut out, &content[last..whole.start()]);
        let name = captures.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        out.push(NodeSpec::variable(name));
        last = whole.end();
    }
    push_text(&mut out, &content[last..]);
    out
}

fn push_text(out: &mut Vec<NodeSpec>, text: &str) {
    for (i, part) in text.split('\n').enumerate() {
        if i > 0 {
            out.push(NodeSpec::new(NodeType::HardBreak));
        }
        if !part.is_empty() {
            out.push(NodeSpec::text(part));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Position;
    use elemental_document::{Alignment, ChannelKind, ListType};
    use serde_json::json;

    fn email(elements: Vec<ContentElement>) -> ChannelBlock {
        ChannelBlock::with_elements(ChannelKind::Email, elements)
    }

    #[test]
    fn test_parse_inline_splits_variables_and_breaks() {
        let specs = parse_inline("Hi {{ user.name }},\nbye");

        let types: Vec<NodeType> = specs.iter().map(|s| s.node_type).collect();
        assert_eq!(
            types,
            vec![NodeType::Text, NodeType::Variable, NodeType::Text, NodeType::HardBreak, NodeType::Text]
        );
        assert_eq!(specs[1].attrs.get("id"), Some(&json!("user.name")));
    }

    #[test]
    fn test_text_element_becomes_paragraph() {
        let mut text = TextElement::new("Hello {{user.firstName}}!");
        text.align = Some(Alignment::Center);
        text.id = Some("node-abc".to_string());

        let tree = channel_to_tree(&email(vec![ContentElement::Text(text)])).unwrap();
        let paragraph = tree.node_at(&Position::new(vec![0])).unwrap();
        let node = tree.get(paragraph).unwrap();

        assert_eq!(node.node_type(), NodeType::Paragraph);
        assert_eq!(node.attr("align"), Some(&json!("center")));
        assert_eq!(node.id(), Some("node-abc"));
        assert!(node.attr("content").is_none());
        assert_eq!(node.children().len(), 3);
    }

    #[test]
    fn test_round_trip_preserves_elements() {
        let elements = vec![
            ContentElement::Meta(MetaElement {
                title: Some("Subject {{order.id}}".to_string()),
            }),
            ContentElement::Text(TextElement::new("Line one\nLine {{two}}")),
            ContentElement::Image(ImageElement {
                src: "https://cdn.example.com/a.png".to_string(),
                alt: Some("logo".to_string()),
                ..Default::default()
            }),
            ContentElement::Action(ActionElement {
                content: "Open".to_string(),
                href: "https://example.com".to_string(),
                ..Default::default()
            }),
            ContentElement::Divider(DividerElement::default()),
            ContentElement::Quote(QuoteElement {
                content: "Quoted".to_string(),
                ..Default::default()
            }),
            ContentElement::List(ListElement {
                id: None,
                list_type: ListType::Unordered,
                items: vec![
                    ListItem {
                        id: Some("node-item-a".to_string()),
                        content: "a {{x}}".to_string(),
                    },
                    ListItem {
                        id: None,
                        content: "b".to_string(),
                    },
                ],
            }),
            ContentElement::Columns(ColumnsElement {
                id: Some("node-cols".to_string()),
                columns: vec![Column {
                    id: None,
                    width: Some("50%".to_string()),
                    elements: vec![ContentElement::Text(TextElement::new("inside"))],
                }],
            }),
        ];

        let tree = channel_to_tree(&email(elements.clone())).unwrap();
        let back = tree_to_elements(&tree).unwrap();

        assert_eq!(back, elements);
    }

    #[test]
    fn test_invalid_attribute_fails_conversion() {
        let tree = NodeTree::from_specs(&[NodeSpec::paragraph(vec![]).with_attr("align", json!("middle"))]);

        let err = tree_to_elements(&tree).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::Attributes {
                node_type: NodeType::Paragraph,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_attribute_fails_conversion() {
        let tree = NodeTree::from_specs(&[NodeSpec::paragraph(vec![NodeSpec::text("Hi")]).with_attr("foo", json!("bar"))]);

        let err = tree_to_elements(&tree).unwrap_err();
        match err {
            ConvertError::UnknownAttribute { node_type, name } => {
                assert_eq!(node_type, NodeType::Paragraph);
                assert_eq!(name, "foo");
            }
            other => panic!("expected unknown attribute, got {}", other),
        }
    }

    #[test]
    fn test_list_item_ids_reach_the_tree() {
        let block = email(vec![ContentElement::List(ListElement {
            id: Some("node-list".to_string()),
            list_type: ListType::Ordered,
            items: vec![ListItem {
                id: Some("node-item-a".to_string()),
                content: "a".to_string(),
            }],
        })]);

        let tree = channel_to_tree(&block).unwrap();
        let item = tree.node_at(&Position::new(vec![0, 0])).unwrap();
        assert_eq!(tree.get(item).unwrap().id(), Some("node-item-a"));
    }

    #[test]
    fn test_transient_attributes_do_not_leak() {
        let tree = NodeTree::from_specs(&[NodeSpec::paragraph(vec![
            NodeSpec::variable("user.id").with_attr("invalid", json!(true)),
        ])]);

        let back = tree_to_elements(&tree).unwrap();
        assert_eq!(back, vec![ContentElement::Text(TextElement::new("{{user.id}}"))]);
    }
}
