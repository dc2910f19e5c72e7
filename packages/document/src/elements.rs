//! # Content Elements
//!
//! Polymorphic content of a channel block. Each kind has a fixed attribute
//! schema; the JSON tag is the `type` field.

use serde::{Deserialize, Serialize};

/// One piece of channel content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentElement {
    Meta(MetaElement),
    Text(TextElement),
    Image(ImageElement),
    /// Button
    Action(ActionElement),
    Divider(DividerElement),
    /// Blockquote
    Quote(QuoteElement),
    List(ListElement),
    Columns(ColumnsElement),
}

impl ContentElement {
    /// The JSON `type` tag of this element
    pub fn kind_name(&self) -> &'static str {
        match self {
            ContentElement::Meta(_) => "meta",
            ContentElement::Text(_) => "text",
            ContentElement::Image(_) => "image",
            ContentElement::Action(_) => "action",
            ContentElement::Divider(_) => "divider",
            ContentElement::Quote(_) => "quote",
            ContentElement::List(_) => "list",
            ContentElement::Columns(_) => "columns",
        }
    }

    /// Identifier of the element, if it has been assigned one
    pub fn id(&self) -> Option<&str> {
        match self {
            ContentElement::Meta(_) => None,
            ContentElement::Text(e) => e.id.as_deref(),
            ContentElement::Image(e) => e.id.as_deref(),
            ContentElement::Action(e) => e.id.as_deref(),
            ContentElement::Divider(e) => e.id.as_deref(),
            ContentElement::Quote(e) => e.id.as_deref(),
            ContentElement::List(e) => e.id.as_deref(),
            ContentElement::Columns(e) => e.id.as_deref(),
        }
    }

    /// Visit this element and every nested element in document order
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a ContentElement)) {
        visit(self);
        if let ContentElement::Columns(columns) = self {
            for column in &columns.columns {
                for element in &column.elements {
                    element.walk(visit);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextStyle {
    Text,
    H1,
    H2,
    Subtext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    Ordered,
    Unordered,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Border {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(default)]
    pub enabled: bool,
}

/// Channel metadata, e.g. the email subject
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetaElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Text with `{{variable}}` tokens
    #[serde(default)]
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<Alignment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<Border>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_style: Option<TextStyle>,
}

impl TextElement {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub src: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<Alignment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<Border>,
}

/// Button
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActionElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Button label
    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub href: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<Alignment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<String>,
}

/// Divider or spacer
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DividerElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<String>,
}

/// Blockquote
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuoteElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<Alignment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub list_type: ListType,

    #[serde(default)]
    pub items: Vec<ListItem>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ListItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnsElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Column {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,

    #[serde(default)]
    pub elements: Vec<ContentElement>,
}
