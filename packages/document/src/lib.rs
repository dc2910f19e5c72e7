//! # Elemental Document
//!
//! Versioned, multi-channel notification template format.
//!
//! ```text
//! TemplateDocument
//!  └─ ChannelBlock (email | sms | push | inbox | slack | msteams)
//!      └─ ContentElement (meta, text, image, action, divider, quote, list, columns)
//! ```
//!
//! Element order inside a channel is render order. Elements that can be
//! selected in the editor carry an optional `id` (`node-<uuid>`), assigned by
//! the editor the first time it sees them.

mod channel;
mod document;
mod elements;
mod error;

pub use channel::{ChannelBlock, ChannelKind};
pub use document::{TemplateDocument, DEFAULT_VERSION};
pub use elements::{
    ActionElement, Alignment, Border, Column, ColumnsElement, ContentElement, DividerElement,
    ImageElement, ListElement, ListItem, ListType, MetaElement, QuoteElement, TextElement,
    TextStyle,
};
pub use error::{DocumentError, DocumentResult};
