//! File-backed loading and round-trip behaviour

use elemental_document::{
    ChannelKind, ContentElement, DocumentError, ListType, TemplateDocument,
};
use std::io::Write;

const WELCOME: &str = r##"{
    "version": "2022-01-01",
    "elements": [
        {
            "type": "channel",
            "channel": "email",
            "elements": [
                { "type": "meta", "title": "Welcome aboard" },
                { "type": "text", "id": "node-1", "content": "Hi {{user.firstName}}", "align": "left" },
                { "type": "image", "src": "https://cdn.example.com/logo.png", "width": "120px" },
                { "type": "action", "content": "Get started", "href": "https://example.com", "background_color": "#3366ff" },
                { "type": "divider" },
                { "type": "quote", "content": "Ship it", "border_color": "#cccccc" },
                { "type": "list", "list_type": "ordered", "items": [{ "content": "One" }, { "content": "Two" }] },
                {
                    "type": "columns",
                    "columns": [
                        { "elements": [{ "type": "text", "content": "Left" }] },
                        { "elements": [{ "type": "text", "content": "Right" }] }
                    ]
                }
            ]
        },
        { "type": "channel", "channel": "inbox", "elements": [] }
    ]
}"##;

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(WELCOME.as_bytes()).unwrap();

    let doc = TemplateDocument::load(file.path()).unwrap();

    assert_eq!(doc.version, "2022-01-01");
    assert_eq!(doc.channels(), vec![ChannelKind::Email, ChannelKind::Inbox]);

    let email = doc.channel(ChannelKind::Email).unwrap();
    assert_eq!(email.elements.len(), 8);
    assert_eq!(email.elements[1].id(), Some("node-1"));

    match &email.elements[6] {
        ContentElement::List(list) => {
            assert_eq!(list.list_type, ListType::Ordered);
            assert_eq!(list.items.len(), 2);
        }
        other => panic!("Expected list, got {:?}", other),
    }
}

#[test]
fn test_serialised_document_reloads_identically() {
    let doc = TemplateDocument::from_json(WELCOME).unwrap();
    let json = doc.to_json_pretty().unwrap();
    let reloaded = TemplateDocument::from_json(&json).unwrap();

    assert_eq!(doc, reloaded);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = TemplateDocument::load(dir.path().join("missing.json")).unwrap_err();

    assert!(matches!(err, DocumentError::Io(_)));
}

#[test]
fn test_malformed_element_fails_fast() {
    let source = r#"{
        "version": "2022-01-01",
        "elements": [
            { "type": "channel", "channel": "email", "elements": [{ "type": "list", "items": [] }] }
        ]
    }"#;

    // `list_type` is required
    let err = TemplateDocument::from_json(source).unwrap_err();
    assert!(matches!(err, DocumentError::Json(_)));
}
