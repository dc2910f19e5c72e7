pub mod check;
pub mod inspect;
pub mod stamp;
pub mod variables;

pub use check::{check, CheckArgs};
pub use inspect::{inspect, InspectArgs};
pub use stamp::{stamp, StampArgs};
pub use variables::{variables, VariablesArgs};

use anyhow::{anyhow, Result};
use elemental_document::TemplateDocument;
use elemental_editor::{EditorConfig, EditorOptions, RoutingConfig, TemplateEditor, ValidationConfig};
use std::path::Path;

pub(crate) fn load_template(path: &Path) -> Result<TemplateDocument> {
    TemplateDocument::load(path).map_err(|e| anyhow!("{}: {}", path.display(), e))
}

pub(crate) fn load_config(dir: &Path) -> Result<EditorConfig> {
    EditorConfig::load(dir).map_err(|e| anyhow!("Invalid config in {}: {}", dir.display(), e))
}

/// Open a session that routes every channel present in `document`
///
/// Mounting a channel assigns ids and validates its chips, so visiting each
/// channel once processes the whole document.
pub(crate) fn open_all_channels(
    document: TemplateDocument,
    config: &EditorConfig,
    validation: Option<ValidationConfig>,
) -> Result<TemplateEditor> {
    let channels = document.channels();
    let mut config = config.clone();
    if !channels.is_empty() {
        config.routing = RoutingConfig::new(config.routing.method, channels);
    }
    // Nothing in the CLI persists behind the user's back
    config.autosave = false;

    let mut options = EditorOptions::new().with_config(config);
    if let Some(validation) = validation {
        options = options.with_validation(validation);
    }
    Ok(TemplateEditor::new(document, options)?)
}
