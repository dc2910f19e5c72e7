use super::inspect::summarize;
use super::{load_config, load_template, open_all_channels};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use elemental_document::TemplateDocument;
use elemental_editor::{EditorConfig, FileStore, TemplateStore, ValidationConfig};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Args, Debug)]
pub struct StampArgs {
    /// Template JSON file
    pub input: PathBuf,

    /// Write to this file instead of overwriting the input
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the stamped template instead of writing it
    #[arg(long)]
    pub stdout: bool,
}

pub fn stamp(args: StampArgs, config_dir: &Path) -> Result<()> {
    let config = load_config(config_dir)?;
    let document = load_template(&args.input)?;

    let missing: usize = summarize(&document)?.channels.iter().map(|c| c.missing_ids).sum();
    let stamped = stamp_document(document, &config)?;

    if args.stdout {
        println!("{}", stamped.to_json_pretty()?);
        return Ok(());
    }

    let output = args.output.unwrap_or_else(|| args.input.clone());
    FileStore::new(&output).save(&stamped)?;

    if missing == 0 {
        println!("{} {} already fully stamped", "✓".green(), args.input.display());
    } else {
        println!(
            "{} Stamped {} block(s) → {}",
            "✓".green(),
            missing,
            output.display()
        );
    }
    Ok(())
}

/// Assign ids in every channel without touching anything else
pub fn stamp_document(document: TemplateDocument, config: &EditorConfig) -> Result<TemplateDocument> {
    // Chips are left exactly as written
    let validation = ValidationConfig::default().override_format_validation(true);
    let mut editor = open_all_channels(document, config, Some(validation))?;

    for channel in editor.channels().to_vec() {
        editor.set_active_channel(channel)?;
        let assigned = editor.assign_node_ids()?;
        debug!(%channel, assigned, "Stamped channel");
    }

    let value = editor.value().clone();
    editor.close()?;
    Ok(value)
}
