use super::load_template;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use elemental_document::{ChannelBlock, ContentElement, TemplateDocument};
use elemental_editor::{channel_to_tree, IdentityAssigner, NodeType};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Template JSON file
    pub input: PathBuf,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSummary {
    pub channel: String,
    pub elements: BTreeMap<String, usize>,
    pub variables: Vec<String>,
    pub missing_ids: usize,
}

#[derive(Debug, Serialize)]
pub struct TemplateSummary {
    pub version: String,
    pub channels: Vec<ChannelSummary>,
}

pub fn inspect(args: InspectArgs, _config_dir: &Path) -> Result<()> {
    let document = load_template(&args.input)?;
    let summary = summarize(&document)?;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
        "text" => print_summary(&args.input, &summary),
        other => return Err(anyhow!("Unknown format: {}. Use: text or json", other)),
    }
    Ok(())
}

pub fn summarize(document: &TemplateDocument) -> Result<TemplateSummary> {
    let channels = document
        .elements
        .iter()
        .map(summarize_channel)
        .collect::<Result<Vec<_>>>()?;

    Ok(TemplateSummary {
        version: document.version.clone(),
        channels,
    })
}

fn summarize_channel(block: &ChannelBlock) -> Result<ChannelSummary> {
    let mut elements = BTreeMap::new();
    for element in &block.elements {
        element.walk(&mut |element: &ContentElement| {
            *elements.entry(element.kind_name().to_string()).or_insert(0) += 1;
        });
    }

    let tree = channel_to_tree(block)?;
    let assigner = IdentityAssigner::default();
    let mut variables = Vec::new();
    let mut missing_ids = 0;
    for (key, _) in tree.descendants() {
        let Some(node) = tree.get(key) else {
            continue;
        };
        match node.node_type() {
            NodeType::Variable => {
                if let Some(name) = node.attr_str("id") {
                    if !variables.iter().any(|v| v == name) {
                        variables.push(name.to_string());
                    }
                }
            }
            node_type if assigner.tracks(node_type) && node.id().map_or(true, str::is_empty) => {
                missing_ids += 1;
            }
            _ => {}
        }
    }

    Ok(ChannelSummary {
        channel: block.channel.to_string(),
        elements,
        variables,
        missing_ids,
    })
}

fn print_summary(path: &Path, summary: &TemplateSummary) {
    println!("📄 {} {}", "Template".green().bold(), path.display());
    println!("   Version: {}", summary.version);
    println!();

    for channel in &summary.channels {
        println!("   {}", channel.channel.bright_blue().bold());
        if channel.elements.is_empty() {
            println!("     {}", "(empty)".dimmed());
        }
        for (kind, count) in &channel.elements {
            println!("     {:<10} {}", kind, count);
        }
        if !channel.variables.is_empty() {
            println!("     variables: {}", channel.variables.join(", ").cyan());
        }
        if channel.missing_ids > 0 {
            println!(
                "     {} {} block(s) without id (run `elemental stamp`)",
                "⚠".yellow(),
                channel.missing_ids
            );
        }
    }
}
