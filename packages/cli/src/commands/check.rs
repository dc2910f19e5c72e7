use super::variables::load_variable_paths;
use super::{load_config, load_template, open_all_channels};
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use elemental_document::{ChannelKind, TemplateDocument};
use elemental_editor::{EditorConfig, InvalidPolicy, Notice, DEFAULT_CONFIG_NAME};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Template JSON file or directory of templates
    pub input: PathBuf,

    /// Example data; only its leaf paths count as known variables
    #[arg(long)]
    pub variables: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub channel: ChannelKind,
    pub variable: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub findings: Vec<Finding>,
}

pub fn check(args: CheckArgs, config_dir: &Path) -> Result<()> {
    let config = load_config(config_dir)?;
    let known = match &args.variables {
        Some(path) => Some(load_variable_paths(path)?.into_iter().collect::<HashSet<_>>()),
        None => None,
    };

    let files = find_templates(&args.input)?;
    let mut reports = Vec::with_capacity(files.len());
    for file in &files {
        let document = load_template(file)?;
        reports.push(FileReport {
            path: file.clone(),
            findings: check_document(document, &config, known.clone())?,
        });
    }

    let total: usize = reports.iter().map(|r| r.findings.len()).sum();
    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&reports)?),
        "text" => print_reports(&reports, total),
        other => return Err(anyhow!("Unknown format: {}. Use: text or json", other)),
    }

    if total > 0 {
        return Err(anyhow!("{} invalid variable(s) found", total));
    }
    Ok(())
}

/// Every chip the configured validation rejects, channel by channel
pub fn check_document(
    document: TemplateDocument,
    config: &EditorConfig,
    known: Option<HashSet<String>>,
) -> Result<Vec<Finding>> {
    let mut validation = config.to_validation_config().with_policy(InvalidPolicy::Mark);
    if let Some(known) = known {
        validation = validation.with_validator(move |name| known.contains(name));
    }
    let mut editor = open_all_channels(document, config, Some(validation))?;

    let mut findings = Vec::new();
    for channel in editor.channels().to_vec() {
        editor.set_active_channel(channel)?;
        for notice in editor.drain_notices() {
            let Notice::InvalidVariable { name, message, .. } = notice;
            findings.push(Finding {
                channel,
                variable: name,
                message,
            });
        }
    }
    Ok(findings)
}

fn find_templates(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(anyhow!("Input path does not exist: {}", input.display()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        let is_json = path.extension().map(|e| e == "json").unwrap_or(false);
        let is_config = path.file_name().map(|n| n == DEFAULT_CONFIG_NAME).unwrap_or(false);
        if entry.file_type().is_file() && is_json && !is_config {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

fn print_reports(reports: &[FileReport], total: usize) {
    for report in reports {
        if report.findings.is_empty() {
            println!("  {} {}", "✓".green(), report.path.display());
            continue;
        }
        println!("  {} {}", "✗".red(), report.path.display());
        for finding in &report.findings {
            let detail = finding.message.as_deref().unwrap_or("invalid variable");
            println!(
                "      [{}] {{{{{}}}}} {}",
                finding.channel,
                finding.variable.yellow(),
                detail.dimmed()
            );
        }
    }

    println!();
    if total == 0 {
        println!("✨ {} {} file(s) checked", "Done".green().bold(), reports.len());
    } else {
        println!(
            "✨ {} {} file(s) checked, {} {}",
            "Done".red().bold(),
            reports.len(),
            "invalid variables:".red(),
            total
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = r#"{
        "version": "2022-01-01",
        "elements": [
            {
                "type": "channel",
                "channel": "email",
                "elements": [{"type": "text", "content": "Hi {{user.firstName}} {{user.unknown}}"}]
            },
            {
                "type": "channel",
                "channel": "push",
                "elements": [{"type": "text", "content": "{{bad name}}"}]
            }
        ]
    }"#;

    #[test]
    fn test_format_errors_without_known_variables() {
        let document = TemplateDocument::from_json(TEMPLATE).unwrap();

        let findings = check_document(document, &EditorConfig::default(), None).unwrap();

        assert_eq!(
            findings,
            vec![Finding {
                channel: ChannelKind::Push,
                variable: "bad name".to_string(),
                message: None,
            }]
        );
    }

    #[test]
    fn test_known_variables_reject_unknown_paths() {
        let document = TemplateDocument::from_json(TEMPLATE).unwrap();
        let known: HashSet<String> = ["user.firstName".to_string()].into_iter().collect();

        let findings = check_document(document, &EditorConfig::default(), Some(known)).unwrap();

        let names: Vec<&str> = findings.iter().map(|f| f.variable.as_str()).collect();
        assert_eq!(names, vec!["user.unknown", "bad name"]);
    }

    #[test]
    fn test_directory_walk_skips_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), TEMPLATE).unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let files = find_templates(dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("a.json")]);
    }
}
