use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use elemental_editor::variables::{flatten_variables, VariablePath, TRIGGER};
use elemental_editor::Suggester;
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct VariablesArgs {
    /// JSON file with example data
    pub input: PathBuf,

    /// Rank paths the way the `{{` suggestion list does
    #[arg(short, long)]
    pub query: Option<String>,

    /// Maximum number of suggestions
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
}

pub fn variables(args: VariablesArgs) -> Result<()> {
    let data = load_data(&args.input)?;

    let paths = match &args.query {
        Some(query) => suggest(&data, query, args.limit),
        None => flatten_variables(&data),
    };

    if paths.is_empty() {
        println!("{}", "⚠️  No variables found".yellow());
        return Ok(());
    }

    for path in &paths {
        println!("  {} {}", path.path.cyan(), example(&path.example).dimmed());
    }
    Ok(())
}

/// Leaf paths of the example data in `path`
pub(crate) fn load_variable_paths(path: &Path) -> Result<Vec<String>> {
    Ok(flatten_variables(&load_data(path)?)
        .into_iter()
        .map(|p| p.path)
        .collect())
}

fn load_data(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| anyhow!("{}: {}", path.display(), e))?;
    serde_json::from_str(&content).map_err(|e| anyhow!("{}: {}", path.display(), e))
}

fn suggest(data: &Value, query: &str, limit: usize) -> Vec<VariablePath> {
    let mut suggester = Suggester::from_variables(data).with_limit(limit);
    suggester.on_input(&format!("{}{}", TRIGGER, query));
    suggester.items().to_vec()
}

fn example(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_suggest_ranks_prefix_first() {
        let data = json!({
            "user": {"firstName": "John", "email": "john@example.com"},
            "order": {"userCount": 2}
        });

        let names: Vec<String> = suggest(&data, "user", 10).into_iter().map(|p| p.path).collect();
        assert_eq!(names.first().map(String::as_str), Some("user.email"));
        assert!(names.contains(&"order.userCount".to_string()));
    }

    #[test]
    fn test_load_variable_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, r#"{"user": {"firstName": "John"}, "items": [1, 2]}"#).unwrap();

        let mut paths = load_variable_paths(&path).unwrap();
        paths.sort();
        assert_eq!(paths, vec!["items", "user.firstName"]);
    }
}
