//! Built-in variable name syntax
//!
//! A name is a dot-separated path. Each segment is an identifier
//! (`[A-Za-z_$][A-Za-z0-9_$-]*`) or an array index (`[0-9]+`).

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

static VARIABLE_PATTERN: OnceLock<Regex> = OnceLock::new();
static SEGMENT_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Matches `{{ ... }}` tokens; group 1 is the raw name
pub fn variable_pattern() -> &'static Regex {
    VARIABLE_PATTERN.get_or_init(|| Regex::new(r"\{\{([^{}]*)\}\}").expect("variable pattern compiles"))
}

fn segment_pattern() -> &'static Regex {
    SEGMENT_PATTERN
        .get_or_init(|| Regex::new(r"^(?:[A-Za-z_$][A-Za-z0-9_$-]*|[0-9]+)$").expect("segment pattern compiles"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatViolation {
    Empty,
    ContainsWhitespace,
    EmptySegment,
    InvalidSegment(String),
}

impl fmt::Display for FormatViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatViolation::Empty => f.write_str("variable name is empty"),
            FormatViolation::ContainsWhitespace => f.write_str("variable name contains whitespace"),
            FormatViolation::EmptySegment => f.write_str("variable path has an empty segment"),
            FormatViolation::InvalidSegment(segment) => write!(f, "invalid path segment `{}`", segment),
        }
    }
}

pub fn check_format(name: &str) -> Result<(), FormatViolation> {
    if name.is_empty() {
        return Err(FormatViolation::Empty);
    }
    if name.chars().any(char::is_whitespace) {
        return Err(FormatViolation::ContainsWhitespace);
    }
    for segment in name.split('.') {
        if segment.is_empty() {
            return Err(FormatViolation::EmptySegment);
        }
        if !segment_pattern().is_match(segment) {
            return Err(FormatViolation::InvalidSegment(segment.to_string()));
        }
    }
    Ok(())
}

pub fn is_valid_variable_name(name: &str) -> bool {
    check_format(name).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_dotted_paths() {
        assert!(is_valid_variable_name("user.firstName"));
        assert!(is_valid_variable_name("order.items.0.sku"));
        assert!(is_valid_variable_name("$ctx.tenant-id"));
        assert!(is_valid_variable_name("_private"));
    }

    #[test]
    fn test_rejects_malformed_names() {
        assert_eq!(check_format(""), Err(FormatViolation::Empty));
        assert_eq!(check_format("user name"), Err(FormatViolation::ContainsWhitespace));
        assert_eq!(check_format("user..name"), Err(FormatViolation::EmptySegment));
        assert_eq!(check_format(".user"), Err(FormatViolation::EmptySegment));
        assert_eq!(
            check_format("user.1abc"),
            Err(FormatViolation::InvalidSegment("1abc".to_string()))
        );
        assert!(!is_valid_variable_name("user.na<me"));
    }

    #[test]
    fn test_variable_pattern_finds_tokens() {
        let names: Vec<&str> = variable_pattern()
            .captures_iter("Hi {{user.name}}, order {{ order.id }} {{unclosed")
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect();

        assert_eq!(names, vec!["user.name", " order.id "]);
    }
}
