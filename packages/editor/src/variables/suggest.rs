//! # Variable Suggestions
//!
//! Typing `{{` opens a suggestion list built from the example data the host
//! supplies. Every keystroke re-filters the list against the partial path
//! typed so far.
//!
//! ```text
//!            "{{"                 keystroke
//! Closed ───────────▶ Open ◀──────────────┐
//!   ▲                  │ │                │
//!   │  select / "}}"   │ └────────────────┘
//!   └──────────────────┘
//! ```
//!
//! Ranking: whole-path prefix matches first, then paths with a segment that
//! starts with the query, then plain substring matches. Ties go to shallower
//! paths, then alphabetical order.

use serde::Serialize;
use serde_json::Value;

pub const TRIGGER: &str = "{{";
const CLOSE: &str = "}}";

/// A leaf of the variables object, addressed by dot-path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariablePath {
    pub path: String,
    pub example: Value,
}

impl VariablePath {
    fn depth(&self) -> usize {
        self.path.split('.').count()
    }
}

/// Flatten nested example data into leaf dot-paths
///
/// Arrays, scalars and empty objects are leaves.
pub fn flatten_variables(variables: &Value) -> Vec<VariablePath> {
    let mut out = Vec::new();
    if let Value::Object(map) = variables {
        for (key, value) in map {
            flatten_into(key.clone(), value, &mut out);
        }
    }
    out.sort_by(|a, b| a.path.cmp(&b.path));
    out
}

fn flatten_into(prefix: String, value: &Value, out: &mut Vec<VariablePath>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                flatten_into(format!("{}.{}", prefix, key), child, out);
            }
        }
        _ => out.push(VariablePath {
            path: prefix,
            example: value.clone(),
        }),
    }
}

/// Replace `from..to` (byte offsets into the text before the cursor) with a
/// chip named `name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub name: String,
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SuggestionState {
    Closed,
    Open {
        query: String,
        /// Byte offset of the trigger
        from: usize,
        items: Vec<VariablePath>,
        highlighted: usize,
    },
}

#[derive(Debug, Clone)]
pub struct Suggester {
    paths: Vec<VariablePath>,
    state: SuggestionState,
    disabled: bool,
    limit: usize,
}

impl Suggester {
    pub fn new(paths: Vec<VariablePath>) -> Self {
        Self {
            paths,
            state: SuggestionState::Closed,
            disabled: false,
            limit: 50,
        }
    }

    pub fn from_variables(variables: &Value) -> Self {
        Self::new(flatten_variables(variables))
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
        if disabled {
            self.close();
        }
    }

    pub fn state(&self) -> &SuggestionState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SuggestionState::Open { .. })
    }

    pub fn items(&self) -> &[VariablePath] {
        match &self.state {
            SuggestionState::Open { items, .. } => items,
            SuggestionState::Closed => &[],
        }
    }

    pub fn highlighted(&self) -> Option<&VariablePath> {
        match &self.state {
            SuggestionState::Open { items, highlighted, .. } => items.get(*highlighted),
            SuggestionState::Closed => None,
        }
    }

    pub fn close(&mut self) {
        self.state = SuggestionState::Closed;
    }

    /// Feed the text between the start of the text run and the cursor
    ///
    /// Returns a commit when the user typed past a complete, known path
    /// (`{{user.firstName}}`).
    pub fn on_input(&mut self, text_before_cursor: &str) -> Option<Commit> {
        if self.disabled {
            self.close();
            return None;
        }

        let Some(from) = text_before_cursor.rfind(TRIGGER) else {
            self.close();
            return None;
        };
        let typed = &text_before_cursor[from + TRIGGER.len()..];

        if let Some(name) = typed.strip_suffix(CLOSE) {
            self.close();
            let name = name.trim();
            if !name.contains(CLOSE) && self.paths.iter().any(|p| p.path == name) {
                return Some(Commit {
                    name: name.to_string(),
                    from,
                    to: text_before_cursor.len(),
                });
            }
            return None;
        }

        if typed.contains(['{', '}']) || typed.chars().any(char::is_whitespace) {
            self.close();
            return None;
        }

        let items = self.rank(typed);
        let highlighted = match &self.state {
            SuggestionState::Open { highlighted, .. } => (*highlighted).min(items.len().saturating_sub(1)),
            SuggestionState::Closed => 0,
        };
        self.state = SuggestionState::Open {
            query: typed.to_string(),
            from,
            items,
            highlighted,
        };
        None
    }

    /// Move the highlight, wrapping at both ends
    pub fn move_highlight(&mut self, delta: isize) {
        if let SuggestionState::Open { items, highlighted, .. } = &mut self.state {
            if items.is_empty() {
                return;
            }
            let len = items.len() as isize;
            *highlighted = ((*highlighted as isize + delta).rem_euclid(len)) as usize;
        }
    }

    /// Commit the highlighted entry
    pub fn select(&mut self) -> Option<Commit> {
        let commit = match &self.state {
            SuggestionState::Open {
                query,
                from,
                items,
                highlighted,
            } => items.get(*highlighted).map(|item| Commit {
                name: item.path.clone(),
                from: *from,
                to: from + TRIGGER.len() + query.len(),
            }),
            SuggestionState::Closed => None,
        };
        if commit.is_some() {
            self.close();
        }
        commit
    }

    fn rank(&self, query: &str) -> Vec<VariablePath> {
        let query = query.to_lowercase();
        let mut scored: Vec<(u8, &VariablePath)> = self
            .paths
            .iter()
            .filter_map(|path| score(&path.path.to_lowercase(), &query).map(|s| (s, path)))
            .collect();

        scored.sort_by(|(sa, a), (sb, b)| {
            sa.cmp(sb)
                .then_with(|| a.depth().cmp(&b.depth()))
                .then_with(|| a.path.cmp(&b.path))
        });

        scored
            .into_iter()
            .take(self.limit)
            .map(|(_, path)| path.clone())
            .collect()
    }
}

fn score(path: &str, query: &str) -> Option<u8> {
    if path.starts_with(query) {
        Some(0)
    } else if path.split('.').any(|segment| segment.starts_with(query)) {
        Some(1)
    } else if path.contains(query) {
        Some(2)
    } else {
        None
    }
}
