//! # Variable Tokens
//!
//! `{{variable}}` chips inside text content.
//!
//! - [`format`]: built-in syntax check for variable names
//! - [`validation`]: custom validators and the mark/remove policy
//! - [`suggest`]: trigger detection and ranked autocomplete

pub mod format;
pub mod suggest;
pub mod validation;

pub use format::{check_format, is_valid_variable_name, variable_pattern, FormatViolation};
pub use suggest::{flatten_variables, Commit, SuggestionState, Suggester, VariablePath, TRIGGER};
pub use validation::{
    InvalidMessage, InvalidPolicy, InvalidReason, ValidationConfig, Validator, Validity,
    VariableValidator,
};
