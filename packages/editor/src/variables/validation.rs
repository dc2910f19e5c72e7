//! Variable validation policy
//!
//! Validity is never stored on the chip. It is recomputed from the current
//! [`ValidationConfig`] every time validation runs; the result only shows up
//! as the chip's `invalid` styling attribute or as its removal.

use super::format::{check_format, FormatViolation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Custom predicate over variable names
pub type Validator = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// What happens to a chip that fails validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidPolicy {
    /// Keep the chip and flag it as invalid
    #[default]
    Mark,
    /// Delete the chip from the tree
    Remove,
}

/// Toast text shown when a chip is rejected
#[derive(Clone)]
pub enum InvalidMessage {
    Static(String),
    Dynamic(Arc<dyn Fn(&str) -> String + Send + Sync>),
}

impl InvalidMessage {
    pub fn render(&self, name: &str) -> String {
        match self {
            InvalidMessage::Static(message) => message.clone(),
            InvalidMessage::Dynamic(build) => build(name),
        }
    }
}

impl fmt::Debug for InvalidMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidMessage::Static(message) => f.debug_tuple("Static").field(message).finish(),
            InvalidMessage::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

#[derive(Clone, Default)]
pub struct ValidationConfig {
    pub validate: Option<Validator>,
    pub on_invalid: InvalidPolicy,
    pub invalid_message: Option<InvalidMessage>,
    /// Skip the built-in syntax check and rely on `validate` alone
    pub override_format_validation: bool,
}

impl ValidationConfig {
    pub fn with_validator(mut self, validate: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.validate = Some(Arc::new(validate));
        self
    }

    pub fn with_policy(mut self, on_invalid: InvalidPolicy) -> Self {
        self.on_invalid = on_invalid;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.invalid_message = Some(InvalidMessage::Static(message.into()));
        self
    }

    pub fn with_message_fn(mut self, build: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.invalid_message = Some(InvalidMessage::Dynamic(Arc::new(build)));
        self
    }

    pub fn override_format_validation(mut self, enabled: bool) -> Self {
        self.override_format_validation = enabled;
        self
    }
}

impl fmt::Debug for ValidationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationConfig")
            .field("validate", &self.validate.as_ref().map(|_| ".."))
            .field("on_invalid", &self.on_invalid)
            .field("invalid_message", &self.invalid_message)
            .field("override_format_validation", &self.override_format_validation)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    Format(FormatViolation),
    Rejected,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidReason::Format(violation) => write!(f, "{}", violation),
            InvalidReason::Rejected => f.write_str("rejected by validator"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validity {
    Valid,
    Invalid(InvalidReason),
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validity::Valid)
    }
}

#[derive(Debug, Clone, Default)]
pub struct VariableValidator {
    config: ValidationConfig,
}

impl VariableValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn policy(&self) -> InvalidPolicy {
        self.config.on_invalid
    }

    pub fn check(&self, name: &str) -> Validity {
        if !self.config.override_format_validation {
            if let Err(violation) = check_format(name) {
                return Validity::Invalid(InvalidReason::Format(violation));
            }
        }
        match &self.config.validate {
            Some(validate) if !validate(name) => Validity::Invalid(InvalidReason::Rejected),
            _ => Validity::Valid,
        }
    }

    /// Toast text for a rejected name, if one is configured
    pub fn message(&self, name: &str) -> Option<String> {
        self.config.invalid_message.as_ref().map(|message| message.render(name))
    }
}
