use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AstgenErrorExt, Level};

/// What the lowering does after the first fatal diagnostic in a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop lowering the unit at the first fatal error.
    #[default]
    #[serde(alias = "abortunit")]
    Abort,
    /// Keep lowering independent sibling statements so more diagnostics are
    /// collected. The unit stays poisoned.
    #[serde(alias = "continuesiblings")]
    Continue,
}

impl std::str::FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abort" | "abortunit" => Ok(ErrorPolicy::Abort),
            "continue" | "continuesiblings" => Ok(ErrorPolicy::Continue),
            other => Err(format!("unknown error policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LowerOptions {
    pub error_policy: ErrorPolicy,
    /// Maximum number of "called from here" notes attached to a diagnostic.
    pub call_stack_limit: usize,
    /// Maximum AST nesting depth the lowering will recurse into.
    pub max_depth: usize,
    /// Lower independent top-level declarations on the rayon pool.
    pub parallel: bool,
    pub warn_no_effect: bool,
}

impl Default for LowerOptions {
    fn default() -> Self {
        Self {
            error_policy: ErrorPolicy::Abort,
            call_stack_limit: 10,
            max_depth: 256,
            parallel: true,
            warn_no_effect: true,
        }
    }
}

impl LowerOptions {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|err| ConfigError { message: err.to_string() })
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid lowering options: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

impl AstgenErrorExt for ConfigError {
    fn level(&self) -> Level {
        Level::Error
    }
    fn message(&self) -> String {
        self.to_string()
    }
    fn issuer(&self) -> String {
        "astgen-config".to_string()
    }
    fn span(&self) -> Option<crate::location::Span> {
        None
    }
    fn location(&self) -> Option<crate::location::Location> {
        None
    }
}
