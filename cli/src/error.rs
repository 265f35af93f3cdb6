use std::fmt;
use std::path::Path;

use astgen_core::error::{AstgenErrorExt, Level};
use astgen_core::location::{Location, Span};

/// Failure to load an input or a configuration file.
#[derive(Debug, Clone)]
pub struct CliError {
    message: String,
    path: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        CliError { message: message.into(), path: None }
    }

    pub fn at(path: &Path, message: impl Into<String>) -> Self {
        CliError { message: message.into(), path: Some(path.display().to_string()) }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {}", path, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for CliError {}

impl AstgenErrorExt for CliError {
    fn level(&self) -> Level {
        Level::Error
    }
    fn message(&self) -> String {
        self.message.clone()
    }
    fn issuer(&self) -> String {
        "astgen-cli".to_string()
    }
    fn span(&self) -> Option<Span> {
        None
    }
    fn location(&self) -> Option<Location> {
        self.path.as_ref().map(|p| Location::new(p.clone(), 0, 0))
    }
}
