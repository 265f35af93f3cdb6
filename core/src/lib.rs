pub mod ast;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod ir;
pub mod location;
pub mod scope;

pub use ast::{AstNode, AstNodeKind, ast_from_json};
pub use config::{ConfigError, ErrorPolicy, LowerOptions};
pub use diagnostics::{CallStack, DiagnosticKind, ErrorMsg, Frame, add_call_stack_errors};
pub use error::{AstgenErrorExt, Level};
pub use ir::{
    GeneratedUnit, Generator, InstKind, InstStream, ModuleOutput, ResultLoc, UnitKind, generate_module,
    has_side_effects, should_inline,
};
pub use location::{Location, Span};
pub use scope::{BindingRequest, ComptimeStatus, DeclTable, ScopeId, ScopeKind, ScopeTree};

pub fn generate_error_report<E: AstgenErrorExt + ?Sized>(error: &E) -> String {
    let level = error.level();
    let location = match error.location() {
        Some(loc) => loc.to_string(),
        None => "unknown location".to_string(),
    };
    let message = error.message();

    format!("ASTGEN | {} | {} | {}", level, location, message)
}

/// Parses a JSON syntax tree and lowers every declaration in it.
pub fn lower_json(source: &str, options: &LowerOptions) -> Result<ModuleOutput, serde_json::Error> {
    let root = ast_from_json(source)?;
    Ok(generate_module(&root, options))
}
