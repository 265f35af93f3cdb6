use serde::{Deserialize, Serialize};

use crate::location::Location;
use crate::scope::{ScopeId, ScopeKind, ScopeTree};

/// Display name of an unnamed container or error set. Used for diagnostics
/// only, never as a type identity key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnonTypeName {
    /// `namespace[.fn].kind:line:col`
    pub full: String,
    /// `kind:line:col`
    pub bare: String,
}

/// Names an anonymous entity from its enclosing namespace and function, its
/// kind tag and where it was written. Without a location the node id given
/// as `fallback` keeps distinct declarations apart.
pub fn name_anonymous_entity(
    scopes: &ScopeTree,
    scope: ScopeId,
    kind: &str,
    location: Option<&Location>,
    fallback: usize,
) -> AnonTypeName {
    let bare = match location {
        Some(loc) => format!("{}:{}:{}", kind, loc.line, loc.column),
        None => format!("{}#{}", kind, fallback),
    };

    let mut prefix = scopes.namespace(scope).unwrap_or("root").to_string();
    if let Some(fn_scope) = scopes.enclosing_fn(scope) {
        if let ScopeKind::FnDef { name } = &scopes.scope(fn_scope).kind {
            prefix.push('.');
            prefix.push_str(name);
        }
    }

    AnonTypeName { full: format!("{}.{}", prefix, bare), bare }
}
