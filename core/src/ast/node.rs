use serde::{Deserialize, Serialize};

use crate::location;

use super::kind::AstNodeKind;

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct AstNode {
    #[serde(skip, default = "AstNode::create_id")]
    id: usize,
    pub kind: AstNodeKind,
    #[serde(default)]
    pub location: Option<location::Location>,
    #[serde(default)]
    pub span: Option<location::Span>,
}

impl AstNode {
    fn create_id() -> usize {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static COUNTER: AtomicUsize = AtomicUsize::new(1);
        COUNTER.fetch_add(1, Ordering::Relaxed)
    }

    pub fn new(
        node_type: AstNodeKind,
        location: Option<location::Location>,
        span: Option<location::Span>,
    ) -> Self {
        AstNode {
            id: Self::create_id(),
            kind: node_type,
            location,
            span,
        }
    }

    pub fn with_location(mut self, location: crate::location::Location) -> Self {
        self.location = Some(location);
        self
    }
    pub fn with_span(mut self, span: crate::location::Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn get_id(&self) -> usize {
        self.id
    }
    pub fn get_kind(&self) -> &AstNodeKind {
        &self.kind
    }
    pub fn get_location(&self) -> Option<&crate::location::Location> {
        self.location.as_ref()
    }
    pub fn get_span(&self) -> Option<&crate::location::Span> {
        self.span.as_ref()
    }

    /// Name of a declaration node, if it has one.
    pub fn decl_name(&self) -> Option<&str> {
        match &self.kind {
            AstNodeKind::FnDecl { name, .. } | AstNodeKind::VarDecl { name, .. } => Some(name),
            AstNodeKind::TestDecl { name, .. } => name.as_deref(),
            AstNodeKind::Root { name, .. } => Some(name),
            _ => None,
        }
    }
}

use std::fmt;

impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)?;
        if let Some(loc) = &self.location {
            write!(f, " @ {}", loc)?;
        }
        Ok(())
    }
}

impl fmt::Debug for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AstNode")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("location", &self.location)
            .finish()
    }
}
