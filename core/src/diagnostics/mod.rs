//! Diagnostics produced while lowering. Fatal kinds poison the unit that
//! reports them; warnings are only recorded.

pub mod call_stack;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AstgenErrorExt, Level};
use crate::location::{Location, Span};

pub use call_stack::{CallStack, Frame, add_call_stack_errors};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    NameCollision,
    UnresolvedName,
    InvalidConstruct,
    ForcedComptimeViolation,
    RecursionLimitExceeded,
    NoEffect,
    UnreachableCode,
    /// Subordinate message attached to another diagnostic.
    Note,
}

impl DiagnosticKind {
    pub fn default_level(&self) -> Level {
        match self {
            DiagnosticKind::NoEffect | DiagnosticKind::UnreachableCode => Level::Warning,
            DiagnosticKind::Note => Level::Info,
            DiagnosticKind::RecursionLimitExceeded => Level::Critical,
            _ => Level::Error,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.default_level().is_fatal()
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiagnosticKind::NameCollision => "name collision",
            DiagnosticKind::UnresolvedName => "unresolved name",
            DiagnosticKind::InvalidConstruct => "invalid construct",
            DiagnosticKind::ForcedComptimeViolation => "comptime violation",
            DiagnosticKind::RecursionLimitExceeded => "recursion limit",
            DiagnosticKind::NoEffect => "no effect",
            DiagnosticKind::UnreachableCode => "unreachable code",
            DiagnosticKind::Note => "note",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMsg {
    kind: DiagnosticKind,
    level: Level,
    message: String,
    issuer: String,
    location: Option<Location>,
    span: Option<Span>,
    #[serde(default)]
    notes: Vec<ErrorMsg>,
    #[serde(default)]
    call_stack: Vec<Frame>,
}

impl ErrorMsg {
    pub fn with(
        kind: DiagnosticKind,
        message: impl Into<String>,
        issuer: impl Into<String>,
        location: Option<Location>,
        span: Option<Span>,
    ) -> Self {
        ErrorMsg {
            kind,
            level: kind.default_level(),
            message: message.into(),
            issuer: issuer.into(),
            location,
            span,
            notes: Vec::new(),
            call_stack: Vec::new(),
        }
    }

    pub fn note(message: impl Into<String>, location: Option<Location>) -> Self {
        Self::with(DiagnosticKind::Note, message, "note", location, None)
    }

    pub fn with_note(mut self, note: ErrorMsg) -> Self {
        self.notes.push(note);
        self
    }

    pub fn add_note(&mut self, note: ErrorMsg) {
        self.notes.push(note);
    }

    pub(crate) fn push_frame(&mut self, frame: Frame) {
        self.call_stack.push(frame);
    }

    pub fn kind(&self) -> DiagnosticKind {
        self.kind
    }
    pub fn notes(&self) -> &[ErrorMsg] {
        &self.notes
    }
    pub fn call_stack(&self) -> &[Frame] {
        &self.call_stack
    }
    pub fn is_fatal(&self) -> bool {
        self.level.is_fatal()
    }

    /// Message plus every note and frame, one per line.
    pub fn render(&self) -> String {
        let mut out = self.to_string();
        for note in &self.notes {
            out.push_str("\n  note: ");
            out.push_str(&note.to_string());
        }
        for frame in &self.call_stack {
            out.push_str("\n  ");
            out.push_str(&frame.to_string());
        }
        out
    }
}

impl fmt::Display for ErrorMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(loc) = &self.location {
            write!(f, "{}: {}", loc, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ErrorMsg {}

impl AstgenErrorExt for ErrorMsg {
    fn level(&self) -> Level {
        self.level
    }

    fn message(&self) -> String {
        self.message.clone()
    }

    fn issuer(&self) -> String {
        self.issuer.clone()
    }

    fn span(&self) -> Option<Span> {
        self.span.clone()
    }

    fn location(&self) -> Option<Location> {
        self.location.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_are_not_fatal() {
        let w = ErrorMsg::with(DiagnosticKind::NoEffect, "statement has no effect", "t", None, None);
        assert!(!w.is_fatal());
        let e = ErrorMsg::with(DiagnosticKind::UnresolvedName, "use of undeclared identifier 'x'", "t", None, None);
        assert!(e.is_fatal());
    }

    #[test]
    fn render_includes_notes() {
        let e = ErrorMsg::with(
            DiagnosticKind::NameCollision,
            "redeclaration of variable 'x'",
            "t",
            Some(Location::new("a.zig", 2, 9)),
            None,
        )
        .with_note(ErrorMsg::note("previous declaration here", Some(Location::new("a.zig", 1, 9))));
        let text = e.render();
        assert!(text.contains("a.zig:2:9: redeclaration of variable 'x'"));
        assert!(text.contains("note: a.zig:1:9: previous declaration here"));
    }
}
