use std::fmt;

use serde::{Deserialize, Serialize};

use crate::location::Location;

use super::ErrorMsg;

/// One enclosing compile-time invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub location: Option<Location>,
    pub description: String,
}

impl Frame {
    pub fn new(location: Option<Location>, description: impl Into<String>) -> Self {
        Self { location, description: description.into() }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{}: {}", loc, self.description),
            None => write!(f, "{}", self.description),
        }
    }
}

/// Explicit stack of enclosing compile-time invocations, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallStack {
    frames: Vec<Frame>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_frames(frames: Vec<Frame>) -> Self {
        Self { frames }
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames from the innermost invocation outward.
    pub fn most_recent_first(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter().rev()
    }
}

/// Appends at most `limit` "called from here" frames to `msg`, most recent
/// first. An empty stack or a zero limit leaves the message untouched.
pub fn add_call_stack_errors(msg: &mut ErrorMsg, stack: &CallStack, limit: usize) {
    for frame in stack.most_recent_first().take(limit) {
        msg.push_frame(Frame::new(frame.location.clone(), "called from here"));
    }
    if stack.depth() > limit {
        log::debug!(
            "call stack truncated: {} of {} frames shown",
            limit,
            stack.depth()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;

    fn msg() -> ErrorMsg {
        ErrorMsg::with(DiagnosticKind::InvalidConstruct, "boom", "test", None, None)
    }

    fn stack(n: usize) -> CallStack {
        let frames = (1..=n)
            .map(|i| Frame::new(Some(Location::new("s.zig", i, 1)), format!("call {}", i)))
            .collect();
        CallStack::from_frames(frames)
    }

    #[test]
    fn most_recent_frame_comes_first() {
        let mut m = msg();
        add_call_stack_errors(&mut m, &stack(3), 10);
        let lines: Vec<usize> = m
            .call_stack()
            .iter()
            .map(|f| f.location.as_ref().unwrap().line)
            .collect();
        assert_eq!(lines, vec![3, 2, 1]);
        assert!(m.call_stack().iter().all(|f| f.description == "called from here"));
    }

    #[test]
    fn empty_stack_adds_nothing() {
        let mut m = msg();
        add_call_stack_errors(&mut m, &CallStack::new(), 5);
        assert!(m.call_stack().is_empty());
    }

    #[test]
    fn truncates_at_limit() {
        let mut m = msg();
        add_call_stack_errors(&mut m, &stack(20), 4);
        assert_eq!(m.call_stack().len(), 4);
        assert_eq!(m.call_stack()[0].location.as_ref().unwrap().line, 20);
    }
}
