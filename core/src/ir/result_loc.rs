use super::inst::InstId;

/// Where the value of the expression being lowered should end up.
///
/// Built per lowering call and only passed down. Expressions that can write
/// their value in place (initializers, calls, branching expressions) consume
/// `Existing`/`Return` directly; everything else computes a value and the
/// caller stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultLoc {
    /// No destination chosen yet; the value is just returned.
    #[default]
    None,
    /// The value is unused (`e;` or `_ = e;`).
    Discard,
    /// The value becomes the function's return value.
    Return,
    /// Write into this pointer.
    Existing { ptr: InstId },
    /// Allocate fresh storage at the point the value is produced.
    Alloc,
}

/// Neutral starting point for expression lowering.
pub fn no_result_loc() -> ResultLoc {
    ResultLoc::None
}

impl ResultLoc {
    pub fn existing(ptr: InstId) -> Self {
        ResultLoc::Existing { ptr }
    }

    pub fn is_discard(&self) -> bool {
        matches!(self, ResultLoc::Discard)
    }

    /// Pointer the value must be written through, when already known.
    pub fn ptr(&self) -> Option<InstId> {
        match self {
            ResultLoc::Existing { ptr } => Some(*ptr),
            _ => None,
        }
    }

    /// Whether the destination is real storage the expression can write into.
    pub fn wants_ptr(&self) -> bool {
        matches!(self, ResultLoc::Existing { .. } | ResultLoc::Return | ResultLoc::Alloc)
    }
}
