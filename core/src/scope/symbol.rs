use serde::{Deserialize, Serialize};

use crate::ir::InstId;
use crate::location::Location;

use super::ScopeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(pub usize);

impl VarId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for VarId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Whether a variable's value is known at compile time.
///
/// `Pending` points at the instruction whose compile-time-known-ness decides
/// it; analysis resolves it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComptimeStatus {
    Known(bool),
    Pending(InstId),
}

impl ComptimeStatus {
    pub fn is_known_comptime(&self) -> bool {
        matches!(self, ComptimeStatus::Known(true))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub id: VarId,
    /// `None` for compiler-synthesized bindings.
    pub name: Option<String>,
    pub scope: ScopeId,
    pub location: Option<Location>,
    pub src_is_const: bool,
    /// May be true for a source `var` the lowering treats as a constant.
    pub gen_is_const: bool,
    pub is_shadowable: bool,
    pub comptime: ComptimeStatus,
    pub skip_name_check: bool,
}

/// Everything needed to register one local binding.
#[derive(Debug, Clone)]
pub struct BindingRequest {
    pub name: Option<String>,
    pub location: Option<Location>,
    pub src_is_const: bool,
    pub gen_is_const: bool,
    pub is_shadowable: bool,
    pub comptime: ComptimeStatus,
    pub skip_name_check: bool,
}

impl BindingRequest {
    /// A user-written binding: checked for collisions, not shadowable.
    pub fn named(name: impl Into<String>, location: Option<Location>) -> Self {
        Self {
            name: Some(name.into()),
            location,
            src_is_const: true,
            gen_is_const: true,
            is_shadowable: false,
            comptime: ComptimeStatus::Known(false),
            skip_name_check: false,
        }
    }

    /// A binding the lowering invents (loop counters, captures). Never checked.
    pub fn synthesized(name: Option<String>, location: Option<Location>) -> Self {
        Self {
            name,
            location,
            src_is_const: false,
            gen_is_const: false,
            is_shadowable: true,
            comptime: ComptimeStatus::Known(false),
            skip_name_check: true,
        }
    }

    pub fn constness(mut self, src_is_const: bool, gen_is_const: bool) -> Self {
        self.src_is_const = src_is_const;
        self.gen_is_const = gen_is_const;
        self
    }

    pub fn shadowable(mut self, is_shadowable: bool) -> Self {
        self.is_shadowable = is_shadowable;
        self
    }

    pub fn comptime(mut self, status: ComptimeStatus) -> Self {
        self.comptime = status;
        self
    }
}
