//! file: core/src/ir/lower/lowering_context.rs
//! description: per-unit state shared by the lowering routines.
//!
//! `LoweringContext` owns the scope arena and the instruction stream of the
//! generation unit being built, plus the side tables the statement and
//! control-flow lowering need (pending defers, break sinks). It borrows the
//! declaration table and options, which are shared read-only between units.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ast::{AstNode, DeferKind};
use crate::config::LowerOptions;
use crate::diagnostics::{CallStack, DiagnosticKind, ErrorMsg, Frame, add_call_stack_errors};
use crate::ir::inst::{BlockId, InstId, InstKind};
use crate::ir::result_loc::ResultLoc;
use crate::ir::stream::InstStream;
use crate::ir::value::ConstValue;
use crate::location::Location;
use crate::scope::{DeclTable, ScopeId, ScopeKind, ScopeTree, VarId};

use super::should_inline;

/// Failure sentinel. The diagnostic has already been stored on the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poisoned;

pub type Lowered<T = InstId> = Result<T, Poisoned>;

/// Values flowing into the end of a labeled block or loop.
#[derive(Debug, Clone)]
pub(crate) struct BreakSink {
    pub result_loc: ResultLoc,
    pub incoming: Vec<(BlockId, InstId)>,
}

/// Which deferred expressions an exit runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExitPath {
    /// Normal exits run `defer` only.
    Normal,
    /// Error exits run `defer` and `errdefer`.
    Error,
}

pub struct LoweringContext<'a> {
    pub(crate) decls: &'a DeclTable,
    pub(crate) options: &'a LowerOptions,
    pub(crate) scopes: ScopeTree,
    pub(crate) stream: InstStream,
    pub(crate) call_stack: CallStack,
    /// Scope the current stream was started in. Jumps may not leave it.
    pub(crate) stream_root: ScopeId,
    pub(crate) defers: FxHashMap<ScopeId, &'a AstNode>,
    pub(crate) break_sinks: FxHashMap<ScopeId, BreakSink>,
    /// Locals whose declaration failed. Uses resolve without a new diagnostic.
    pub(crate) failed_vars: FxHashSet<VarId>,
    /// Declaration name for a container that directly initializes it.
    name_hint: Option<(usize, String)>,
    depth: usize,
}

impl<'a> LoweringContext<'a> {
    pub fn new(
        decls: &'a DeclTable,
        options: &'a LowerOptions,
        scopes: ScopeTree,
        stream: InstStream,
        root: ScopeId,
    ) -> Self {
        LoweringContext {
            decls,
            options,
            scopes,
            stream,
            call_stack: CallStack::new(),
            stream_root: root,
            defers: FxHashMap::default(),
            break_sinks: FxHashMap::default(),
            failed_vars: FxHashSet::default(),
            name_hint: None,
            depth: 0,
        }
    }

    pub fn with_call_stack(mut self, stack: CallStack) -> Self {
        self.call_stack = stack;
        self
    }

    pub fn into_parts(self) -> (InstStream, ScopeTree) {
        (self.stream, self.scopes)
    }

    // ------- Emission -------

    pub(crate) fn emit(&mut self, kind: InstKind, scope: ScopeId, loc: Option<&Location>) -> InstId {
        self.emit_with(kind, scope, loc, false, false)
    }

    /// Emits an instruction the user did not write.
    pub(crate) fn emit_gen(&mut self, kind: InstKind, scope: ScopeId, loc: Option<&Location>) -> InstId {
        self.emit_with(kind, scope, loc, false, true)
    }

    /// Emits with compile-time evaluation forced on top of the scope rules,
    /// as for `inline` loops and `comptime` calls.
    pub(crate) fn emit_with(
        &mut self,
        kind: InstKind,
        scope: ScopeId,
        loc: Option<&Location>,
        force_comptime: bool,
        is_gen: bool,
    ) -> InstId {
        let is_comptime = force_comptime || should_inline(&self.stream, &self.scopes, scope);
        self.stream.append(kind, scope, loc.cloned(), is_comptime, is_gen)
    }

    pub(crate) fn const_void(&mut self, scope: ScopeId, loc: Option<&Location>) -> InstId {
        self.emit_gen(InstKind::Const(ConstValue::Void), scope, loc)
    }

    // ------- Diagnostics -------

    /// Poisons the stream with `msg` and returns the failure sentinel.
    pub(crate) fn fail(&mut self, mut msg: ErrorMsg) -> Poisoned {
        if msg.is_fatal() {
            add_call_stack_errors(&mut msg, &self.call_stack, self.options.call_stack_limit);
        }
        self.stream.invalidate(msg);
        Poisoned
    }

    pub(crate) fn fail_at(
        &mut self,
        kind: DiagnosticKind,
        message: impl Into<String>,
        issuer: &str,
        node: &AstNode,
    ) -> Poisoned {
        let msg = ErrorMsg::with(kind, message, issuer, node.location.clone(), node.span.clone());
        self.fail(msg)
    }

    pub(crate) fn warn_at(&mut self, kind: DiagnosticKind, message: impl Into<String>, node: &AstNode) {
        let msg = ErrorMsg::with(kind, message, "lower_statement", node.location.clone(), node.span.clone());
        self.stream.add_warning(msg);
    }

    /// Recursion guard; pair every successful call with `ascend`.
    pub(crate) fn descend(&mut self, node: &AstNode) -> Lowered<()> {
        if self.depth >= self.options.max_depth {
            let limit = self.options.max_depth;
            return Err(self.fail_at(
                DiagnosticKind::RecursionLimitExceeded,
                format!("expression nesting exceeds the limit of {}", limit),
                "lower_expr",
                node,
            ));
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub(crate) fn push_frame(&mut self, loc: Option<&Location>, description: impl Into<String>) {
        self.call_stack.push(Frame::new(loc.cloned(), description));
    }

    pub(crate) fn pop_frame(&mut self) {
        self.call_stack.pop();
    }

    // ------- Names -------

    pub(crate) fn set_name_hint(&mut self, node: &AstNode, name: &str) {
        self.name_hint = Some((node.get_id(), name.to_string()));
    }

    pub(crate) fn take_name_hint(&mut self, node: &AstNode) -> Option<String> {
        match &self.name_hint {
            Some((id, _)) if *id == node.get_id() => self.name_hint.take().map(|(_, n)| n),
            _ => None,
        }
    }

    // ------- Result locations -------

    /// Pointer an in-place expression should write through, allocating one
    /// when the caller asked for fresh storage.
    pub(crate) fn resolve_result_ptr(
        &mut self,
        rl: ResultLoc,
        scope: ScopeId,
        loc: Option<&Location>,
    ) -> Option<InstId> {
        match rl {
            ResultLoc::Existing { ptr } => Some(ptr),
            ResultLoc::Return => Some(self.emit_gen(InstKind::ReturnPtr, scope, loc)),
            ResultLoc::Alloc => Some(self.emit_gen(
                InstKind::Alloca { name: None, type_inst: None, is_comptime: false },
                scope,
                loc,
            )),
            ResultLoc::None | ResultLoc::Discard => None,
        }
    }

    /// Turns `Alloc` into `Existing` so every branch of a branching
    /// expression writes into the same storage.
    pub(crate) fn settle_result_loc(
        &mut self,
        rl: ResultLoc,
        scope: ScopeId,
        loc: Option<&Location>,
    ) -> ResultLoc {
        match rl {
            ResultLoc::Alloc => match self.resolve_result_ptr(rl, scope, loc) {
                Some(ptr) => ResultLoc::Existing { ptr },
                None => rl,
            },
            other => other,
        }
    }

    /// Delivers an already computed value to its result location.
    pub(crate) fn finish_result(
        &mut self,
        value: InstId,
        rl: ResultLoc,
        scope: ScopeId,
        loc: Option<&Location>,
    ) -> InstId {
        match rl {
            ResultLoc::Existing { ptr } => {
                self.emit_gen(InstKind::StorePtr { ptr, value }, scope, loc);
                value
            }
            ResultLoc::Alloc => {
                if let Some(ptr) = self.resolve_result_ptr(rl, scope, loc) {
                    self.emit_gen(InstKind::StorePtr { ptr, value }, scope, loc);
                }
                value
            }
            ResultLoc::None | ResultLoc::Discard | ResultLoc::Return => value,
        }
    }

    // ------- Defers -------

    /// Lowers the deferred expressions passed when leaving `from` for
    /// `target` (`None` leaves the function), innermost first.
    pub(crate) fn run_defers(
        &mut self,
        from: ScopeId,
        target: Option<ScopeId>,
        path: ExitPath,
    ) -> Lowered<()> {
        for (defer_scope, kind) in self.scopes.defers_until(from, target) {
            if kind == DeferKind::Error && path == ExitPath::Normal {
                continue;
            }
            let Some(expr) = self.defers.get(&defer_scope).copied() else {
                continue;
            };
            let parent = self.scopes.scope(defer_scope).parent.unwrap_or(defer_scope);
            let expr_scope = self.scopes.push_child(parent, ScopeKind::DeferExpr);
            super::lower_expr::lower_expr(self, expr, expr_scope, ResultLoc::Discard)?;
            if self.stream.is_terminated() {
                break;
            }
        }
        Ok(())
    }

    /// Whether the walk from `scope` to `target` leaves the current stream.
    pub(crate) fn leaves_stream(&self, scope: ScopeId, target: Option<ScopeId>) -> bool {
        for s in self.scopes.chain(scope) {
            if Some(s.id) == target {
                return false;
            }
            if target.is_none() && matches!(s.kind, ScopeKind::FnDef { .. }) {
                return false;
            }
            if s.id == self.stream_root {
                return true;
            }
        }
        false
    }
}
