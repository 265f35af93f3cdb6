//! Lowering helpers for statement nodes.
//!
//! Blocks, local declarations, assignments and `defer`. A statement returns
//! the scope subsequent statements of the same block live in, which changes
//! after a `defer`.
//!
//! See also: `ir::lower::lower_expr` for expression lowering helpers.

use crate::ast::{AstNode, AstNodeKind, BinaryOperator};
use crate::config::ErrorPolicy;
use crate::diagnostics::DiagnosticKind;
use crate::ir::inst::InstKind;
use crate::ir::result_loc::{ResultLoc, no_result_loc};
use crate::ir::side_effects::has_side_effects;
use crate::scope::{BindingRequest, ComptimeStatus, ScopeId, ScopeKind};

use super::lower_expr::{lower_expr, lower_lval};
use super::lowering_context::{BreakSink, ExitPath, Lowered, LoweringContext, Poisoned};

/// Lowers `{ ... }` and `label: { ... }`.
pub(crate) fn lower_block<'a>(
    cx: &mut LoweringContext<'a>,
    node: &'a AstNode,
    scope: ScopeId,
    rl: ResultLoc,
) -> Lowered {
    let AstNodeKind::Block { label, statements } = &node.kind else {
        return lower_expr(cx, node, scope, rl);
    };
    let loc = node.location.as_ref();

    let Some(label) = label else {
        let block_scope = cx.scopes.push_child(scope, ScopeKind::Block { label: None, end_block: None });
        let last = lower_statements(cx, statements, block_scope)?;
        if !cx.stream.is_terminated() {
            cx.run_defers(last, Some(block_scope), ExitPath::Normal)?;
        }
        if let Some(end) = cx.stream.instructions().last().filter(|_| cx.stream.is_terminated()) {
            return Ok(end.id);
        }
        let v = cx.const_void(scope, loc);
        return Ok(cx.finish_result(v, rl, scope, loc));
    };

    let rl = cx.settle_result_loc(rl, scope, loc);
    let end_block = cx.stream.new_block(format!("{}.end", label));
    let block_scope = cx.scopes.push_child(
        scope,
        ScopeKind::Block { label: Some(label.clone()), end_block: Some(end_block) },
    );
    cx.break_sinks.insert(block_scope, BreakSink { result_loc: rl, incoming: Vec::new() });

    let last = lower_statements(cx, statements, block_scope)?;
    if !cx.stream.is_terminated() {
        cx.run_defers(last, Some(block_scope), ExitPath::Normal)?;
        if !cx.stream.is_terminated() {
            let void = cx.const_void(scope, loc);
            let from = cx.stream.current_block();
            if let Some(sink) = cx.break_sinks.get_mut(&block_scope) {
                sink.incoming.push((from, void));
            }
            cx.emit_gen(InstKind::Br { target: end_block }, scope, loc);
        }
    }

    let incoming = cx.break_sinks.remove(&block_scope).map(|s| s.incoming).unwrap_or_default();
    cx.stream.set_current_block(end_block);
    if incoming.is_empty() {
        return Ok(cx.emit_gen(InstKind::Unreachable, scope, loc));
    }
    Ok(cx.emit_gen(InstKind::Phi { incoming }, scope, loc))
}

/// Lowers a statement list. Returns the scope after the last statement.
fn lower_statements<'a>(
    cx: &mut LoweringContext<'a>,
    statements: &'a [AstNode],
    block_scope: ScopeId,
) -> Lowered<ScopeId> {
    let mut current = block_scope;
    let mut failed = false;
    for stmt in statements {
        if cx.stream.is_terminated() {
            cx.warn_at(DiagnosticKind::UnreachableCode, "unreachable code", stmt);
            break;
        }
        match lower_statement(cx, stmt, current) {
            Ok(next) => current = next,
            Err(p) => match cx.options.error_policy {
                ErrorPolicy::Abort => return Err(p),
                ErrorPolicy::Continue => failed = true,
            },
        }
    }
    if failed {
        return Err(Poisoned);
    }
    Ok(current)
}

/// Lowers one statement in `scope` and returns the scope that follows it.
pub(crate) fn lower_statement<'a>(
    cx: &mut LoweringContext<'a>,
    node: &'a AstNode,
    scope: ScopeId,
) -> Lowered<ScopeId> {
    cx.descend(node)?;
    let result = lower_statement_inner(cx, node, scope);
    cx.ascend();
    result
}

fn lower_statement_inner<'a>(
    cx: &mut LoweringContext<'a>,
    node: &'a AstNode,
    scope: ScopeId,
) -> Lowered<ScopeId> {
    let loc = node.location.as_ref();
    match &node.kind {
        AstNodeKind::VarDecl { .. } => {
            lower_local_var(cx, node, scope)?;
            Ok(scope)
        }
        AstNodeKind::Defer { kind, expr } => {
            let defer_scope = cx.scopes.push_child(scope, ScopeKind::Defer { kind: *kind });
            cx.defers.insert(defer_scope, &**expr);
            Ok(defer_scope)
        }
        AstNodeKind::Assign { .. } | AstNodeKind::AssignOp { .. } => {
            lower_assign(cx, node, scope)?;
            Ok(scope)
        }
        kind if kind.is_expression_statement() => {
            let start = cx.stream.len();
            let value = lower_expr(cx, node, scope, ResultLoc::Discard)?;
            if cx.stream.is_terminated() {
                return Ok(scope);
            }
            // Branching forms end in a pure phi; any effect inside counts.
            let effectful = cx.stream.instructions()[start..].iter().any(|i| has_side_effects(&i.kind));
            if cx.options.warn_no_effect && !effectful {
                cx.warn_at(DiagnosticKind::NoEffect, "statement has no effect", node);
            }
            cx.emit_gen(InstKind::CheckStatementIsVoid { value }, scope, loc);
            Ok(scope)
        }
        _ => {
            lower_expr(cx, node, scope, ResultLoc::Discard)?;
            Ok(scope)
        }
    }
}

/// `var x: T = init;` / `const x = init;` inside a body.
pub(crate) fn lower_local_var<'a>(
    cx: &mut LoweringContext<'a>,
    node: &'a AstNode,
    scope: ScopeId,
) -> Lowered<()> {
    let AstNodeKind::VarDecl { name, is_const, is_comptime, type_expr, init } = &node.kind else {
        return Ok(());
    };
    let loc = node.location.as_ref();
    let is_comptime_var = *is_comptime || cx.scopes.is_forced_comptime(scope);

    let type_inst = match type_expr {
        Some(t) => {
            let type_scope = cx.scopes.push_child(scope, ScopeKind::Comptime);
            match lower_expr(cx, t, type_scope, no_result_loc()) {
                Ok(v) => Some(v),
                Err(p) => return Err(declare_failed(cx, node, name, scope, p)),
            }
        }
        None => None,
    };

    let Some(init) = init else {
        let p = cx.fail_at(
            DiagnosticKind::InvalidConstruct,
            format!("variables must be initialized: '{}'", name),
            "lower_local_var",
            node,
        );
        return Err(declare_failed(cx, node, name, scope, p));
    };

    let alloca = cx.emit(
        InstKind::Alloca { name: Some(name.clone()), type_inst, is_comptime: is_comptime_var },
        scope,
        loc,
    );
    cx.set_name_hint(init, name);
    let init_scope = if *is_comptime && !cx.scopes.is_forced_comptime(scope) {
        cx.scopes.push_child(scope, ScopeKind::Comptime)
    } else {
        scope
    };
    let init_value = match lower_expr(cx, init, init_scope, ResultLoc::existing(alloca)) {
        Ok(v) => v,
        Err(p) => return Err(declare_failed(cx, node, name, scope, p)),
    };

    let comptime = if is_comptime_var {
        ComptimeStatus::Known(true)
    } else {
        ComptimeStatus::Pending(init_value)
    };
    let req = BindingRequest::named(name.clone(), node.location.clone())
        .constness(*is_const, *is_const || is_comptime_var)
        .comptime(comptime);
    let var = match cx.scopes.create_local_var(scope, req, cx.decls) {
        Ok(var) => var,
        Err(msg) => return Err(cx.fail(msg)),
    };
    cx.emit(InstKind::DeclVar { var, ptr: alloca }, scope, loc);
    Ok(())
}

/// Binds `name` after its declaration failed so later statements that use it
/// fail quietly instead of reporting it as undeclared. A name that clashes
/// with a visible binding is left alone; uses keep resolving to that one.
fn declare_failed(
    cx: &mut LoweringContext<'_>,
    node: &AstNode,
    name: &str,
    scope: ScopeId,
    poisoned: Poisoned,
) -> Poisoned {
    let req = BindingRequest::named(name, node.location.clone());
    if let Ok(var) = cx.scopes.create_local_var(scope, req, cx.decls) {
        cx.failed_vars.insert(var);
    }
    poisoned
}

/// `a = b`, `a += b`, and the `_ = e` discard.
pub(crate) fn lower_assign<'a>(
    cx: &mut LoweringContext<'a>,
    node: &'a AstNode,
    scope: ScopeId,
) -> Lowered<()> {
    let loc = node.location.as_ref();
    match &node.kind {
        AstNodeKind::Assign { target, value } => {
            if matches!(&target.kind, AstNodeKind::Symbol { name } if name == "_") {
                lower_expr(cx, value, scope, ResultLoc::Discard)?;
                return Ok(());
            }
            if !target.kind.is_lvalue() {
                return Err(cx.fail_at(
                    DiagnosticKind::InvalidConstruct,
                    "invalid left-hand side to assignment",
                    "lower_assign",
                    target,
                ));
            }
            let ptr = lower_lval(cx, target, scope)?;
            lower_expr(cx, value, scope, ResultLoc::existing(ptr))?;
            Ok(())
        }
        AstNodeKind::AssignOp { op, target, value } => {
            if !target.kind.is_lvalue() || is_logical(*op) {
                return Err(cx.fail_at(
                    DiagnosticKind::InvalidConstruct,
                    "invalid left-hand side to assignment",
                    "lower_assign",
                    target,
                ));
            }
            let ptr = lower_lval(cx, target, scope)?;
            let current = cx.emit(InstKind::LoadPtr { ptr }, scope, loc);
            let rhs = lower_expr(cx, value, scope, no_result_loc())?;
            let combined = cx.emit(InstKind::BinOp { op: *op, lhs: current, rhs }, scope, loc);
            cx.emit(InstKind::StorePtr { ptr, value: combined }, scope, loc);
            Ok(())
        }
        _ => Ok(()),
    }
}

fn is_logical(op: BinaryOperator) -> bool {
    op.is_short_circuit() || op == BinaryOperator::Orelse
}
