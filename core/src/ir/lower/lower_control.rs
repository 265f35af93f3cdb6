//! Lowering of branching and jumping constructs.
//!
//! Branching expressions settle their result location once, hand it to
//! every branch, and join the branch values with a `phi` in the merge block.
//! Jumps run the deferred expressions of every scope they leave.

use crate::ast::{AstNode, AstNodeKind, BinaryOperator, DeferKind};
use crate::diagnostics::DiagnosticKind;
use crate::ir::inst::{BlockId, InstId, InstKind};
use crate::ir::result_loc::{ResultLoc, no_result_loc};
use crate::ir::stream::InstStream;
use crate::ir::value::ConstValue;
use crate::scope::{BindingRequest, ComptimeStatus, JumpTarget, ScopeId, ScopeKind};

use super::lower_expr::lower_expr;
use super::lowering_context::{BreakSink, ExitPath, Lowered, LoweringContext, Poisoned};

/// Binds a capture (`|x|`) to `value` in a fresh child of `parent`.
fn bind_payload(
    cx: &mut LoweringContext<'_>,
    parent: ScopeId,
    name: &str,
    value: InstId,
    node: &AstNode,
) -> Lowered<ScopeId> {
    let loc = node.location.as_ref();
    let scope = cx.scopes.push_child(parent, ScopeKind::Block { label: None, end_block: None });
    if name == "_" {
        return Ok(scope);
    }
    let ptr = cx.emit_gen(
        InstKind::Alloca { name: Some(name.to_string()), type_inst: None, is_comptime: false },
        scope,
        loc,
    );
    cx.emit_gen(InstKind::StorePtr { ptr, value }, scope, loc);
    let req = BindingRequest::named(name, node.location.clone()).comptime(ComptimeStatus::Pending(value));
    let var = match cx.scopes.create_local_var(scope, req, cx.decls) {
        Ok(var) => var,
        Err(msg) => return Err(cx.fail(msg)),
    };
    cx.emit_gen(InstKind::DeclVar { var, ptr }, scope, loc);
    Ok(scope)
}

/// Records `value` as flowing into `end` and jumps there, unless the
/// current block already ended.
fn branch_into(
    cx: &mut LoweringContext<'_>,
    end: BlockId,
    incoming: &mut Vec<(BlockId, InstId)>,
    value: InstId,
    scope: ScopeId,
    force: bool,
) {
    if cx.stream.is_terminated() {
        return;
    }
    incoming.push((cx.stream.current_block(), value));
    cx.emit_with(InstKind::Br { target: end }, scope, None, force, true);
}

fn merge(
    cx: &mut LoweringContext<'_>,
    end: BlockId,
    incoming: Vec<(BlockId, InstId)>,
    scope: ScopeId,
    node: &AstNode,
) -> InstId {
    let loc = node.location.as_ref();
    cx.stream.set_current_block(end);
    if incoming.is_empty() {
        return cx.emit_gen(InstKind::Unreachable, scope, loc);
    }
    cx.emit_gen(InstKind::Phi { incoming }, scope, loc)
}

fn mismatched(cx: &mut LoweringContext<'_>, node: &AstNode, expected: &str) -> Poisoned {
    cx.fail_at(
        DiagnosticKind::InvalidConstruct,
        format!("expected {}, found {}", expected, node.kind),
        "lower_control",
        node,
    )
}

fn last_inst(cx: &LoweringContext<'_>) -> Option<InstId> {
    cx.stream.instructions().last().map(|i| i.id)
}

pub(crate) fn lower_if<'a>(
    cx: &mut LoweringContext<'a>,
    node: &'a AstNode,
    scope: ScopeId,
    rl: ResultLoc,
) -> Lowered {
    let AstNodeKind::If { condition, payload, then_branch, else_branch } = &node.kind else {
        return Err(mismatched(cx, node, "if"));
    };
    let loc = node.location.as_ref();
    let rl = cx.settle_result_loc(rl, scope, loc);

    let cond = lower_expr(cx, condition, scope, no_result_loc())?;
    let then_bb = cx.stream.new_block("if.then");
    let else_bb = cx.stream.new_block("if.else");
    let end_bb = cx.stream.new_block("if.end");
    let test = match payload {
        Some(_) => cx.emit_gen(InstKind::TestNonNull { value: cond }, scope, loc),
        None => cond,
    };
    cx.emit(InstKind::CondBr { cond: test, then_block: then_bb, else_block: else_bb }, scope, loc);

    let mut incoming = Vec::new();
    cx.stream.set_current_block(then_bb);
    let then_scope = match payload {
        Some(name) => {
            let unwrapped =
                cx.emit_gen(InstKind::OptionalUnwrap { value: cond, safety_check: false }, scope, loc);
            bind_payload(cx, scope, name, unwrapped, node)?
        }
        None => scope,
    };
    let v = lower_expr(cx, then_branch, then_scope, rl)?;
    branch_into(cx, end_bb, &mut incoming, v, scope, false);

    cx.stream.set_current_block(else_bb);
    let v = match else_branch {
        Some(e) => lower_expr(cx, e, scope, rl)?,
        None => cx.const_void(scope, loc),
    };
    branch_into(cx, end_bb, &mut incoming, v, scope, false);

    Ok(merge(cx, end_bb, incoming, scope, node))
}

struct LoopBlocks {
    cond: BlockId,
    body: BlockId,
    cont: BlockId,
    els: BlockId,
    end: BlockId,
}

fn loop_blocks(stream: &mut InstStream, prefix: &str) -> LoopBlocks {
    LoopBlocks {
        cond: stream.new_block(format!("{}.cond", prefix)),
        body: stream.new_block(format!("{}.body", prefix)),
        cont: stream.new_block(format!("{}.continue", prefix)),
        els: stream.new_block(format!("{}.else", prefix)),
        end: stream.new_block(format!("{}.end", prefix)),
    }
}

/// Opens the loop scope and its break sink.
fn enter_loop(
    cx: &mut LoweringContext<'_>,
    scope: ScopeId,
    label: &Option<String>,
    blocks: &LoopBlocks,
    rl: ResultLoc,
) -> ScopeId {
    let loop_scope = cx.scopes.push_child(
        scope,
        ScopeKind::Loop { label: label.clone(), break_block: blocks.end, continue_block: blocks.cont },
    );
    cx.break_sinks.insert(loop_scope, BreakSink { result_loc: rl, incoming: Vec::new() });
    loop_scope
}

/// Lowers the `else` branch and joins it with every `break` value.
fn finish_loop<'a>(
    cx: &mut LoweringContext<'a>,
    node: &'a AstNode,
    loop_scope: ScopeId,
    else_branch: Option<&'a AstNode>,
    blocks: &LoopBlocks,
    scope: ScopeId,
    rl: ResultLoc,
    force: bool,
) -> Lowered {
    let loc = node.location.as_ref();
    cx.stream.set_current_block(blocks.els);
    let v = match else_branch {
        Some(e) => lower_expr(cx, e, scope, rl)?,
        None => cx.const_void(scope, loc),
    };
    let mut incoming = cx.break_sinks.remove(&loop_scope).map(|s| s.incoming).unwrap_or_default();
    branch_into(cx, blocks.end, &mut incoming, v, scope, force);
    Ok(merge(cx, blocks.end, incoming, scope, node))
}

pub(crate) fn lower_while<'a>(
    cx: &mut LoweringContext<'a>,
    node: &'a AstNode,
    scope: ScopeId,
    rl: ResultLoc,
) -> Lowered {
    let AstNodeKind::While { label, condition, payload, continue_expr, body, else_branch, is_inline } =
        &node.kind
    else {
        return Err(mismatched(cx, node, "while"));
    };
    let loc = node.location.as_ref();
    let force = *is_inline;
    let rl = cx.settle_result_loc(rl, scope, loc);
    let blocks = loop_blocks(&mut cx.stream, "while");

    cx.emit_with(InstKind::Br { target: blocks.cond }, scope, loc, force, true);
    cx.stream.set_current_block(blocks.cond);
    let cond = lower_expr(cx, condition, scope, no_result_loc())?;
    let test = match payload {
        Some(_) => cx.emit_gen(InstKind::TestNonNull { value: cond }, scope, loc),
        None => cond,
    };
    cx.emit_with(
        InstKind::CondBr { cond: test, then_block: blocks.body, else_block: blocks.els },
        scope,
        loc,
        force,
        false,
    );

    cx.stream.set_current_block(blocks.body);
    let loop_scope = enter_loop(cx, scope, label, &blocks, rl);
    let body_scope = match payload {
        Some(name) => {
            let unwrapped =
                cx.emit_gen(InstKind::OptionalUnwrap { value: cond, safety_check: false }, loop_scope, loc);
            bind_payload(cx, loop_scope, name, unwrapped, node)?
        }
        None => loop_scope,
    };
    lower_expr(cx, body, body_scope, ResultLoc::Discard)?;
    if !cx.stream.is_terminated() {
        cx.emit_with(InstKind::Br { target: blocks.cont }, scope, loc, force, true);
    }

    cx.stream.set_current_block(blocks.cont);
    if let Some(cont) = continue_expr {
        lower_expr(cx, cont, body_scope, ResultLoc::Discard)?;
    }
    if !cx.stream.is_terminated() {
        cx.emit_with(InstKind::Br { target: blocks.cond }, scope, loc, force, true);
    }

    finish_loop(cx, node, loop_scope, else_branch.as_deref(), &blocks, scope, rl, force)
}

pub(crate) fn lower_for<'a>(
    cx: &mut LoweringContext<'a>,
    node: &'a AstNode,
    scope: ScopeId,
    rl: ResultLoc,
) -> Lowered {
    let AstNodeKind::For { label, iterable, item, index, body, else_branch, is_inline } = &node.kind else {
        return Err(mismatched(cx, node, "for"));
    };
    let loc = node.location.as_ref();
    let force = *is_inline;
    let rl = cx.settle_result_loc(rl, scope, loc);

    let array = lower_expr(cx, iterable, scope, no_result_loc())?;
    let len_ptr = cx.emit_gen(InstKind::FieldPtr { container: array, field: "len".to_string() }, scope, loc);
    let len = cx.emit_gen(InstKind::LoadPtr { ptr: len_ptr }, scope, loc);
    let index_ptr = cx.emit_with(
        InstKind::Alloca { name: index.clone(), type_inst: None, is_comptime: force },
        scope,
        loc,
        force,
        true,
    );
    let zero = cx.emit_gen(InstKind::Const(ConstValue::Int(0)), scope, loc);
    cx.emit_gen(InstKind::StorePtr { ptr: index_ptr, value: zero }, scope, loc);

    let blocks = loop_blocks(&mut cx.stream, "for");
    cx.emit_with(InstKind::Br { target: blocks.cond }, scope, loc, force, true);

    cx.stream.set_current_block(blocks.cond);
    let i = cx.emit_gen(InstKind::LoadPtr { ptr: index_ptr }, scope, loc);
    let in_bounds = cx.emit_gen(InstKind::BinOp { op: BinaryOperator::Lt, lhs: i, rhs: len }, scope, loc);
    cx.emit_with(
        InstKind::CondBr { cond: in_bounds, then_block: blocks.body, else_block: blocks.els },
        scope,
        loc,
        force,
        true,
    );

    cx.stream.set_current_block(blocks.body);
    let loop_scope = enter_loop(cx, scope, label, &blocks, rl);
    let elem_ptr = cx.emit_gen(InstKind::ElemPtr { array, index: i }, loop_scope, loc);
    let elem = cx.emit_gen(InstKind::LoadPtr { ptr: elem_ptr }, loop_scope, loc);
    let body_scope = bind_payload(cx, loop_scope, item, elem, node)?;

    let index_req = match index {
        Some(name) => BindingRequest::named(name.clone(), node.location.clone()),
        None => BindingRequest::synthesized(None, node.location.clone()),
    }
    .comptime(ComptimeStatus::Pending(i));
    let index_var = match cx.scopes.create_local_var(body_scope, index_req, cx.decls) {
        Ok(var) => var,
        Err(msg) => return Err(cx.fail(msg)),
    };
    cx.emit_gen(InstKind::DeclVar { var: index_var, ptr: index_ptr }, body_scope, loc);

    lower_expr(cx, body, body_scope, ResultLoc::Discard)?;
    if !cx.stream.is_terminated() {
        cx.emit_with(InstKind::Br { target: blocks.cont }, scope, loc, force, true);
    }

    cx.stream.set_current_block(blocks.cont);
    let current = cx.emit_gen(InstKind::LoadPtr { ptr: index_ptr }, scope, loc);
    let one = cx.emit_gen(InstKind::Const(ConstValue::Int(1)), scope, loc);
    let next = cx.emit_gen(InstKind::BinOp { op: BinaryOperator::Add, lhs: current, rhs: one }, scope, loc);
    cx.emit_gen(InstKind::StorePtr { ptr: index_ptr, value: next }, scope, loc);
    cx.emit_with(InstKind::Br { target: blocks.cond }, scope, loc, force, true);

    finish_loop(cx, node, loop_scope, else_branch.as_deref(), &blocks, scope, rl, force)
}

fn leave_comptime_error(cx: &mut LoweringContext<'_>, node: &AstNode) -> Poisoned {
    cx.fail_at(
        DiagnosticKind::InvalidConstruct,
        "control flow cannot leave a comptime block",
        "lower_control",
        node,
    )
}

pub(crate) fn lower_break<'a>(
    cx: &mut LoweringContext<'a>,
    node: &'a AstNode,
    label: Option<&str>,
    value: Option<&'a AstNode>,
    scope: ScopeId,
) -> Lowered {
    let loc = node.location.as_ref();
    let target = match cx.scopes.break_target(scope, label) {
        JumpTarget::Found(target) => target,
        JumpTarget::NotInLoop => {
            return Err(cx.fail_at(
                DiagnosticKind::InvalidConstruct,
                "break expression outside loop",
                "lower_break",
                node,
            ));
        }
        JumpTarget::UnknownLabel(l) | JumpTarget::LabelNotLoop(l) => {
            return Err(cx.fail_at(
                DiagnosticKind::UnresolvedName,
                format!("label not found: '{}'", l),
                "lower_break",
                node,
            ));
        }
        JumpTarget::CrossesDefer => {
            return Err(cx.fail_at(
                DiagnosticKind::InvalidConstruct,
                "cannot break out of defer expression",
                "lower_break",
                node,
            ));
        }
    };
    if cx.leaves_stream(scope, Some(target)) {
        return Err(leave_comptime_error(cx, node));
    }

    let end_block = match &cx.scopes.scope(target).kind {
        ScopeKind::Loop { break_block, .. } => Some(*break_block),
        ScopeKind::Block { end_block, .. } => *end_block,
        _ => None,
    };
    let Some(end_block) = end_block else {
        return Err(mismatched(cx, node, "loop or labeled block"));
    };
    let sink_rl = cx.break_sinks.get(&target).map(|s| s.result_loc).unwrap_or_default();

    let v = match value {
        Some(v) => lower_expr(cx, v, scope, sink_rl)?,
        None => cx.const_void(scope, loc),
    };
    cx.run_defers(scope, Some(target), ExitPath::Normal)?;
    if cx.stream.is_terminated() {
        return Ok(last_inst(cx).unwrap_or(v));
    }
    let from = cx.stream.current_block();
    if let Some(sink) = cx.break_sinks.get_mut(&target) {
        sink.incoming.push((from, v));
    }
    Ok(cx.emit(InstKind::Br { target: end_block }, scope, loc))
}

pub(crate) fn lower_continue<'a>(
    cx: &mut LoweringContext<'a>,
    node: &'a AstNode,
    label: Option<&str>,
    scope: ScopeId,
) -> Lowered {
    let loc = node.location.as_ref();
    let target = match cx.scopes.continue_target(scope, label) {
        JumpTarget::Found(target) => target,
        JumpTarget::NotInLoop => {
            return Err(cx.fail_at(
                DiagnosticKind::InvalidConstruct,
                "continue expression outside loop",
                "lower_continue",
                node,
            ));
        }
        JumpTarget::LabelNotLoop(l) => {
            return Err(cx.fail_at(
                DiagnosticKind::InvalidConstruct,
                format!("continue target '{}' is not a loop", l),
                "lower_continue",
                node,
            ));
        }
        JumpTarget::UnknownLabel(l) => {
            return Err(cx.fail_at(
                DiagnosticKind::UnresolvedName,
                format!("label not found: '{}'", l),
                "lower_continue",
                node,
            ));
        }
        JumpTarget::CrossesDefer => {
            return Err(cx.fail_at(
                DiagnosticKind::InvalidConstruct,
                "cannot continue out of defer expression",
                "lower_continue",
                node,
            ));
        }
    };
    if cx.leaves_stream(scope, Some(target)) {
        return Err(leave_comptime_error(cx, node));
    }
    let ScopeKind::Loop { continue_block, .. } = cx.scopes.scope(target).kind else {
        return Err(mismatched(cx, node, "loop"));
    };

    cx.run_defers(scope, Some(target), ExitPath::Normal)?;
    if cx.stream.is_terminated() {
        return Ok(last_inst(cx).unwrap_or(InstId(0)));
    }
    Ok(cx.emit(InstKind::Br { target: continue_block }, scope, loc))
}

/// Rejects function-exit constructs outside a function, inside a deferred
/// expression, or inside a nested comptime stream.
fn check_fn_exit(cx: &mut LoweringContext<'_>, node: &AstNode, scope: ScopeId, what: &str) -> Lowered<()> {
    if cx.scopes.enclosing_fn(scope).is_none() {
        return Err(cx.fail_at(
            DiagnosticKind::InvalidConstruct,
            format!("'{}' outside function scope", what),
            "lower_control",
            node,
        ));
    }
    if cx.scopes.in_defer_expr(scope) {
        let message = if what == "return" {
            "cannot return from defer expression".to_string()
        } else {
            format!("'{}' not allowed inside defer expression", what)
        };
        return Err(cx.fail_at(DiagnosticKind::InvalidConstruct, message, "lower_control", node));
    }
    if cx.leaves_stream(scope, None) {
        return Err(leave_comptime_error(cx, node));
    }
    Ok(())
}

pub(crate) fn lower_return<'a>(
    cx: &mut LoweringContext<'a>,
    node: &'a AstNode,
    value: Option<&'a AstNode>,
    scope: ScopeId,
) -> Lowered {
    let loc = node.location.as_ref();
    check_fn_exit(cx, node, scope, "return")?;

    let operand = match value {
        Some(v) => Some(lower_expr(cx, v, scope, ResultLoc::Return)?),
        None => None,
    };

    let has_errdefer = cx
        .scopes
        .defers_until(scope, None)
        .iter()
        .any(|(_, kind)| *kind == DeferKind::Error);

    match operand {
        Some(value) if has_errdefer => {
            let is_err = cx.emit_gen(InstKind::IsErr { value }, scope, loc);
            let err_bb = cx.stream.new_block("ret.err");
            let ok_bb = cx.stream.new_block("ret.ok");
            cx.emit_gen(InstKind::CondBr { cond: is_err, then_block: err_bb, else_block: ok_bb }, scope, loc);

            cx.stream.set_current_block(err_bb);
            cx.run_defers(scope, None, ExitPath::Error)?;
            if !cx.stream.is_terminated() {
                cx.emit(InstKind::Return { operand }, scope, loc);
            }
            cx.stream.set_current_block(ok_bb);
            cx.run_defers(scope, None, ExitPath::Normal)?;
        }
        _ => cx.run_defers(scope, None, ExitPath::Normal)?,
    }

    if cx.stream.is_terminated() {
        return Ok(last_inst(cx).unwrap_or(InstId(0)));
    }
    Ok(cx.emit(InstKind::Return { operand }, scope, loc))
}

pub(crate) fn lower_try<'a>(
    cx: &mut LoweringContext<'a>,
    node: &'a AstNode,
    expr: &'a AstNode,
    scope: ScopeId,
    rl: ResultLoc,
) -> Lowered {
    let loc = node.location.as_ref();
    check_fn_exit(cx, node, scope, "try")?;

    let value = lower_expr(cx, expr, scope, no_result_loc())?;
    let is_err = cx.emit(InstKind::IsErr { value }, scope, loc);
    let err_bb = cx.stream.new_block("try.err");
    let ok_bb = cx.stream.new_block("try.ok");
    cx.emit_gen(InstKind::CondBr { cond: is_err, then_block: err_bb, else_block: ok_bb }, scope, loc);

    cx.stream.set_current_block(err_bb);
    let code = cx.emit_gen(InstKind::UnwrapErrCode { value }, scope, loc);
    cx.run_defers(scope, None, ExitPath::Error)?;
    if !cx.stream.is_terminated() {
        cx.emit_gen(InstKind::Return { operand: Some(code) }, scope, loc);
    }

    cx.stream.set_current_block(ok_bb);
    let payload = cx.emit(InstKind::UnwrapErrPayload { value, safety_check: false }, scope, loc);
    Ok(cx.finish_result(payload, rl, scope, loc))
}

pub(crate) fn lower_catch<'a>(
    cx: &mut LoweringContext<'a>,
    node: &'a AstNode,
    lhs: &'a AstNode,
    payload: Option<&str>,
    rhs: &'a AstNode,
    scope: ScopeId,
    rl: ResultLoc,
) -> Lowered {
    let loc = node.location.as_ref();
    let rl = cx.settle_result_loc(rl, scope, loc);

    let value = lower_expr(cx, lhs, scope, no_result_loc())?;
    let is_err = cx.emit(InstKind::IsErr { value }, scope, loc);
    let err_bb = cx.stream.new_block("catch.err");
    let ok_bb = cx.stream.new_block("catch.ok");
    let end_bb = cx.stream.new_block("catch.end");
    cx.emit_gen(InstKind::CondBr { cond: is_err, then_block: err_bb, else_block: ok_bb }, scope, loc);

    let mut incoming = Vec::new();
    cx.stream.set_current_block(err_bb);
    let mut err_scope = cx.scopes.push_child(scope, ScopeKind::ErrorHandling);
    if let Some(name) = payload {
        let code = cx.emit_gen(InstKind::UnwrapErrCode { value }, err_scope, loc);
        err_scope = bind_payload(cx, err_scope, name, code, node)?;
    }
    let v = lower_expr(cx, rhs, err_scope, rl)?;
    branch_into(cx, end_bb, &mut incoming, v, scope, false);

    cx.stream.set_current_block(ok_bb);
    let unwrapped = cx.emit_gen(InstKind::UnwrapErrPayload { value, safety_check: false }, scope, loc);
    let v = cx.finish_result(unwrapped, rl, scope, loc);
    branch_into(cx, end_bb, &mut incoming, v, scope, false);

    Ok(merge(cx, end_bb, incoming, scope, node))
}

pub(crate) fn lower_orelse<'a>(
    cx: &mut LoweringContext<'a>,
    node: &'a AstNode,
    lhs: &'a AstNode,
    rhs: &'a AstNode,
    scope: ScopeId,
    rl: ResultLoc,
) -> Lowered {
    let loc = node.location.as_ref();
    let rl = cx.settle_result_loc(rl, scope, loc);

    let value = lower_expr(cx, lhs, scope, no_result_loc())?;
    let non_null = cx.emit(InstKind::TestNonNull { value }, scope, loc);
    let ok_bb = cx.stream.new_block("orelse.ok");
    let null_bb = cx.stream.new_block("orelse.null");
    let end_bb = cx.stream.new_block("orelse.end");
    cx.emit_gen(InstKind::CondBr { cond: non_null, then_block: ok_bb, else_block: null_bb }, scope, loc);

    let mut incoming = Vec::new();
    cx.stream.set_current_block(null_bb);
    let v = lower_expr(cx, rhs, scope, rl)?;
    branch_into(cx, end_bb, &mut incoming, v, scope, false);

    cx.stream.set_current_block(ok_bb);
    let unwrapped = cx.emit_gen(InstKind::OptionalUnwrap { value, safety_check: false }, scope, loc);
    let v = cx.finish_result(unwrapped, rl, scope, loc);
    branch_into(cx, end_bb, &mut incoming, v, scope, false);

    Ok(merge(cx, end_bb, incoming, scope, node))
}

pub(crate) fn lower_bool_short_circuit<'a>(
    cx: &mut LoweringContext<'a>,
    node: &'a AstNode,
    op: BinaryOperator,
    lhs: &'a AstNode,
    rhs: &'a AstNode,
    scope: ScopeId,
    rl: ResultLoc,
) -> Lowered {
    let loc = node.location.as_ref();
    let l = lower_expr(cx, lhs, scope, no_result_loc())?;
    let rhs_bb = cx.stream.new_block(format!("{}.rhs", op.symbol()));
    let end_bb = cx.stream.new_block(format!("{}.end", op.symbol()));
    let (then_block, else_block) = match op {
        BinaryOperator::BoolOr => (end_bb, rhs_bb),
        _ => (rhs_bb, end_bb),
    };
    let mut incoming = vec![(cx.stream.current_block(), l)];
    cx.emit_gen(InstKind::CondBr { cond: l, then_block, else_block }, scope, loc);

    cx.stream.set_current_block(rhs_bb);
    let r = lower_expr(cx, rhs, scope, no_result_loc())?;
    branch_into(cx, end_bb, &mut incoming, r, scope, false);

    let v = merge(cx, end_bb, incoming, scope, node);
    Ok(cx.finish_result(v, rl, scope, loc))
}

/// `comptime expr`. Inside an already compile-time scope the expression is
/// lowered in place; otherwise it becomes a child stream.
pub(crate) fn lower_comptime<'a>(
    cx: &mut LoweringContext<'a>,
    node: &'a AstNode,
    expr: &'a AstNode,
    scope: ScopeId,
    rl: ResultLoc,
) -> Lowered {
    let loc = node.location.as_ref();
    let child_scope = cx.scopes.push_child(scope, ScopeKind::Comptime);
    if cx.stream.is_inline() || cx.scopes.is_forced_comptime(scope) {
        return lower_expr(cx, expr, child_scope, rl);
    }

    let suffix = match loc {
        Some(l) => format!("{}:{}", l.line, l.column),
        None => format!("#{}", node.get_id()),
    };
    let child_name = format!("{}.comptime:{}", cx.stream.name(), suffix);
    let parent_stream = std::mem::replace(&mut cx.stream, InstStream::new(child_name, true));
    let parent_root = std::mem::replace(&mut cx.stream_root, child_scope);
    let parent_sinks = std::mem::take(&mut cx.break_sinks);
    cx.push_frame(loc, "comptime block");

    let result = lower_expr(cx, expr, child_scope, no_result_loc());
    if let Ok(value) = result {
        if !cx.stream.is_terminated() {
            cx.emit_gen(InstKind::Return { operand: Some(value) }, child_scope, loc);
        }
    }

    cx.pop_frame();
    cx.break_sinks = parent_sinks;
    cx.stream_root = parent_root;
    let child = std::mem::replace(&mut cx.stream, parent_stream);
    let unit = cx.stream.add_child(child);
    result?;

    let v = cx.emit(InstKind::ComptimeBlock { unit }, scope, loc);
    Ok(cx.finish_result(v, rl, scope, loc))
}

pub(crate) fn lower_suspend<'a>(
    cx: &mut LoweringContext<'a>,
    node: &'a AstNode,
    body: Option<&'a AstNode>,
    scope: ScopeId,
) -> Lowered {
    let loc = node.location.as_ref();
    if cx.scopes.enclosing_fn(scope).is_none() {
        return Err(cx.fail_at(
            DiagnosticKind::InvalidConstruct,
            "suspend outside function definition",
            "lower_suspend",
            node,
        ));
    }
    if cx.scopes.in_suspend(scope) {
        return Err(cx.fail_at(
            DiagnosticKind::InvalidConstruct,
            "cannot suspend inside suspend block",
            "lower_suspend",
            node,
        ));
    }
    if cx.stream.is_inline() || cx.scopes.is_forced_comptime(scope) {
        return Err(cx.fail_at(
            DiagnosticKind::ForcedComptimeViolation,
            "unable to evaluate suspend at compile time",
            "lower_suspend",
            node,
        ));
    }

    let begin = cx.emit(InstKind::SuspendBegin, scope, loc);
    if let Some(body) = body {
        let suspend_scope = cx.scopes.push_child(scope, ScopeKind::Suspend);
        lower_expr(cx, body, suspend_scope, ResultLoc::Discard)?;
    }
    Ok(cx.emit(InstKind::SuspendFinish { begin }, scope, loc))
}
