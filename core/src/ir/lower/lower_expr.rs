//! Lowering of expression nodes.
//!
//! Every routine takes the scope the expression is evaluated in and the
//! result location chosen by its caller, appends instructions to the
//! context's stream and returns the instruction holding the value.

use crate::ast::{AstNode, AstNodeKind, BinaryOperator, CallModifier, UnaryOperator};
use crate::diagnostics::DiagnosticKind;
use crate::ir::inst::{InstId, InstKind};
use crate::ir::result_loc::{ResultLoc, no_result_loc};
use crate::ir::value::ConstValue;
use crate::scope::{Resolved, ScopeId, ScopeKind, is_primitive_type};

use super::declare_builtins::builtin_info;
use super::lowering_context::{Lowered, LoweringContext, Poisoned};
use super::{lower_control, lower_objects, lower_stmt};

pub(crate) fn lower_expr<'a>(
    cx: &mut LoweringContext<'a>,
    node: &'a AstNode,
    scope: ScopeId,
    rl: ResultLoc,
) -> Lowered {
    cx.descend(node)?;
    let result = lower_expr_inner(cx, node, scope, rl);
    cx.ascend();
    result
}

fn lower_expr_inner<'a>(
    cx: &mut LoweringContext<'a>,
    node: &'a AstNode,
    scope: ScopeId,
    rl: ResultLoc,
) -> Lowered {
    let loc = node.location.as_ref();
    match &node.kind {
        AstNodeKind::IntLiteral { value } => lower_const(cx, ConstValue::Int(*value), node, scope, rl),
        AstNodeKind::FloatLiteral { value } => lower_const(cx, ConstValue::Float(*value), node, scope, rl),
        AstNodeKind::StringLiteral { value } => {
            lower_const(cx, ConstValue::Str(value.clone()), node, scope, rl)
        }
        AstNodeKind::BoolLiteral { value } => lower_const(cx, ConstValue::Bool(*value), node, scope, rl),
        AstNodeKind::NullLiteral => lower_const(cx, ConstValue::Null, node, scope, rl),
        AstNodeKind::UndefinedLiteral => lower_const(cx, ConstValue::Undefined, node, scope, rl),
        AstNodeKind::ErrorValue { name } => {
            let v = cx.emit(InstKind::ErrorValue { name: name.clone() }, scope, loc);
            Ok(cx.finish_result(v, rl, scope, loc))
        }

        AstNodeKind::Symbol { name } => {
            let v = lower_symbol(cx, node, name, scope, false)?;
            Ok(cx.finish_result(v, rl, scope, loc))
        }
        AstNodeKind::FieldAccess { .. } | AstNodeKind::ArrayAccess { .. } => {
            let ptr = lower_lval(cx, node, scope)?;
            let v = cx.emit(InstKind::LoadPtr { ptr }, scope, loc);
            Ok(cx.finish_result(v, rl, scope, loc))
        }
        AstNodeKind::UnaryOp { op, operand } => lower_unary(cx, node, *op, operand, scope, rl),
        AstNodeKind::BinaryOp { op, lhs, rhs } => match op {
            BinaryOperator::BoolAnd | BinaryOperator::BoolOr => {
                lower_control::lower_bool_short_circuit(cx, node, *op, lhs, rhs, scope, rl)
            }
            BinaryOperator::Orelse => lower_control::lower_orelse(cx, node, lhs, rhs, scope, rl),
            _ => {
                let l = lower_expr(cx, lhs, scope, no_result_loc())?;
                let r = lower_expr(cx, rhs, scope, no_result_loc())?;
                let v = cx.emit(InstKind::BinOp { op: *op, lhs: l, rhs: r }, scope, loc);
                Ok(cx.finish_result(v, rl, scope, loc))
            }
        },
        AstNodeKind::Call { callee, args, modifier } => lower_call(cx, node, callee, args, *modifier, scope, rl),
        AstNodeKind::BuiltinCall { name, args } => lower_builtin_call(cx, node, name, args, scope, rl),

        AstNodeKind::ContainerDecl { .. } => lower_objects::lower_container_decl(cx, node, scope, rl),
        AstNodeKind::ErrorSetDecl { .. } => lower_objects::lower_error_set(cx, node, scope, rl),
        AstNodeKind::StructInit { .. } => lower_objects::lower_struct_init(cx, node, scope, rl),
        AstNodeKind::ArrayInit { .. } => lower_objects::lower_array_init(cx, node, scope, rl),

        AstNodeKind::Block { .. } => lower_stmt::lower_block(cx, node, scope, rl),
        AstNodeKind::Assign { .. } | AstNodeKind::AssignOp { .. } => {
            lower_stmt::lower_assign(cx, node, scope)?;
            Ok(cx.const_void(scope, loc))
        }
        AstNodeKind::If { .. } => lower_control::lower_if(cx, node, scope, rl),
        AstNodeKind::While { .. } => lower_control::lower_while(cx, node, scope, rl),
        AstNodeKind::For { .. } => lower_control::lower_for(cx, node, scope, rl),
        AstNodeKind::Break { label, value } => {
            lower_control::lower_break(cx, node, label.as_deref(), value.as_deref(), scope)
        }
        AstNodeKind::Continue { label } => lower_control::lower_continue(cx, node, label.as_deref(), scope),
        AstNodeKind::Return { value } => lower_control::lower_return(cx, node, value.as_deref(), scope),
        AstNodeKind::Try { expr } => lower_control::lower_try(cx, node, expr, scope, rl),
        AstNodeKind::Catch { lhs, payload, rhs } => {
            lower_control::lower_catch(cx, node, lhs, payload.as_deref(), rhs, scope, rl)
        }
        AstNodeKind::Comptime { expr } => lower_control::lower_comptime(cx, node, expr, scope, rl),
        AstNodeKind::Suspend { body } => lower_control::lower_suspend(cx, node, body.as_deref(), scope),
        AstNodeKind::Unreachable => Ok(cx.emit(InstKind::Unreachable, scope, loc)),
        AstNodeKind::Asm { template, is_volatile } => {
            if cx.scopes.is_forced_comptime(scope) {
                return Err(cx.fail_at(
                    DiagnosticKind::ForcedComptimeViolation,
                    "unable to evaluate inline assembly at compile time",
                    "lower_expr",
                    node,
                ));
            }
            let v = cx.emit(
                InstKind::Asm { template: template.clone(), is_volatile: *is_volatile },
                scope,
                loc,
            );
            Ok(cx.finish_result(v, rl, scope, loc))
        }

        AstNodeKind::VarDecl { .. } | AstNodeKind::Defer { .. } => Err(cx.fail_at(
            DiagnosticKind::InvalidConstruct,
            format!("{} is only allowed as a statement", node.kind),
            "lower_expr",
            node,
        )),
        AstNodeKind::Root { .. }
        | AstNodeKind::FnDecl { .. }
        | AstNodeKind::Param { .. }
        | AstNodeKind::TestDecl { .. }
        | AstNodeKind::ContainerField { .. } => Err(cx.fail_at(
            DiagnosticKind::InvalidConstruct,
            format!("unexpected {} in expression", node.kind),
            "lower_expr",
            node,
        )),
    }
}

fn lower_const(
    cx: &mut LoweringContext<'_>,
    value: ConstValue,
    node: &AstNode,
    scope: ScopeId,
    rl: ResultLoc,
) -> Lowered {
    let loc = node.location.as_ref();
    let v = cx.emit(InstKind::Const(value), scope, loc);
    Ok(cx.finish_result(v, rl, scope, loc))
}

/// Resolves an identifier. With `lval` the address is produced instead of
/// the value.
fn lower_symbol(
    cx: &mut LoweringContext<'_>,
    node: &AstNode,
    name: &str,
    scope: ScopeId,
    lval: bool,
) -> Lowered {
    let loc = node.location.as_ref();
    if name == "_" {
        return Err(cx.fail_at(
            DiagnosticKind::InvalidConstruct,
            "'_' used as an identifier without '_ = ' assignment",
            "lower_symbol",
            node,
        ));
    }
    if is_primitive_type(name) {
        if lval {
            return Err(cx.fail_at(
                DiagnosticKind::InvalidConstruct,
                format!("cannot assign to primitive type '{}'", name),
                "lower_symbol",
                node,
            ));
        }
        return Ok(cx.emit(InstKind::Const(ConstValue::Type(name.to_string())), scope, loc));
    }

    match cx.scopes.lookup(scope, name, cx.decls) {
        Some(Resolved::Var(var)) if cx.failed_vars.contains(&var) => Err(Poisoned),
        Some(Resolved::Var(var)) => {
            let ptr = cx.emit(InstKind::VarPtr { var }, scope, loc);
            if lval {
                Ok(ptr)
            } else {
                Ok(cx.emit(InstKind::LoadPtr { ptr }, scope, loc))
            }
        }
        Some(Resolved::Decl(decl)) => Ok(cx.emit(
            InstKind::DeclRef { decl, name: name.to_string(), lval },
            scope,
            loc,
        )),
        None => Err(cx.fail_at(
            DiagnosticKind::UnresolvedName,
            format!("use of undeclared identifier '{}'", name),
            "lower_symbol",
            node,
        )),
    }
}

/// Lowers an assignable expression to the pointer it designates.
pub(crate) fn lower_lval<'a>(
    cx: &mut LoweringContext<'a>,
    node: &'a AstNode,
    scope: ScopeId,
) -> Lowered {
    let loc = node.location.as_ref();
    match &node.kind {
        AstNodeKind::Symbol { name } => lower_symbol(cx, node, name, scope, true),
        AstNodeKind::FieldAccess { container, field } => {
            let base = lower_operand_ptr(cx, container, scope)?;
            Ok(cx.emit(InstKind::FieldPtr { container: base, field: field.clone() }, scope, loc))
        }
        AstNodeKind::ArrayAccess { array, index } => {
            let base = lower_operand_ptr(cx, array, scope)?;
            let idx = lower_expr(cx, index, scope, no_result_loc())?;
            Ok(cx.emit(InstKind::ElemPtr { array: base, index: idx }, scope, loc))
        }
        AstNodeKind::UnaryOp { op: UnaryOperator::Deref, operand } => {
            lower_expr(cx, operand, scope, no_result_loc())
        }
        _ => Err(cx.fail_at(
            DiagnosticKind::InvalidConstruct,
            "invalid left-hand side to assignment",
            "lower_lval",
            node,
        )),
    }
}

/// Base of a field or element access: its address when it has one,
/// otherwise its value.
fn lower_operand_ptr<'a>(
    cx: &mut LoweringContext<'a>,
    node: &'a AstNode,
    scope: ScopeId,
) -> Lowered {
    if node.kind.is_lvalue() {
        lower_lval(cx, node, scope)
    } else {
        lower_expr(cx, node, scope, no_result_loc())
    }
}

fn lower_unary<'a>(
    cx: &mut LoweringContext<'a>,
    node: &'a AstNode,
    op: UnaryOperator,
    operand: &'a AstNode,
    scope: ScopeId,
    rl: ResultLoc,
) -> Lowered {
    let loc = node.location.as_ref();
    let v = match op {
        UnaryOperator::AddressOf => {
            if operand.kind.is_lvalue() {
                lower_lval(cx, operand, scope)?
            } else {
                let value = lower_expr(cx, operand, scope, no_result_loc())?;
                cx.emit(InstKind::Ref { value }, scope, loc)
            }
        }
        UnaryOperator::Deref => {
            let ptr = lower_expr(cx, operand, scope, no_result_loc())?;
            cx.emit(InstKind::LoadPtr { ptr }, scope, loc)
        }
        UnaryOperator::OptionalUnwrap => {
            let value = lower_expr(cx, operand, scope, no_result_loc())?;
            cx.emit(InstKind::OptionalUnwrap { value, safety_check: true }, scope, loc)
        }
        UnaryOperator::Negate | UnaryOperator::BoolNot | UnaryOperator::BitNot => {
            let value = lower_expr(cx, operand, scope, no_result_loc())?;
            cx.emit(InstKind::UnOp { op, operand: value }, scope, loc)
        }
    };
    Ok(cx.finish_result(v, rl, scope, loc))
}

fn lower_call<'a>(
    cx: &mut LoweringContext<'a>,
    node: &'a AstNode,
    callee: &'a AstNode,
    args: &'a [AstNode],
    modifier: CallModifier,
    scope: ScopeId,
    rl: ResultLoc,
) -> Lowered {
    let loc = node.location.as_ref();
    let forced = cx.scopes.is_forced_comptime(scope);
    if forced {
        let what = match modifier {
            CallModifier::NeverInline => Some("never_inline"),
            CallModifier::Async => Some("async"),
            _ => None,
        };
        if let Some(what) = what {
            return Err(cx.fail_at(
                DiagnosticKind::ForcedComptimeViolation,
                format!("unable to perform '{}' call at compile time", what),
                "lower_call",
                node,
            ));
        }
    }

    let callee_inst = lower_expr(cx, callee, scope, no_result_loc())?;

    let is_comptime_call =
        modifier == CallModifier::CompileTime || super::should_inline(&cx.stream, &cx.scopes, scope);
    if is_comptime_call {
        cx.push_frame(loc, format!("call to {}", describe_callee(callee)));
    }
    let arg_scope = if modifier == CallModifier::CompileTime && !forced {
        cx.scopes.push_child(scope, ScopeKind::Comptime)
    } else {
        scope
    };
    let mut arg_insts = Vec::with_capacity(args.len());
    for arg in args {
        match lower_expr(cx, arg, arg_scope, no_result_loc()) {
            Ok(v) => arg_insts.push(v),
            Err(p) => {
                if is_comptime_call {
                    cx.pop_frame();
                }
                return Err(p);
            }
        }
    }
    if is_comptime_call {
        cx.pop_frame();
    }

    let result_ptr = cx.resolve_result_ptr(rl, scope, loc);
    let call = cx.emit_with(
        InstKind::Call { callee: callee_inst, args: arg_insts, modifier, result_ptr },
        scope,
        loc,
        modifier == CallModifier::CompileTime,
        false,
    );
    Ok(call)
}

fn describe_callee(callee: &AstNode) -> String {
    match &callee.kind {
        AstNodeKind::Symbol { name } => format!("'{}'", name),
        AstNodeKind::FieldAccess { field, .. } => format!("'{}'", field),
        _ => "function".to_string(),
    }
}

fn lower_builtin_call<'a>(
    cx: &mut LoweringContext<'a>,
    node: &'a AstNode,
    name: &str,
    args: &'a [AstNode],
    scope: ScopeId,
    rl: ResultLoc,
) -> Lowered {
    let loc = node.location.as_ref();
    let bare = name.trim_start_matches('@');
    let Some(info) = builtin_info(bare) else {
        return Err(cx.fail_at(
            DiagnosticKind::UnresolvedName,
            format!("invalid builtin function: '@{}'", bare),
            "lower_builtin_call",
            node,
        ));
    };
    if !info.arity.accepts(args.len()) {
        return Err(cx.fail_at(
            DiagnosticKind::InvalidConstruct,
            format!("expected {} argument(s), found {}", info.arity, args.len()),
            "lower_builtin_call",
            node,
        ));
    }

    if bare == "as" {
        let type_scope = cx.scopes.push_child(scope, ScopeKind::Comptime);
        let dest_type = lower_expr(cx, &args[0], type_scope, no_result_loc())?;
        let value = lower_expr(cx, &args[1], scope, no_result_loc())?;
        let v = cx.emit(InstKind::As { dest_type, value }, scope, loc);
        return Ok(cx.finish_result(v, rl, scope, loc));
    }

    let mut arg_insts: Vec<InstId> = Vec::with_capacity(args.len());
    for arg in args {
        arg_insts.push(lower_expr(cx, arg, scope, no_result_loc())?);
    }
    let v = cx.emit(InstKind::BuiltinCall { name: bare.to_string(), args: arg_insts }, scope, loc);
    Ok(cx.finish_result(v, rl, scope, loc))
}
