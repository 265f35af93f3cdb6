//! Lowering of type-producing and aggregate expressions: container
//! declarations, error sets, and struct/array initializers.

use rustc_hash::FxHashMap;

use crate::ast::{AstNode, AstNodeKind, ContainerKind, ast_field_to_symbol_node};
use crate::diagnostics::{DiagnosticKind, ErrorMsg};
use crate::ir::anon_name::{AnonTypeName, name_anonymous_entity};
use crate::ir::inst::{ContainerFieldInst, InstId, InstKind};
use crate::ir::result_loc::{ResultLoc, no_result_loc};
use crate::ir::value::ConstValue;
use crate::location::Location;
use crate::scope::{ScopeId, ScopeKind};

use super::lower_expr::lower_expr;
use super::lowering_context::{Lowered, LoweringContext, Poisoned};

/// Name of the entity `node` produces. A container written directly as the
/// initializer of a declaration takes that declaration's name.
fn entity_name(cx: &mut LoweringContext<'_>, node: &AstNode, scope: ScopeId, kind: &str) -> AnonTypeName {
    match cx.take_name_hint(node) {
        Some(name) => {
            let namespace = cx.scopes.namespace(scope).unwrap_or("root");
            AnonTypeName { full: format!("{}.{}", namespace, name), bare: name }
        }
        None => name_anonymous_entity(&cx.scopes, scope, kind, node.location.as_ref(), node.get_id()),
    }
}

/// Lowers an expression that must be known at compile time, such as a
/// field type, in a `comptime` child of `scope`.
fn lower_comptime_operand<'a>(
    cx: &mut LoweringContext<'a>,
    node: Option<&'a AstNode>,
    scope: ScopeId,
) -> Lowered<Option<InstId>> {
    let Some(node) = node else {
        return Ok(None);
    };
    let type_scope = cx.scopes.push_child(scope, ScopeKind::Comptime);
    lower_expr(cx, node, type_scope, no_result_loc()).map(Some)
}

fn duplicate(
    cx: &mut LoweringContext<'_>,
    message: String,
    issuer: &str,
    node: &AstNode,
    previous: Option<Location>,
    note: &str,
) -> Poisoned {
    let msg = ErrorMsg::with(DiagnosticKind::NameCollision, message, issuer, node.location.clone(), node.span.clone())
        .with_note(ErrorMsg::note(note, previous));
    cx.fail(msg)
}

pub(crate) fn lower_container_decl<'a>(
    cx: &mut LoweringContext<'a>,
    node: &'a AstNode,
    scope: ScopeId,
    rl: ResultLoc,
) -> Lowered {
    let AstNodeKind::ContainerDecl { kind, fields, decls } = &node.kind else {
        return lower_expr(cx, node, scope, rl);
    };
    let loc = node.location.as_ref();
    let name = entity_name(cx, node, scope, kind.tag());

    if *kind == ContainerKind::Opaque && !fields.is_empty() {
        return Err(cx.fail_at(
            DiagnosticKind::InvalidConstruct,
            "opaque types cannot have fields",
            "lower_container_decl",
            &fields[0],
        ));
    }

    let mut seen: FxHashMap<&str, Option<Location>> = FxHashMap::default();
    let mut lowered = Vec::with_capacity(fields.len());
    for field in fields {
        let AstNodeKind::ContainerField { name: field_name, type_expr, default_value } = &field.kind else {
            return Err(cx.fail_at(
                DiagnosticKind::InvalidConstruct,
                format!("expected container field, found {}", field.kind),
                "lower_container_decl",
                field,
            ));
        };
        if let Some(previous) = seen.get(field_name.as_str()) {
            return Err(duplicate(
                cx,
                format!("duplicate {} field: '{}'", kind.tag(), field_name),
                "lower_container_decl",
                field,
                previous.clone(),
                "other field here",
            ));
        }
        seen.insert(field_name, field.location.clone());

        let type_inst = lower_comptime_operand(cx, type_expr.as_deref(), scope)?;
        let default_value = lower_comptime_operand(cx, default_value.as_deref(), scope)?;
        lowered.push(ContainerFieldInst { name: field_name.clone(), type_inst, default_value });
    }

    // Fields and named declarations share one member namespace.
    let mut member_decls = Vec::with_capacity(decls.len());
    for decl in decls {
        let Some(member) = decl.decl_name() else {
            continue;
        };
        if !matches!(decl.kind, AstNodeKind::TestDecl { .. }) {
            if let Some(previous) = seen.get(member) {
                return Err(duplicate(
                    cx,
                    format!("redefinition of '{}'", member),
                    "lower_container_decl",
                    decl,
                    previous.clone(),
                    "previous definition here",
                ));
            }
            seen.insert(member, decl.location.clone());
        }
        member_decls.push(member.to_string());
    }
    let v = cx.emit(
        InstKind::ContainerDecl {
            kind: *kind,
            name: name.full,
            bare_name: name.bare,
            fields: lowered,
            decls: member_decls,
        },
        scope,
        loc,
    );
    Ok(cx.finish_result(v, rl, scope, loc))
}

pub(crate) fn lower_error_set<'a>(
    cx: &mut LoweringContext<'a>,
    node: &'a AstNode,
    scope: ScopeId,
    rl: ResultLoc,
) -> Lowered {
    let AstNodeKind::ErrorSetDecl { members } = &node.kind else {
        return lower_expr(cx, node, scope, rl);
    };
    let loc = node.location.as_ref();
    let name = entity_name(cx, node, scope, "error");

    let mut seen: FxHashMap<String, Option<Location>> = FxHashMap::default();
    let mut names = Vec::with_capacity(members.len());
    for member in members {
        let Some(symbol) = ast_field_to_symbol_node(member) else {
            return Err(cx.fail_at(
                DiagnosticKind::InvalidConstruct,
                format!("expected error set member, found {}", member.kind),
                "lower_error_set",
                member,
            ));
        };
        let AstNodeKind::Symbol { name: member_name } = &symbol.kind else {
            continue;
        };
        if let Some(previous) = seen.get(member_name) {
            return Err(duplicate(
                cx,
                format!("duplicate error set field '{}'", member_name),
                "lower_error_set",
                member,
                previous.clone(),
                "other field here",
            ));
        }
        seen.insert(member_name.clone(), symbol.location.clone());
        names.push(member_name.clone());
    }

    let v = cx.emit(
        InstKind::ErrorSet { name: name.full, bare_name: name.bare, members: names },
        scope,
        loc,
    );
    Ok(cx.finish_result(v, rl, scope, loc))
}

/// `T{ .a = x, .b = y }`. With a result pointer every field is written in
/// place through a field pointer.
pub(crate) fn lower_struct_init<'a>(
    cx: &mut LoweringContext<'a>,
    node: &'a AstNode,
    scope: ScopeId,
    rl: ResultLoc,
) -> Lowered {
    let AstNodeKind::StructInit { type_expr, fields } = &node.kind else {
        return lower_expr(cx, node, scope, rl);
    };
    let loc = node.location.as_ref();
    let type_inst = lower_comptime_operand(cx, type_expr.as_deref(), scope)?;
    let result_ptr = cx.resolve_result_ptr(rl, scope, loc);

    let mut seen: FxHashMap<&str, Option<Location>> = FxHashMap::default();
    let mut values = Vec::with_capacity(fields.len());
    for field in fields {
        if let Some(previous) = seen.get(field.name.as_str()) {
            return Err(duplicate(
                cx,
                format!("duplicate field '{}' in initializer", field.name),
                "lower_struct_init",
                &field.value,
                previous.clone(),
                "other field here",
            ));
        }
        seen.insert(&field.name, field.value.location.clone());

        let field_rl = match result_ptr {
            Some(container) => {
                let ptr = cx.emit_gen(
                    InstKind::FieldPtr { container, field: field.name.clone() },
                    scope,
                    field.value.location.as_ref(),
                );
                ResultLoc::existing(ptr)
            }
            None => no_result_loc(),
        };
        let v = lower_expr(cx, &field.value, scope, field_rl)?;
        values.push((field.name.clone(), v));
    }

    Ok(cx.emit(InstKind::StructInit { type_inst, fields: values, result_ptr }, scope, loc))
}

/// `T{ a, b, c }`, element-wise like `lower_struct_init`.
pub(crate) fn lower_array_init<'a>(
    cx: &mut LoweringContext<'a>,
    node: &'a AstNode,
    scope: ScopeId,
    rl: ResultLoc,
) -> Lowered {
    let AstNodeKind::ArrayInit { type_expr, elements } = &node.kind else {
        return lower_expr(cx, node, scope, rl);
    };
    let loc = node.location.as_ref();
    let type_inst = lower_comptime_operand(cx, type_expr.as_deref(), scope)?;
    let result_ptr = cx.resolve_result_ptr(rl, scope, loc);

    let mut values = Vec::with_capacity(elements.len());
    for (i, element) in elements.iter().enumerate() {
        let elem_rl = match result_ptr {
            Some(array) => {
                let eloc = element.location.as_ref();
                let index = cx.emit_gen(InstKind::Const(ConstValue::Int(i as i64)), scope, eloc);
                let ptr = cx.emit_gen(InstKind::ElemPtr { array, index }, scope, eloc);
                ResultLoc::existing(ptr)
            }
            None => no_result_loc(),
        };
        values.push(lower_expr(cx, element, scope, elem_rl)?);
    }

    Ok(cx.emit(InstKind::ArrayInit { type_inst, elements: values, result_ptr }, scope, loc))
}
