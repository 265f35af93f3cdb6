#![allow(dead_code)]

use astgen_core::ast::{
    AstNode, AstNodeKind, BinaryOperator, CallModifier, ContainerKind, DeferKind, FieldInit,
};
use astgen_core::config::LowerOptions;
use astgen_core::ir::{GeneratedUnit, InstKind, ModuleOutput, generate_module};
use astgen_core::location::Location;
use astgen_core::{DiagnosticKind, ErrorMsg};

pub const FILE: &str = "test.zig";

pub fn loc(line: usize, column: usize) -> Location {
    Location::new(FILE, line, column)
}

pub fn node(kind: AstNodeKind) -> AstNode {
    AstNode::new(kind, None, None)
}

pub fn at(kind: AstNodeKind, line: usize, column: usize) -> AstNode {
    AstNode::new(kind, Some(loc(line, column)), None)
}

pub fn sym(name: &str) -> AstNode {
    node(AstNodeKind::Symbol { name: name.to_string() })
}

pub fn int(value: i64) -> AstNode {
    node(AstNodeKind::IntLiteral { value })
}

pub fn boolean(value: bool) -> AstNode {
    node(AstNodeKind::BoolLiteral { value })
}

pub fn var_decl(name: &str, is_const: bool, init: AstNode) -> AstNodeKind {
    AstNodeKind::VarDecl {
        name: name.to_string(),
        is_const,
        is_comptime: false,
        type_expr: None,
        init: Some(Box::new(init)),
    }
}

pub fn var(name: &str, init: AstNode) -> AstNode {
    node(var_decl(name, false, init))
}

pub fn konst(name: &str, init: AstNode) -> AstNode {
    node(var_decl(name, true, init))
}

pub fn block(statements: Vec<AstNode>) -> AstNode {
    node(AstNodeKind::Block { label: None, statements })
}

pub fn labeled(label: &str, statements: Vec<AstNode>) -> AstNode {
    node(AstNodeKind::Block { label: Some(label.to_string()), statements })
}

pub fn param(name: &str) -> AstNode {
    node(AstNodeKind::Param { name: Some(name.to_string()), type_expr: Some(Box::new(sym("i32"))), is_comptime: false })
}

pub fn func(name: &str, params: Vec<AstNode>, statements: Vec<AstNode>) -> AstNode {
    node(AstNodeKind::FnDecl {
        name: name.to_string(),
        params,
        return_type: None,
        body: Some(Box::new(block(statements))),
        is_inline: false,
        is_export: false,
    })
}

pub fn test_decl(name: &str, statements: Vec<AstNode>) -> AstNode {
    node(AstNodeKind::TestDecl { name: Some(name.to_string()), body: Box::new(block(statements)) })
}

pub fn root(decls: Vec<AstNode>) -> AstNode {
    node(AstNodeKind::Root { name: "test".to_string(), decls })
}

pub fn call(callee: &str, args: Vec<AstNode>) -> AstNode {
    call_with(callee, args, CallModifier::Auto)
}

pub fn call_with(callee: &str, args: Vec<AstNode>, modifier: CallModifier) -> AstNode {
    node(AstNodeKind::Call { callee: Box::new(sym(callee)), args, modifier })
}

pub fn builtin(name: &str, args: Vec<AstNode>) -> AstNode {
    node(AstNodeKind::BuiltinCall { name: name.to_string(), args })
}

pub fn ret(value: Option<AstNode>) -> AstNode {
    node(AstNodeKind::Return { value: value.map(Box::new) })
}

pub fn assign(target: AstNode, value: AstNode) -> AstNode {
    node(AstNodeKind::Assign { target: Box::new(target), value: Box::new(value) })
}

pub fn binop(op: BinaryOperator, lhs: AstNode, rhs: AstNode) -> AstNode {
    node(AstNodeKind::BinaryOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs) })
}

pub fn defer(kind: DeferKind, expr: AstNode) -> AstNode {
    node(AstNodeKind::Defer { kind, expr: Box::new(expr) })
}

pub fn comptime(expr: AstNode) -> AstNode {
    node(AstNodeKind::Comptime { expr: Box::new(expr) })
}

pub fn try_(expr: AstNode) -> AstNode {
    node(AstNodeKind::Try { expr: Box::new(expr) })
}

pub fn brk(label: Option<&str>, value: Option<AstNode>) -> AstNode {
    node(AstNodeKind::Break { label: label.map(str::to_string), value: value.map(Box::new) })
}

pub fn cont(label: Option<&str>) -> AstNode {
    node(AstNodeKind::Continue { label: label.map(str::to_string) })
}

pub fn while_loop(label: Option<&str>, condition: AstNode, body: Vec<AstNode>) -> AstNode {
    node(AstNodeKind::While {
        label: label.map(str::to_string),
        condition: Box::new(condition),
        payload: None,
        continue_expr: None,
        body: Box::new(block(body)),
        else_branch: None,
        is_inline: false,
    })
}

pub fn if_else(condition: AstNode, then_branch: AstNode, else_branch: Option<AstNode>) -> AstNode {
    node(AstNodeKind::If {
        condition: Box::new(condition),
        payload: None,
        then_branch: Box::new(then_branch),
        else_branch: else_branch.map(Box::new),
    })
}

pub fn field(name: &str, type_name: &str) -> AstNode {
    node(AstNodeKind::ContainerField {
        name: name.to_string(),
        type_expr: Some(Box::new(sym(type_name))),
        default_value: None,
    })
}

pub fn container(kind: ContainerKind, fields: Vec<AstNode>) -> AstNode {
    node(AstNodeKind::ContainerDecl { kind, fields, decls: Vec::new() })
}

pub fn container_with(kind: ContainerKind, fields: Vec<AstNode>, decls: Vec<AstNode>) -> AstNode {
    node(AstNodeKind::ContainerDecl { kind, fields, decls })
}

pub fn error_set(members: Vec<AstNode>) -> AstNode {
    node(AstNodeKind::ErrorSetDecl { members })
}

pub fn struct_init(type_name: &str, fields: Vec<(&str, AstNode)>) -> AstNode {
    node(AstNodeKind::StructInit {
        type_expr: Some(Box::new(sym(type_name))),
        fields: fields.into_iter().map(|(name, value)| FieldInit { name: name.to_string(), value }).collect(),
    })
}

pub fn options() -> LowerOptions {
    LowerOptions::default().sequential()
}

pub fn lower(root: &AstNode) -> ModuleOutput {
    generate_module(root, &options())
}

pub fn lower_with(root: &AstNode, options: &LowerOptions) -> ModuleOutput {
    generate_module(root, options)
}

/// Lowers a single function `f` with the given body and returns its unit.
pub fn lower_fn(statements: Vec<AstNode>) -> GeneratedUnit {
    let out = lower(&root(vec![func("f", vec![], statements)]));
    out.unit("f").cloned().expect("unit f")
}

pub fn inst_names(unit: &GeneratedUnit) -> Vec<&'static str> {
    unit.stream.instructions().iter().map(|i| i.kind.name()).collect()
}

pub fn count(unit: &GeneratedUnit, name: &str) -> usize {
    inst_names(unit).into_iter().filter(|n| *n == name).count()
}

pub fn errors(unit: &GeneratedUnit) -> Vec<&ErrorMsg> {
    unit.stream.errors().iter().collect()
}

pub fn first_error(unit: &GeneratedUnit) -> &ErrorMsg {
    unit.stream.terminal_diagnostic().expect("unit is poisoned")
}

pub fn warnings_of(unit: &GeneratedUnit, kind: DiagnosticKind) -> usize {
    unit.stream.diagnostics().iter().filter(|d| d.kind() == kind).count()
}

pub fn builtin_calls<'u>(unit: &'u GeneratedUnit) -> Vec<(&'u str, usize)> {
    unit.stream
        .instructions()
        .iter()
        .filter_map(|i| match &i.kind {
            InstKind::BuiltinCall { name, .. } => Some((name.as_str(), i.id.0)),
            _ => None,
        })
        .collect()
}
