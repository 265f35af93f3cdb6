mod common;

use astgen_core::ast::{AstNodeKind, BinaryOperator, CallModifier, ContainerKind};
use astgen_core::ir::InstStream;
use astgen_core::{
    AstgenErrorExt, CallStack, DiagnosticKind, ErrorMsg, ErrorPolicy, Frame, Location,
    add_call_stack_errors,
};
use common::*;
use proptest::prelude::*;

fn boom() -> ErrorMsg {
    ErrorMsg::with(DiagnosticKind::InvalidConstruct, "boom", "test", Some(loc(1, 1)), None)
}

fn stack_of(depth: usize) -> CallStack {
    CallStack::from_frames(
        (1..=depth)
            .map(|line| Frame::new(Some(loc(line, 1)), format!("call {}", line)))
            .collect(),
    )
}

proptest! {
    #[test]
    fn call_stack_is_truncated_most_recent_first(depth in 0usize..40, limit in 0usize..40) {
        let mut msg = boom();
        add_call_stack_errors(&mut msg, &stack_of(depth), limit);

        let frames = msg.call_stack();
        prop_assert_eq!(frames.len(), depth.min(limit));
        for (i, frame) in frames.iter().enumerate() {
            prop_assert_eq!(frame.location.clone(), Some(loc(depth - i, 1)));
            prop_assert_eq!(frame.description.as_str(), "called from here");
        }
    }
}

#[test]
fn empty_stack_leaves_message_untouched() {
    let mut msg = boom();
    let before = msg.clone();
    add_call_stack_errors(&mut msg, &CallStack::new(), 10);
    assert_eq!(msg, before);
}

#[test]
fn poisoning_keeps_first_error() {
    let mut stream = InstStream::new("u", false);
    assert!(!stream.is_poisoned());

    stream.invalidate(boom());
    let second = ErrorMsg::with(DiagnosticKind::UnresolvedName, "later", "test", None, None);
    stream.invalidate(second);

    assert!(stream.is_poisoned());
    assert_eq!(stream.errors().len(), 2);
    assert_eq!(stream.terminal_diagnostic().map(|e| e.message()), Some("boom".to_string()));
}

#[test]
fn poisoned_child_poisons_parent() {
    let mut parent = InstStream::new("p", false);
    let mut child = InstStream::new("p.comptime", true);
    child.invalidate(boom());
    parent.add_child(child);
    assert!(parent.is_poisoned());
    assert_eq!(parent.terminal_diagnostic(), Some(&boom()));
    // child errors are reported once
    assert_eq!(parent.diagnostics().len(), 1);
}

#[test]
fn failure_in_comptime_block_carries_frame() {
    let unit = lower_fn(vec![at(comptime(block(vec![builtin("nope", vec![])])).kind, 4, 3)]);
    let err = first_error(&unit);
    assert_eq!(err.kind(), DiagnosticKind::UnresolvedName);
    assert_eq!(err.message(), "invalid builtin function: '@nope'");
    assert_eq!(err.call_stack().len(), 1);
    assert_eq!(err.call_stack()[0].location, Some(loc(4, 3)));
}

#[test]
fn call_stack_limit_applies_to_lowering() {
    let mut options = options();
    options.call_stack_limit = 0;
    let root = root(vec![func("f", vec![], vec![at(comptime(block(vec![builtin("nope", vec![])])).kind, 4, 3)])]);
    let out = lower_with(&root, &options);
    assert!(first_error(out.unit("f").expect("unit f")).call_stack().is_empty());
}

#[test]
fn builtin_arity_is_checked() {
    let unit = lower_fn(vec![builtin("sizeOf", vec![])]);
    let err = first_error(&unit);
    assert_eq!(err.kind(), DiagnosticKind::InvalidConstruct);
    assert_eq!(err.message(), "expected 1 argument(s), found 0");

    let unit = lower_fn(vec![builtin("@compileLog", vec![int(1), int(2), int(3)])]);
    assert!(!unit.is_poisoned());
    assert_eq!(builtin_calls(&unit).len(), 1);
    assert_eq!(builtin_calls(&unit)[0].0, "compileLog");
}

#[test]
fn undeclared_identifier() {
    let unit = lower_fn(vec![konst("y", sym("zzz"))]);
    let err = first_error(&unit);
    assert_eq!(err.kind(), DiagnosticKind::UnresolvedName);
    assert_eq!(err.message(), "use of undeclared identifier 'zzz'");
}

#[test]
fn inline_assembly_in_comptime() {
    let asm = node(AstNodeKind::Asm { template: "nop".into(), is_volatile: true });
    let unit = lower_fn(vec![comptime(asm)]);
    assert_eq!(first_error(&unit).kind(), DiagnosticKind::ForcedComptimeViolation);
    assert_eq!(first_error(&unit).message(), "unable to evaluate inline assembly at compile time");
}

#[test]
fn runtime_assembly_is_kept() {
    let asm = node(AstNodeKind::Asm { template: "nop".into(), is_volatile: true });
    let unit = lower_fn(vec![asm]);
    assert!(!unit.is_poisoned());
    assert_eq!(count(&unit, "asm"), 1);
    assert_eq!(warnings_of(&unit, DiagnosticKind::NoEffect), 0);
}

#[test]
fn never_inline_call_in_comptime() {
    let out = lower(&root(vec![
        func("g", vec![], vec![]),
        func("f", vec![], vec![comptime(call_with("g", vec![], CallModifier::NeverInline))]),
    ]));
    let err = first_error(out.unit("f").expect("unit f"));
    assert_eq!(err.kind(), DiagnosticKind::ForcedComptimeViolation);
    assert_eq!(err.message(), "unable to perform 'never_inline' call at compile time");
}

#[test]
fn suspend_rules() {
    let suspend = |body| node(AstNodeKind::Suspend { body });

    let unit = lower_fn(vec![suspend(None)]);
    assert!(!unit.is_poisoned());
    assert_eq!(count(&unit, "suspend_begin"), 1);
    assert_eq!(count(&unit, "suspend_finish"), 1);

    let unit = lower_fn(vec![comptime(suspend(None))]);
    assert_eq!(first_error(&unit).message(), "unable to evaluate suspend at compile time");

    let unit = lower_fn(vec![suspend(Some(Box::new(block(vec![suspend(None)]))))]);
    assert_eq!(first_error(&unit).message(), "cannot suspend inside suspend block");

    let out = lower(&root(vec![comptime(block(vec![suspend(None)]))]));
    assert_eq!(first_error(&out.units[0]).message(), "suspend outside function definition");
}

#[test]
fn opaque_type_with_fields() {
    let unit = lower_fn(vec![assign(sym("_"), container(ContainerKind::Opaque, vec![field("x", "i32")]))]);
    assert_eq!(first_error(&unit).message(), "opaque types cannot have fields");
}

#[test]
fn duplicate_container_field_points_at_first() {
    let fields = vec![
        at(AstNodeKind::ContainerField { name: "x".into(), type_expr: Some(Box::new(sym("i32"))), default_value: None }, 2, 5),
        at(AstNodeKind::ContainerField { name: "x".into(), type_expr: Some(Box::new(sym("u8"))), default_value: None }, 3, 5),
    ];
    let unit = lower_fn(vec![assign(sym("_"), container(ContainerKind::Struct, fields))]);
    let err = first_error(&unit);
    assert_eq!(err.kind(), DiagnosticKind::NameCollision);
    assert_eq!(err.message(), "duplicate struct field: 'x'");
    assert_eq!(err.location(), Some(loc(3, 5)));
    assert_eq!(err.notes()[0].message(), "other field here");
    assert_eq!(err.notes()[0].location(), Some(loc(2, 5)));
}

#[test]
fn duplicate_error_set_member() {
    let members = vec![
        at(AstNodeKind::Symbol { name: "OutOfMemory".into() }, 1, 20),
        at(AstNodeKind::ContainerField { name: "OutOfMemory".into(), type_expr: None, default_value: None }, 1, 33),
    ];
    let out = lower(&root(vec![konst("E", error_set(members))]));
    let err = first_error(out.unit("E").expect("unit E"));
    assert_eq!(err.message(), "duplicate error set field 'OutOfMemory'");
    assert_eq!(err.notes()[0].location(), Some(loc(1, 20)));
}

#[test]
fn duplicate_struct_init_field() {
    let out = lower(&root(vec![
        konst("P", container(ContainerKind::Struct, vec![field("x", "i32")])),
        func("f", vec![], vec![konst("p", struct_init("P", vec![("x", int(1)), ("x", int(2))]))]),
    ]));
    let err = first_error(out.unit("f").expect("unit f"));
    assert_eq!(err.message(), "duplicate field 'x' in initializer");
}

#[test]
fn nesting_limit_is_enforced() {
    let mut options = options();
    options.max_depth = 3;
    let mut expr = int(0);
    for i in 0..5 {
        expr = binop(BinaryOperator::Add, expr, int(i));
    }
    let out = lower_with(&root(vec![konst("deep", expr)]), &options);
    let err = first_error(out.unit("deep").expect("unit deep"));
    assert_eq!(err.kind(), DiagnosticKind::RecursionLimitExceeded);
    assert_eq!(err.message(), "expression nesting exceeds the limit of 3");
}

#[test]
fn continue_policy_reports_every_statement() {
    let body = || vec![brk(None, None), cont(None)];

    let unit = lower_fn(body());
    assert_eq!(errors(&unit).len(), 1);

    let continuing = options().with_error_policy(ErrorPolicy::Continue);
    let out = lower_with(&root(vec![func("f", vec![], body())]), &continuing);
    let unit = out.unit("f").expect("unit f");
    assert!(unit.is_poisoned());
    let messages: Vec<String> = errors(unit).iter().map(|e| e.message()).collect();
    assert_eq!(messages, vec!["break expression outside loop", "continue expression outside loop"]);
    assert_eq!(first_error(unit).message(), "break expression outside loop");
}

#[test]
fn failed_declaration_does_not_cascade() {
    let continuing = options().with_error_policy(ErrorPolicy::Continue);
    let body = vec![
        var("x", sym("nope")),
        call("g", vec![sym("x")]),
        assign(sym("x"), int(2)),
        var("y", int(1)),
        call("g", vec![sym("y")]),
    ];
    let out = lower_with(&root(vec![func("g", vec![param("a")], vec![]), func("f", vec![], body)]), &continuing);
    let unit = out.unit("f").expect("unit f");

    let messages: Vec<String> = errors(unit).iter().map(|e| e.message()).collect();
    assert_eq!(messages, vec!["use of undeclared identifier 'nope'"]);
    // statements that do not depend on `x` are still lowered
    assert_eq!(count(unit, "decl_var"), 1);
    assert_eq!(count(unit, "call"), 1);
}

#[test]
fn error_report_format() {
    let msg = ErrorMsg::with(
        DiagnosticKind::NameCollision,
        "redefinition of 'x'",
        "decl-table",
        Some(Location::new("m.zig", 2, 1)),
        None,
    );
    let report = astgen_core::generate_error_report(&msg);
    assert!(report.starts_with("ASTGEN | ERROR"), "{}", report);
    assert!(report.contains("redefinition of 'x'"), "{}", report);
}
