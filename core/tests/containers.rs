mod common;

use astgen_core::ast::{AstNodeKind, ContainerKind};
use astgen_core::ir::InstKind;
use astgen_core::{AstgenErrorExt, DiagnosticKind, GeneratedUnit, UnitKind};
use common::*;

fn unit_names(out: &astgen_core::ModuleOutput) -> Vec<&str> {
    out.units.iter().map(|u| u.name.as_str()).collect()
}

fn decl_refs(unit: &GeneratedUnit) -> Vec<&str> {
    unit.stream
        .instructions()
        .iter()
        .filter_map(|i| match &i.kind {
            InstKind::DeclRef { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect()
}

#[test]
fn member_functions_are_lowered_as_units() {
    let s = container_with(ContainerKind::Struct, vec![], vec![func("g", vec![], vec![call("nope", vec![])])]);
    let out = lower(&root(vec![konst("S", s)]));

    assert_eq!(unit_names(&out), vec!["S", "S.g"]);
    assert_eq!(out.unit("S.g").map(|u| u.kind), Some(UnitKind::Function));
    assert!(out.is_poisoned());
    assert!(!out.unit("S").expect("unit S").is_poisoned());

    let err = first_error(out.unit("S.g").expect("unit S.g"));
    assert_eq!(err.kind(), DiagnosticKind::UnresolvedName);
    assert_eq!(err.message(), "use of undeclared identifier 'nope'");
    assert_eq!(out.diagnostics.len(), 1);
}

#[test]
fn members_see_enclosing_containers() {
    let inner = container_with(ContainerKind::Struct, vec![], vec![func("k", vec![], vec![call("g", vec![])])]);
    let s = container_with(
        ContainerKind::Struct,
        vec![field("x", "i32")],
        vec![
            func("g", vec![], vec![call("h", vec![])]),
            func("h", vec![], vec![]),
            konst("Inner", inner),
        ],
    );
    let out = lower(&root(vec![konst("S", s), func("main", vec![], vec![call("h", vec![])])]));

    assert_eq!(unit_names(&out), vec!["S", "S.g", "S.h", "S.Inner", "S.Inner.k", "main"]);
    assert_eq!(out.unit("S.Inner").map(|u| u.kind), Some(UnitKind::TopLevel));
    assert_eq!(decl_refs(out.unit("S.g").expect("unit S.g")), vec!["h"]);
    assert_eq!(decl_refs(out.unit("S.Inner.k").expect("unit S.Inner.k")), vec!["g"]);

    // members are not visible outside their container
    let main = out.unit("main").expect("unit main");
    assert_eq!(first_error(main).message(), "use of undeclared identifier 'h'");
    assert_eq!(out.units.iter().filter(|u| u.is_poisoned()).count(), 1);
}

#[test]
fn nested_container_is_named_by_its_path() {
    let inner = container_with(ContainerKind::Enum, vec![], vec![]);
    let s = container_with(ContainerKind::Struct, vec![], vec![konst("Inner", inner)]);
    let out = lower(&root(vec![konst("S", s)]));

    let names: Vec<String> = out
        .unit("S.Inner")
        .expect("unit S.Inner")
        .stream
        .instructions()
        .iter()
        .filter_map(|i| match &i.kind {
            InstKind::ContainerDecl { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(names, vec!["test.S.Inner"]);
}

#[test]
fn local_cannot_reuse_member_name() {
    let s = container_with(
        ContainerKind::Struct,
        vec![],
        vec![at(func("h", vec![], vec![]).kind, 4, 5), func("g", vec![], vec![var("h", int(1))])],
    );
    let out = lower(&root(vec![konst("S", s)]));
    let err = first_error(out.unit("S.g").expect("unit S.g"));
    assert_eq!(err.kind(), DiagnosticKind::NameCollision);
    assert_eq!(err.message(), "redefinition of 'h'");
    assert_eq!(err.notes()[0].location(), Some(loc(4, 5)));
}

#[test]
fn duplicate_member_functions() {
    let s = container_with(
        ContainerKind::Struct,
        vec![],
        vec![at(func("g", vec![], vec![]).kind, 2, 5), at(func("g", vec![], vec![]).kind, 3, 5)],
    );
    let out = lower(&root(vec![konst("S", s)]));

    let err = first_error(out.unit("S").expect("unit S"));
    assert_eq!(err.kind(), DiagnosticKind::NameCollision);
    assert_eq!(err.message(), "redefinition of 'g'");
    assert_eq!(err.location(), Some(loc(3, 5)));
    assert_eq!(err.notes()[0].message(), "previous definition here");
    assert_eq!(err.notes()[0].location(), Some(loc(2, 5)));
    // only the first definition becomes a unit
    assert_eq!(unit_names(&out), vec!["S", "S.g"]);
}

#[test]
fn member_declaration_clashes_with_field() {
    let g_field = at(
        AstNodeKind::ContainerField { name: "g".into(), type_expr: Some(Box::new(sym("u8"))), default_value: None },
        2,
        5,
    );
    let s = container_with(ContainerKind::Struct, vec![g_field], vec![at(func("g", vec![], vec![]).kind, 3, 5)]);
    let out = lower(&root(vec![konst("S", s)]));

    let err = first_error(out.unit("S").expect("unit S"));
    assert_eq!(err.message(), "redefinition of 'g'");
    assert_eq!(err.notes()[0].location(), Some(loc(2, 5)));
}

#[test]
fn tests_inside_containers_do_not_clash_with_members() {
    let s = container_with(
        ContainerKind::Struct,
        vec![],
        vec![func("g", vec![], vec![]), test_decl("g", vec![call("g", vec![])])],
    );
    let out = lower(&root(vec![konst("S", s)]));
    assert!(!out.is_poisoned(), "{:?}", out.diagnostics);
    assert_eq!(out.unit("S.g").map(|u| u.kind), Some(UnitKind::Function));
    assert_eq!(out.units.iter().filter(|u| u.kind == UnitKind::Test).count(), 1);
}
