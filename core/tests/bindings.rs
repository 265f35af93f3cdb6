use astgen_core::scope::DeclKind;
use astgen_core::{
    AstgenErrorExt, BindingRequest, ComptimeStatus, DeclTable, DiagnosticKind, Location, ScopeId,
    ScopeKind, ScopeTree,
};
use proptest::prelude::*;

fn loc(line: usize) -> Option<Location> {
    Some(Location::new("b.zig", line, 5))
}

fn setup() -> (ScopeTree, ScopeId, DeclTable) {
    let mut tree = ScopeTree::new();
    let top = tree.top_level("b");
    let f = tree.push_child(top, ScopeKind::FnDef { name: "f".into() });
    let mut decls = DeclTable::new("b");
    decls.insert("global", DeclKind::Const, Some(Location::new("b.zig", 1, 1)), 0);
    (tree, f, decls)
}

#[test]
fn redeclaration_in_nested_scope_points_at_previous() {
    let (mut tree, f, decls) = setup();
    tree.create_local_var(f, BindingRequest::named("x", loc(2)), &decls)
        .expect("first x");
    let inner = tree.push_child(f, ScopeKind::Block { label: None, end_block: None });

    let err = tree
        .create_local_var(inner, BindingRequest::named("x", loc(4)), &decls)
        .expect_err("x is already visible");
    assert_eq!(err.kind(), DiagnosticKind::NameCollision);
    assert_eq!(err.message(), "redeclaration of variable 'x'");
    assert_eq!(err.location(), loc(4));
    assert_eq!(err.notes().len(), 1);
    assert_eq!(err.notes()[0].message(), "previous declaration here");
    assert_eq!(err.notes()[0].location(), loc(2));
}

#[test]
fn shadowable_bindings_may_repeat() {
    let (mut tree, f, decls) = setup();
    let first = BindingRequest::named("it", loc(2)).shadowable(true);
    let second = BindingRequest::named("it", loc(3)).shadowable(true);
    tree.create_local_var(f, first, &decls).expect("first");
    let inner = tree.push_child(f, ScopeKind::Block { label: None, end_block: None });
    assert!(tree.create_local_var(inner, second, &decls).is_ok());

    // a non-shadowable binding still clashes with a shadowable one
    let strict = BindingRequest::named("it", loc(4));
    assert!(tree.create_local_var(inner, strict, &decls).is_err());
}

#[test]
fn primitive_type_names_are_reserved() {
    let (mut tree, f, decls) = setup();
    for name in ["i32", "u7", "bool", "void"] {
        let err = tree
            .create_local_var(f, BindingRequest::named(name, loc(3)), &decls)
            .expect_err("primitive");
        assert_eq!(err.message(), format!("variable shadows primitive type '{}'", name));
        assert_eq!(err.kind(), DiagnosticKind::NameCollision);
    }
    assert!(tree.create_local_var(f, BindingRequest::named("i0x", loc(3)), &decls).is_ok());
}

#[test]
fn top_level_declaration_blocks_local_name() {
    let (mut tree, f, decls) = setup();
    let err = tree
        .create_local_var(f, BindingRequest::named("global", loc(6)), &decls)
        .expect_err("global is declared");
    assert_eq!(err.message(), "redefinition of 'global'");
    assert_eq!(err.notes()[0].message(), "previous definition here");
    assert_eq!(err.notes()[0].location(), Some(Location::new("b.zig", 1, 1)));
}

#[test]
fn request_fields_are_recorded() {
    let (mut tree, f, decls) = setup();
    let req = BindingRequest::named("n", loc(2))
        .constness(false, true)
        .comptime(ComptimeStatus::Known(true));
    let id = tree.create_local_var(f, req, &decls).expect("fresh");

    let var = tree.var(id);
    assert_eq!(var.name.as_deref(), Some("n"));
    assert_eq!(var.scope, f);
    assert!(!var.src_is_const);
    assert!(var.gen_is_const);
    assert!(var.comptime.is_known_comptime());
    assert_eq!(tree.scope(f).vars, vec![id]);
}

proptest! {
    #[test]
    fn synthesized_bindings_never_collide(
        names in proptest::collection::vec(prop_oneof![
            Just(None::<String>),
            Just(Some("i32".to_string())),
            Just(Some("global".to_string())),
            "[a-z]{1,3}".prop_map(Some),
        ], 1..30)
    ) {
        let (mut tree, f, decls) = setup();
        let mut scope = f;
        for (i, name) in names.iter().enumerate() {
            if i % 3 == 0 {
                scope = tree.push_child(scope, ScopeKind::Block { label: None, end_block: None });
            }
            let req = BindingRequest::synthesized(name.clone(), None);
            prop_assert!(tree.create_local_var(scope, req, &decls).is_ok());
        }
        prop_assert_eq!(tree.vars().len(), names.len());
    }
}
