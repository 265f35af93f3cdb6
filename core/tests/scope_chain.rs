use astgen_core::ast::DeferKind;
use astgen_core::scope::{JumpTarget, Resolved};
use astgen_core::{BindingRequest, DeclTable, ScopeId, ScopeKind, ScopeTree};
use proptest::prelude::*;

fn fn_scope() -> (ScopeTree, ScopeId) {
    let mut tree = ScopeTree::new();
    let top = tree.top_level("main");
    let f = tree.push_child(top, ScopeKind::FnDef { name: "f".into() });
    (tree, f)
}

fn loop_kind(label: Option<&str>) -> ScopeKind {
    ScopeKind::Loop {
        label: label.map(str::to_string),
        break_block: astgen_core::ir::BlockId(1),
        continue_block: astgen_core::ir::BlockId(2),
    }
}

#[test]
fn comptime_ancestor_forces_every_descendant() {
    let (mut tree, f) = fn_scope();
    let block = tree.push_child(f, ScopeKind::Block { label: None, end_block: None });
    assert!(!tree.is_forced_comptime(block));

    let ct = tree.push_child(block, ScopeKind::Comptime);
    let inner = tree.push_child(ct, ScopeKind::Block { label: None, end_block: None });
    let deeper = tree.push_child(inner, loop_kind(None));
    assert!(tree.is_forced_comptime(ct));
    assert!(tree.is_forced_comptime(deeper));
    assert!(!tree.is_forced_comptime(block));
}

#[test]
fn container_scopes_resolve_member_declarations() {
    use astgen_core::ast::{AstNode, AstNodeKind, ContainerKind};

    let n = |kind| AstNode::new(kind, None, None);
    let h = n(AstNodeKind::FnDecl {
        name: "h".into(),
        params: vec![],
        return_type: None,
        body: None,
        is_inline: false,
        is_export: false,
    });
    let s = n(AstNodeKind::VarDecl {
        name: "S".into(),
        is_const: true,
        is_comptime: false,
        type_expr: None,
        init: Some(Box::new(n(AstNodeKind::ContainerDecl {
            kind: ContainerKind::Struct,
            fields: vec![],
            decls: vec![h],
        }))),
    });
    let root = n(AstNodeKind::Root { name: "main".into(), decls: vec![s] });
    let (decls, errors) = DeclTable::from_root(&root);
    assert!(errors.is_empty());
    let member = decls.get("S.h").expect("member recorded").id;
    assert_eq!(decls.containers_of(member), vec!["S"]);
    assert!(decls.get("h").is_none());

    let mut tree = ScopeTree::new();
    let top = tree.top_level("main");
    let container = tree.push_child(top, ScopeKind::Container { path: "S".into() });
    let g = tree.push_child(container, ScopeKind::FnDef { name: "S.g".into() });
    assert_eq!(tree.lookup(g, "h", &decls), Some(Resolved::Decl(member)));
    assert_eq!(tree.lookup(top, "h", &decls), None);
    assert_eq!(tree.break_target(container, None), JumpTarget::NotInLoop);
}

#[test]
fn lookup_falls_back_to_declarations() {
    let (mut tree, f) = fn_scope();
    let mut decls = DeclTable::new("main");
    let decl = decls.insert("helper", astgen_core::scope::DeclKind::Fn, None, 0);

    assert_eq!(tree.lookup(f, "helper", &decls), Some(Resolved::Decl(decl)));
    assert_eq!(tree.lookup(f, "missing", &decls), None);

    let local = tree
        .create_local_var(f, BindingRequest::named("x", None), &decls)
        .expect("fresh name");
    let block = tree.push_child(f, ScopeKind::Block { label: None, end_block: None });
    assert_eq!(tree.lookup(block, "x", &decls), Some(Resolved::Var(local)));
}

#[test]
fn sibling_scopes_do_not_see_each_other() {
    let (mut tree, f) = fn_scope();
    let decls = DeclTable::new("main");
    let a = tree.push_child(f, ScopeKind::Block { label: None, end_block: None });
    let b = tree.push_child(f, ScopeKind::Block { label: None, end_block: None });
    tree.create_local_var(a, BindingRequest::named("x", None), &decls)
        .expect("fresh name");

    assert!(tree.lookup(b, "x", &decls).is_none());
    // same name in a sibling is not a redeclaration
    assert!(tree.create_local_var(b, BindingRequest::named("x", None), &decls).is_ok());
}

#[test]
fn break_finds_innermost_loop_or_label() {
    let (mut tree, f) = fn_scope();
    let outer = tree.push_child(f, loop_kind(Some("outer")));
    let inner = tree.push_child(outer, loop_kind(None));
    let body = tree.push_child(inner, ScopeKind::Block { label: None, end_block: None });

    assert_eq!(tree.break_target(body, None), JumpTarget::Found(inner));
    assert_eq!(tree.break_target(body, Some("outer")), JumpTarget::Found(outer));
    assert_eq!(tree.continue_target(body, Some("outer")), JumpTarget::Found(outer));
    assert_eq!(tree.break_target(body, Some("nope")), JumpTarget::UnknownLabel("nope".into()));
    assert_eq!(tree.break_target(f, None), JumpTarget::NotInLoop);
}

#[test]
fn jumps_stop_at_function_boundary() {
    let (mut tree, f) = fn_scope();
    let lp = tree.push_child(f, loop_kind(Some("l")));
    let nested_fn = tree.push_child(lp, ScopeKind::FnDef { name: "g".into() });

    assert_eq!(tree.break_target(nested_fn, None), JumpTarget::NotInLoop);
    assert_eq!(tree.break_target(nested_fn, Some("l")), JumpTarget::UnknownLabel("l".into()));
}

#[test]
fn jump_out_of_deferred_expression_is_reported() {
    let (mut tree, f) = fn_scope();
    let lp = tree.push_child(f, loop_kind(None));
    let expr = tree.push_child(lp, ScopeKind::DeferExpr);

    assert_eq!(tree.break_target(expr, None), JumpTarget::CrossesDefer);
    assert!(tree.in_defer_expr(expr));
    assert!(!tree.in_defer_expr(lp));
}

#[test]
fn defers_stop_at_target_and_skip_unrelated_scopes() {
    let (mut tree, f) = fn_scope();
    let d0 = tree.push_child(f, ScopeKind::Defer { kind: DeferKind::Normal });
    let lp = tree.push_child(d0, loop_kind(None));
    let d1 = tree.push_child(lp, ScopeKind::Defer { kind: DeferKind::Error });
    let d2 = tree.push_child(d1, ScopeKind::Defer { kind: DeferKind::Normal });

    assert_eq!(
        tree.defers_until(d2, Some(lp)),
        vec![(d2, DeferKind::Normal), (d1, DeferKind::Error)]
    );
    assert_eq!(tree.defers_until(d2, None).len(), 3);
    assert!(tree.defers_until(lp, Some(lp)).is_empty());
}

#[test]
fn namespace_and_enclosing_function() {
    let (mut tree, f) = fn_scope();
    let block = tree.push_child(f, ScopeKind::Suspend);
    assert_eq!(tree.namespace(block), Some("main"));
    assert_eq!(tree.enclosing_fn(block), Some(f));
    assert!(tree.in_suspend(block));
    assert!(!tree.in_suspend(f));
}

/// Random scope kinds used to grow a tree; `true` marks a comptime scope.
fn kind_strategy() -> impl Strategy<Value = (usize, bool)> {
    (any::<usize>(), any::<bool>())
}

proptest! {
    #[test]
    fn forced_comptime_is_monotonic(steps in proptest::collection::vec(kind_strategy(), 1..40)) {
        let (mut tree, f) = fn_scope();
        let mut ids = vec![f];
        for (pick, comptime) in steps {
            let parent = ids[pick % ids.len()];
            let kind = if comptime {
                ScopeKind::Comptime
            } else {
                ScopeKind::Block { label: None, end_block: None }
            };
            ids.push(tree.push_child(parent, kind));
        }

        for &id in &ids {
            let forced = tree.is_forced_comptime(id);
            let any_ancestor = tree.chain(id).any(|s| matches!(s.kind, ScopeKind::Comptime));
            prop_assert_eq!(forced, any_ancestor);
            if let Some(parent) = tree.scope(id).parent {
                if tree.is_forced_comptime(parent) {
                    prop_assert!(forced);
                }
                prop_assert!(parent < id);
            }
        }
    }
}
