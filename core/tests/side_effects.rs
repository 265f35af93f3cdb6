mod common;

use astgen_core::ast::{AstNode, BinaryOperator, CallModifier, DeferKind};
use astgen_core::ir::{BlockId, ConstValue, InstId, InstStream};
use astgen_core::{InstKind, has_side_effects};
use common::*;
use proptest::prelude::*;

fn id(n: usize) -> InstId {
    InstId(n)
}

#[test]
fn classification_table() {
    let effectful = [
        InstKind::StorePtr { ptr: id(0), value: id(1) },
        InstKind::Call { callee: id(0), args: vec![], modifier: CallModifier::Auto, result_ptr: None },
        InstKind::Br { target: BlockId(1) },
        InstKind::Return { operand: None },
        InstKind::Unreachable,
        InstKind::BuiltinCall { name: "compileLog".into(), args: vec![] },
        InstKind::Asm { template: "nop".into(), is_volatile: true },
        InstKind::UnwrapErrPayload { value: id(0), safety_check: true },
        InstKind::StructInit { type_inst: None, fields: vec![], result_ptr: Some(id(2)) },
        InstKind::ComptimeBlock { unit: 0 },
    ];
    for kind in &effectful {
        assert!(has_side_effects(kind), "{} should be effectful", kind.name());
    }

    let pure = [
        InstKind::Const(ConstValue::Int(1)),
        InstKind::LoadPtr { ptr: id(0) },
        InstKind::BinOp { op: BinaryOperator::Add, lhs: id(0), rhs: id(1) },
        InstKind::FieldPtr { container: id(0), field: "x".into() },
        InstKind::BuiltinCall { name: "sizeOf".into(), args: vec![id(0)] },
        InstKind::Asm { template: "nop".into(), is_volatile: false },
        InstKind::UnwrapErrPayload { value: id(0), safety_check: false },
        InstKind::StructInit { type_inst: None, fields: vec![], result_ptr: None },
        InstKind::Phi { incoming: vec![(BlockId(0), id(0))] },
        InstKind::IsErr { value: id(0) },
    ];
    for kind in &pure {
        assert!(!has_side_effects(kind), "{} should be pure", kind.name());
    }
}

#[test]
fn classification_ignores_position() {
    let mut a = InstStream::new("a", false);
    let mut b = InstStream::new("b", true);
    let scope = astgen_core::ScopeId(0);
    a.append(InstKind::Const(ConstValue::Void), scope, None, false, false);
    for _ in 0..3 {
        b.append(InstKind::Const(ConstValue::Bool(true)), scope, None, true, true);
    }
    let kind = InstKind::LoadPtr { ptr: id(0) };
    let ia = a.append(kind.clone(), scope, None, false, false);
    let ib = b.append(kind, scope, None, true, true);
    assert_ne!(ia, ib);
    assert_eq!(
        has_side_effects(&a.inst(ia).kind),
        has_side_effects(&b.inst(ib).kind)
    );
}

/// Small statement vocabulary over a parameter `p` and a callee `g`.
fn statement(choice: u8, i: usize) -> AstNode {
    match choice % 10 {
        0 => call("g", vec![]),
        1 => var(&format!("v{}", i), binop(BinaryOperator::Mul, sym("p"), int(i as i64))),
        2 => if_else(sym("p"), call("g", vec![]), None),
        3 => while_loop(None, sym("p"), vec![brk(None, None)]),
        4 => defer(DeferKind::Normal, call("g", vec![])),
        5 => defer(DeferKind::Error, call("g", vec![])),
        6 => comptime(block(vec![call("g", vec![])])),
        7 => konst(&format!("t{}", i), try_(call("g", vec![]))),
        8 => konst(
            &format!("l{}", i),
            labeled(&format!("blk{}", i), vec![brk(Some(&format!("blk{}", i)), Some(int(1)))]),
        ),
        _ => ret(Some(call("g", vec![]))),
    }
}

proptest! {
    #[test]
    fn lowered_instructions_read_only_earlier_results(choices in proptest::collection::vec(any::<u8>(), 0..12)) {
        let statements: Vec<AstNode> = choices.iter().enumerate().map(|(i, c)| statement(*c, i)).collect();
        let out = lower(&root(vec![
            func("g", vec![], vec![]),
            func("f", vec![param("p")], statements),
        ]));
        let unit = out.unit("f").expect("unit f");
        prop_assert!(!unit.is_poisoned(), "{:?}", unit.stream.errors());

        let mut streams: Vec<&InstStream> = vec![&unit.stream];
        while let Some(stream) = streams.pop() {
            for inst in stream.instructions() {
                for operand in inst.kind.operands() {
                    prop_assert!(operand < inst.id, "{} reads later {:?}", inst.kind.name(), operand);
                }
                if stream.is_inline() {
                    prop_assert!(inst.is_comptime);
                }
            }
            streams.extend(stream.children());
        }

        // every statement in the vocabulary has an effect
        for warning in unit.stream.warnings() {
            prop_assert!(warning.kind() != astgen_core::DiagnosticKind::NoEffect);
        }
    }
}
