//! Unanalyzed instructions.
//!
//! Every operand is an `InstId` of an earlier instruction in the same stream.
//! Branch targets are `BlockId`s, which name basic blocks rather than
//! instructions, so control flow never introduces a forward reference.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::{BinaryOperator, CallModifier, ContainerKind, UnaryOperator};
use crate::location::Location;
use crate::scope::{DeclId, ScopeId, VarId};

use super::value::ConstValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstId(pub usize);

impl InstId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for InstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub usize);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerFieldInst {
    pub name: String,
    pub type_inst: Option<InstId>,
    pub default_value: Option<InstId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstKind {
    Const(ConstValue),
    /// Reference to a top-level declaration. `lval` asks for its address.
    DeclRef { decl: DeclId, name: String, lval: bool },
    VarPtr { var: VarId },
    ReturnPtr,
    ArgPtr { index: usize },
    LoadPtr { ptr: InstId },
    StorePtr { ptr: InstId, value: InstId },
    Alloca {
        name: Option<String>,
        type_inst: Option<InstId>,
        is_comptime: bool,
    },
    DeclVar { var: VarId, ptr: InstId },
    FieldPtr { container: InstId, field: String },
    ElemPtr { array: InstId, index: InstId },

    BinOp { op: BinaryOperator, lhs: InstId, rhs: InstId },
    UnOp { op: UnaryOperator, operand: InstId },
    /// Address of a temporary.
    Ref { value: InstId },
    As { dest_type: InstId, value: InstId },

    Call {
        callee: InstId,
        args: Vec<InstId>,
        modifier: CallModifier,
        result_ptr: Option<InstId>,
    },
    BuiltinCall { name: String, args: Vec<InstId> },

    ContainerDecl {
        kind: ContainerKind,
        name: String,
        bare_name: String,
        fields: Vec<ContainerFieldInst>,
        decls: Vec<String>,
    },
    ErrorSet { name: String, bare_name: String, members: Vec<String> },
    ErrorValue { name: String },
    StructInit {
        type_inst: Option<InstId>,
        fields: Vec<(String, InstId)>,
        result_ptr: Option<InstId>,
    },
    ArrayInit {
        type_inst: Option<InstId>,
        elements: Vec<InstId>,
        result_ptr: Option<InstId>,
    },

    Br { target: BlockId },
    CondBr { cond: InstId, then_block: BlockId, else_block: BlockId },
    Phi { incoming: Vec<(BlockId, InstId)> },
    Return { operand: Option<InstId> },
    Unreachable,

    IsErr { value: InstId },
    UnwrapErrCode { value: InstId },
    UnwrapErrPayload { value: InstId, safety_check: bool },
    TestNonNull { value: InstId },
    OptionalUnwrap { value: InstId, safety_check: bool },

    /// A nested compile-time block lowered into child stream `unit`.
    ComptimeBlock { unit: usize },
    CheckStatementIsVoid { value: InstId },
    Asm { template: String, is_volatile: bool },
    SuspendBegin,
    SuspendFinish { begin: InstId },
}

impl InstKind {
    /// Instructions that end their basic block.
    pub fn is_noreturn(&self) -> bool {
        matches!(
            self,
            InstKind::Br { .. } | InstKind::CondBr { .. } | InstKind::Return { .. } | InstKind::Unreachable
        )
    }

    /// Every instruction this one reads.
    pub fn operands(&self) -> Vec<InstId> {
        match self {
            InstKind::Const(_)
            | InstKind::DeclRef { .. }
            | InstKind::VarPtr { .. }
            | InstKind::ReturnPtr
            | InstKind::ArgPtr { .. }
            | InstKind::ErrorSet { .. }
            | InstKind::ErrorValue { .. }
            | InstKind::Br { .. }
            | InstKind::Unreachable
            | InstKind::ComptimeBlock { .. }
            | InstKind::Asm { .. }
            | InstKind::SuspendBegin => Vec::new(),
            InstKind::Alloca { type_inst, .. } => type_inst.iter().copied().collect(),
            InstKind::LoadPtr { ptr } => vec![*ptr],
            InstKind::StorePtr { ptr, value } => vec![*ptr, *value],
            InstKind::DeclVar { ptr, .. } => vec![*ptr],
            InstKind::FieldPtr { container, .. } => vec![*container],
            InstKind::ElemPtr { array, index } => vec![*array, *index],
            InstKind::BinOp { lhs, rhs, .. } => vec![*lhs, *rhs],
            InstKind::UnOp { operand, .. } => vec![*operand],
            InstKind::Ref { value } => vec![*value],
            InstKind::As { dest_type, value } => vec![*dest_type, *value],
            InstKind::Call { callee, args, result_ptr, .. } => {
                let mut ops = vec![*callee];
                ops.extend(args.iter().copied());
                ops.extend(result_ptr.iter().copied());
                ops
            }
            InstKind::BuiltinCall { args, .. } => args.clone(),
            InstKind::ContainerDecl { fields, .. } => fields
                .iter()
                .flat_map(|f| f.type_inst.iter().chain(f.default_value.iter()))
                .copied()
                .collect(),
            InstKind::StructInit { type_inst, fields, result_ptr } => type_inst
                .iter()
                .copied()
                .chain(fields.iter().map(|(_, v)| *v))
                .chain(result_ptr.iter().copied())
                .collect(),
            InstKind::ArrayInit { type_inst, elements, result_ptr } => type_inst
                .iter()
                .copied()
                .chain(elements.iter().copied())
                .chain(result_ptr.iter().copied())
                .collect(),
            InstKind::CondBr { cond, .. } => vec![*cond],
            InstKind::Phi { incoming } => incoming.iter().map(|(_, v)| *v).collect(),
            InstKind::Return { operand } => operand.iter().copied().collect(),
            InstKind::IsErr { value }
            | InstKind::UnwrapErrCode { value }
            | InstKind::UnwrapErrPayload { value, .. }
            | InstKind::TestNonNull { value }
            | InstKind::OptionalUnwrap { value, .. }
            | InstKind::CheckStatementIsVoid { value } => vec![*value],
            InstKind::SuspendFinish { begin } => vec![*begin],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            InstKind::Const(_) => "const",
            InstKind::DeclRef { .. } => "decl_ref",
            InstKind::VarPtr { .. } => "var_ptr",
            InstKind::ReturnPtr => "ret_ptr",
            InstKind::ArgPtr { .. } => "arg_ptr",
            InstKind::LoadPtr { .. } => "load",
            InstKind::StorePtr { .. } => "store",
            InstKind::Alloca { .. } => "alloca",
            InstKind::DeclVar { .. } => "decl_var",
            InstKind::FieldPtr { .. } => "field_ptr",
            InstKind::ElemPtr { .. } => "elem_ptr",
            InstKind::BinOp { .. } => "bin_op",
            InstKind::UnOp { .. } => "un_op",
            InstKind::Ref { .. } => "ref",
            InstKind::As { .. } => "as",
            InstKind::Call { .. } => "call",
            InstKind::BuiltinCall { .. } => "builtin_call",
            InstKind::ContainerDecl { .. } => "container_decl",
            InstKind::ErrorSet { .. } => "error_set",
            InstKind::ErrorValue { .. } => "error_value",
            InstKind::StructInit { .. } => "struct_init",
            InstKind::ArrayInit { .. } => "array_init",
            InstKind::Br { .. } => "br",
            InstKind::CondBr { .. } => "cond_br",
            InstKind::Phi { .. } => "phi",
            InstKind::Return { .. } => "return",
            InstKind::Unreachable => "unreachable",
            InstKind::IsErr { .. } => "is_err",
            InstKind::UnwrapErrCode { .. } => "unwrap_err_code",
            InstKind::UnwrapErrPayload { .. } => "unwrap_err_payload",
            InstKind::TestNonNull { .. } => "test_non_null",
            InstKind::OptionalUnwrap { .. } => "optional_unwrap",
            InstKind::ComptimeBlock { .. } => "comptime_block",
            InstKind::CheckStatementIsVoid { .. } => "check_void",
            InstKind::Asm { .. } => "asm",
            InstKind::SuspendBegin => "suspend_begin",
            InstKind::SuspendFinish { .. } => "suspend_finish",
        }
    }
}

fn join(ids: &[InstId]) -> String {
    ids.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
}

fn opt(id: &Option<InstId>) -> String {
    match id {
        Some(i) => i.to_string(),
        None => "_".to_string(),
    }
}

impl fmt::Display for InstKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name();
        match self {
            InstKind::Const(v) => write!(f, "{} {}", name, v),
            InstKind::DeclRef { name: decl, lval, .. } => {
                write!(f, "{} {}{}", name, decl, if *lval { " (lval)" } else { "" })
            }
            InstKind::VarPtr { var } => write!(f, "{} {}", name, var),
            InstKind::ReturnPtr | InstKind::Unreachable | InstKind::SuspendBegin => write!(f, "{}", name),
            InstKind::ArgPtr { index } => write!(f, "{} #{}", name, index),
            InstKind::LoadPtr { ptr } => write!(f, "{} {}", name, ptr),
            InstKind::StorePtr { ptr, value } => write!(f, "{} {} <- {}", name, ptr, value),
            InstKind::Alloca { name: var, type_inst, is_comptime } => write!(
                f,
                "{}{} {} : {}",
                if *is_comptime { "comptime " } else { "" },
                name,
                var.as_deref().unwrap_or("_"),
                opt(type_inst)
            ),
            InstKind::DeclVar { var, ptr } => write!(f, "{} {} = {}", name, var, ptr),
            InstKind::FieldPtr { container, field } => write!(f, "{} {}.{}", name, container, field),
            InstKind::ElemPtr { array, index } => write!(f, "{} {}[{}]", name, array, index),
            InstKind::BinOp { op, lhs, rhs } => write!(f, "{} {} {} {}", name, lhs, op.symbol(), rhs),
            InstKind::UnOp { op, operand } => write!(f, "{} {:?} {}", name, op, operand),
            InstKind::Ref { value } => write!(f, "{} {}", name, value),
            InstKind::As { dest_type, value } => write!(f, "{} {}, {}", name, dest_type, value),
            InstKind::Call { callee, args, modifier, result_ptr } => write!(
                f,
                "{} {}({}) {:?} -> {}",
                name,
                callee,
                join(args),
                modifier,
                opt(result_ptr)
            ),
            InstKind::BuiltinCall { name: builtin, args } => {
                write!(f, "{} {}({})", name, builtin, join(args))
            }
            InstKind::ContainerDecl { kind, name: ty, fields, decls, .. } => write!(
                f,
                "{} {} {} fields=[{}] decls=[{}]",
                name,
                kind.tag(),
                ty,
                fields.iter().map(|x| x.name.as_str()).collect::<Vec<_>>().join(", "),
                decls.join(", ")
            ),
            InstKind::ErrorSet { name: ty, members, .. } => {
                write!(f, "{} {} {{{}}}", name, ty, members.join(", "))
            }
            InstKind::ErrorValue { name: err } => write!(f, "{} error.{}", name, err),
            InstKind::StructInit { type_inst, fields, result_ptr } => write!(
                f,
                "{} {} {{{}}} -> {}",
                name,
                opt(type_inst),
                fields
                    .iter()
                    .map(|(n, v)| format!(".{} = {}", n, v))
                    .collect::<Vec<_>>()
                    .join(", "),
                opt(result_ptr)
            ),
            InstKind::ArrayInit { type_inst, elements, result_ptr } => write!(
                f,
                "{} {} {{{}}} -> {}",
                name,
                opt(type_inst),
                join(elements),
                opt(result_ptr)
            ),
            InstKind::Br { target } => write!(f, "{} {}", name, target),
            InstKind::CondBr { cond, then_block, else_block } => {
                write!(f, "{} {}, {}, {}", name, cond, then_block, else_block)
            }
            InstKind::Phi { incoming } => write!(
                f,
                "{} [{}]",
                name,
                incoming
                    .iter()
                    .map(|(b, v)| format!("{}: {}", b, v))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            InstKind::Return { operand } => write!(f, "{} {}", name, opt(operand)),
            InstKind::IsErr { value }
            | InstKind::UnwrapErrCode { value }
            | InstKind::TestNonNull { value }
            | InstKind::CheckStatementIsVoid { value } => write!(f, "{} {}", name, value),
            InstKind::UnwrapErrPayload { value, safety_check }
            | InstKind::OptionalUnwrap { value, safety_check } => write!(
                f,
                "{} {}{}",
                name,
                value,
                if *safety_check { " (safe)" } else { "" }
            ),
            InstKind::ComptimeBlock { unit } => write!(f, "{} child#{}", name, unit),
            InstKind::Asm { template, is_volatile } => write!(
                f,
                "{}{} {:?}",
                name,
                if *is_volatile { " volatile" } else { "" },
                template
            ),
            InstKind::SuspendFinish { begin } => write!(f, "{} {}", name, begin),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inst {
    pub id: InstId,
    pub kind: InstKind,
    pub block: BlockId,
    pub scope: ScopeId,
    pub location: Option<Location>,
    /// Must be evaluated at compile time.
    pub is_comptime: bool,
    /// Synthesized by the lowering rather than written by the user.
    pub is_gen: bool,
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.id, self.kind)?;
        if self.is_comptime {
            write!(f, " [comptime]")?;
        }
        Ok(())
    }
}
