use super::inst::InstKind;
use super::lower::declare_builtins::builtin_has_side_effects;

/// Whether discarding the result of `kind` would lose an observable effect.
///
/// Depends only on the instruction's tag and operands, never on where it
/// sits in a stream.
pub fn has_side_effects(kind: &InstKind) -> bool {
    match kind {
        InstKind::Br { .. }
        | InstKind::CondBr { .. }
        | InstKind::Return { .. }
        | InstKind::Unreachable
        | InstKind::StorePtr { .. }
        | InstKind::DeclVar { .. }
        | InstKind::Call { .. }
        | InstKind::CheckStatementIsVoid { .. }
        | InstKind::ComptimeBlock { .. }
        | InstKind::SuspendBegin
        | InstKind::SuspendFinish { .. } => true,

        InstKind::Asm { is_volatile, .. } => *is_volatile,
        InstKind::OptionalUnwrap { safety_check, .. }
        | InstKind::UnwrapErrPayload { safety_check, .. } => *safety_check,
        // writing into an existing location is a store
        InstKind::StructInit { result_ptr, .. } | InstKind::ArrayInit { result_ptr, .. } => {
            result_ptr.is_some()
        }
        InstKind::BuiltinCall { name, .. } => builtin_has_side_effects(name),

        InstKind::Const(_)
        | InstKind::DeclRef { .. }
        | InstKind::VarPtr { .. }
        | InstKind::ReturnPtr
        | InstKind::ArgPtr { .. }
        | InstKind::LoadPtr { .. }
        | InstKind::Alloca { .. }
        | InstKind::FieldPtr { .. }
        | InstKind::ElemPtr { .. }
        | InstKind::BinOp { .. }
        | InstKind::UnOp { .. }
        | InstKind::Ref { .. }
        | InstKind::As { .. }
        | InstKind::ContainerDecl { .. }
        | InstKind::ErrorSet { .. }
        | InstKind::ErrorValue { .. }
        | InstKind::Phi { .. }
        | InstKind::IsErr { .. }
        | InstKind::UnwrapErrCode { .. }
        | InstKind::TestNonNull { .. } => false,
    }
}
