use crate::ast::{AstNode, AstNodeKind};
use crate::ir::inst::InstKind;
use crate::ir::result_loc::{ResultLoc, no_result_loc};
use crate::scope::{BindingRequest, ComptimeStatus, ScopeId, ScopeKind};

use super::lower_expr::lower_expr;
use super::lowering_context::{Lowered, LoweringContext};

/// Lowers one function-like declaration (a `fn` or a `test`) into the
/// current stream: parameters, return type, body, and the implicit
/// `return` at the end of a body that falls through.
pub(crate) struct FunctionBuilder<'a> {
    node: &'a AstNode,
    name: String,
    params: &'a [AstNode],
    return_type: Option<&'a AstNode>,
    body: Option<&'a AstNode>,
}

impl<'a> FunctionBuilder<'a> {
    pub fn from_decl(node: &'a AstNode, name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        match &node.kind {
            AstNodeKind::FnDecl { params, return_type, body, .. } => Some(FunctionBuilder {
                node,
                name,
                params,
                return_type: return_type.as_deref(),
                body: body.as_deref(),
            }),
            AstNodeKind::TestDecl { body, .. } => Some(FunctionBuilder {
                node,
                name,
                params: &[],
                return_type: None,
                body: Some(body),
            }),
            _ => None,
        }
    }

    /// Opens the function scope under `parent` and lowers into it.
    pub fn build(&self, cx: &mut LoweringContext<'a>, parent: ScopeId) -> Lowered<ScopeId> {
        let fn_scope = cx.scopes.push_child(parent, ScopeKind::FnDef { name: self.name.clone() });
        self.lower_params(cx, fn_scope)?;

        if let Some(rt) = self.return_type {
            let type_scope = cx.scopes.push_child(fn_scope, ScopeKind::Comptime);
            lower_expr(cx, rt, type_scope, no_result_loc())?;
        }

        // Prototypes have nothing to return from.
        let Some(body) = self.body else {
            return Ok(fn_scope);
        };
        lower_expr(cx, body, fn_scope, ResultLoc::Discard)?;
        if !cx.stream.is_terminated() {
            cx.emit_gen(InstKind::Return { operand: None }, fn_scope, self.node.location.as_ref());
        }
        Ok(fn_scope)
    }

    fn lower_params(&self, cx: &mut LoweringContext<'a>, fn_scope: ScopeId) -> Lowered<()> {
        for (index, param) in self.params.iter().enumerate() {
            let AstNodeKind::Param { name, type_expr, is_comptime } = &param.kind else {
                continue;
            };
            let loc = param.location.as_ref();
            if let Some(t) = type_expr {
                let type_scope = cx.scopes.push_child(fn_scope, ScopeKind::Comptime);
                lower_expr(cx, t, type_scope, no_result_loc())?;
            }
            let Some(name) = name.as_deref().filter(|n| *n != "_") else {
                continue;
            };

            let ptr = cx.emit_gen(InstKind::ArgPtr { index }, fn_scope, loc);
            let req = BindingRequest::named(name, param.location.clone())
                .constness(true, true)
                .comptime(ComptimeStatus::Known(*is_comptime));
            let var = match cx.scopes.create_local_var(fn_scope, req, cx.decls) {
                Ok(var) => var,
                Err(msg) => return Err(cx.fail(msg)),
            };
            cx.emit_gen(InstKind::DeclVar { var, ptr }, fn_scope, loc);
        }
        Ok(())
    }
}
