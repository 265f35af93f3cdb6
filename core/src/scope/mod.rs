//! Lexical scopes and local bindings.
//!
//! Scopes and variables live in one arena per generation unit and refer to
//! each other by index. A scope's parent always has a smaller id, so the
//! chain is acyclic by construction and ends at the unit's top-level scope.

pub mod symbol;
pub mod table;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::ast::DeferKind;
use crate::diagnostics::{DiagnosticKind, ErrorMsg};
use crate::ir::BlockId;
use crate::location::Location;

pub use symbol::{BindingRequest, ComptimeStatus, VarId, Variable};
pub use table::{Decl, DeclId, DeclKind, DeclTable, is_primitive_type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(pub usize);

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScopeKind {
    TopLevel { namespace: String },
    FnDef { name: String },
    /// Member namespace of a container declaration, by qualified path.
    Container { path: String },
    Block { label: Option<String>, end_block: Option<BlockId> },
    Loop {
        label: Option<String>,
        break_block: BlockId,
        continue_block: BlockId,
    },
    /// Everything below is evaluated at compile time.
    Comptime,
    /// Marks the point after a `defer`/`errdefer` statement.
    Defer { kind: DeferKind },
    /// The body of a deferred expression while it is being lowered.
    DeferExpr,
    /// Scope of a `catch` handler.
    ErrorHandling,
    Suspend,
}

impl ScopeKind {
    pub fn label(&self) -> Option<&str> {
        match self {
            ScopeKind::Block { label, .. } | ScopeKind::Loop { label, .. } => label.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    pub id: ScopeId,
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
    /// Bindings in declaration order.
    pub vars: Vec<VarId>,
    #[serde(skip)]
    names: FxHashMap<String, VarId>,
}

/// Outcome of a name lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
    Var(VarId),
    Decl(DeclId),
}

/// Where a `break` or `continue` lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JumpTarget {
    Found(ScopeId),
    NotInLoop,
    UnknownLabel(String),
    /// `continue` named a block label.
    LabelNotLoop(String),
    /// The walk would leave a deferred expression.
    CrossesDefer,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    vars: Vec<Variable>,
}

impl ScopeTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the unit's root scope.
    pub fn top_level(&mut self, namespace: impl Into<String>) -> ScopeId {
        self.push(None, ScopeKind::TopLevel { namespace: namespace.into() })
    }

    pub fn push_child(&mut self, parent: ScopeId, kind: ScopeKind) -> ScopeId {
        self.push(Some(parent), kind)
    }

    fn push(&mut self, parent: Option<ScopeId>, kind: ScopeKind) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        debug_assert!(parent.is_none_or(|p| p < id));
        self.scopes.push(Scope { id, parent, kind, vars: Vec::new(), names: FxHashMap::default() });
        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn var(&self, id: VarId) -> &Variable {
        &self.vars[id.0]
    }

    pub fn var_mut(&mut self, id: VarId) -> &mut Variable {
        &mut self.vars[id.0]
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn vars(&self) -> &[Variable] {
        &self.vars
    }

    /// Walks from `scope` outward to the top-level scope, inclusive.
    pub fn chain(&self, scope: ScopeId) -> impl Iterator<Item = &Scope> {
        let mut next = Some(scope);
        std::iter::from_fn(move || {
            let current = &self.scopes[next?.0];
            next = current.parent;
            Some(current)
        })
    }

    /// Innermost binding of `name` visible from `scope`. Members of the
    /// enclosing containers come after the locals, then the top-level
    /// declarations.
    pub fn lookup(&self, scope: ScopeId, name: &str, decls: &DeclTable) -> Option<Resolved> {
        for s in self.chain(scope) {
            if let Some(var) = s.names.get(name) {
                return Some(Resolved::Var(*var));
            }
            if let Some(decl) = member_decl(s, name, decls) {
                return Some(Resolved::Decl(decl.id));
            }
        }
        decls.get(name).map(|d| Resolved::Decl(d.id))
    }

    /// Declaration `name` resolves to from `scope`, ignoring locals.
    pub fn lookup_decl<'d>(&self, scope: ScopeId, name: &str, decls: &'d DeclTable) -> Option<&'d Decl> {
        self.chain(scope)
            .find_map(|s| member_decl(s, name, decls))
            .or_else(|| decls.get(name))
    }

    /// Every local binding of `name` visible from `scope`, innermost first.
    pub fn lookup_all(&self, scope: ScopeId, name: &str) -> Vec<VarId> {
        self.chain(scope)
            .flat_map(|s| s.vars.iter().rev())
            .copied()
            .filter(|v| self.vars[v.0].name.as_deref() == Some(name))
            .collect()
    }

    pub fn is_forced_comptime(&self, scope: ScopeId) -> bool {
        self.chain(scope).any(|s| matches!(s.kind, ScopeKind::Comptime))
    }

    pub fn enclosing_fn(&self, scope: ScopeId) -> Option<ScopeId> {
        self.chain(scope)
            .find(|s| matches!(s.kind, ScopeKind::FnDef { .. }))
            .map(|s| s.id)
    }

    pub fn namespace(&self, scope: ScopeId) -> Option<&str> {
        self.chain(scope).find_map(|s| match &s.kind {
            ScopeKind::TopLevel { namespace } => Some(namespace.as_str()),
            _ => None,
        })
    }

    /// `true` when a scope of the given shape sits between `scope` and the
    /// enclosing function.
    fn within_fn(&self, scope: ScopeId, pred: impl Fn(&ScopeKind) -> bool) -> bool {
        for s in self.chain(scope) {
            if matches!(s.kind, ScopeKind::FnDef { .. }) {
                return false;
            }
            if pred(&s.kind) {
                return true;
            }
        }
        false
    }

    pub fn in_defer_expr(&self, scope: ScopeId) -> bool {
        self.within_fn(scope, |k| matches!(k, ScopeKind::DeferExpr))
    }

    pub fn in_suspend(&self, scope: ScopeId) -> bool {
        self.within_fn(scope, |k| matches!(k, ScopeKind::Suspend))
    }

    /// Target of a `break`: the labeled block or loop, or the innermost loop.
    pub fn break_target(&self, scope: ScopeId, label: Option<&str>) -> JumpTarget {
        self.jump_target(scope, label, false)
    }

    /// Target of a `continue`: always a loop.
    pub fn continue_target(&self, scope: ScopeId, label: Option<&str>) -> JumpTarget {
        self.jump_target(scope, label, true)
    }

    fn jump_target(&self, scope: ScopeId, label: Option<&str>, is_continue: bool) -> JumpTarget {
        for s in self.chain(scope) {
            match &s.kind {
                ScopeKind::DeferExpr => return JumpTarget::CrossesDefer,
                ScopeKind::FnDef { .. } | ScopeKind::TopLevel { .. } | ScopeKind::Container { .. } => break,
                ScopeKind::Loop { label: l, .. } => {
                    if label.is_none() || l.as_deref() == label {
                        return JumpTarget::Found(s.id);
                    }
                }
                ScopeKind::Block { label: Some(l), .. } if label == Some(l.as_str()) => {
                    if is_continue {
                        return JumpTarget::LabelNotLoop(l.clone());
                    }
                    return JumpTarget::Found(s.id);
                }
                _ => {}
            }
        }
        match label {
            Some(l) => JumpTarget::UnknownLabel(l.to_string()),
            None => JumpTarget::NotInLoop,
        }
    }

    /// Defer scopes passed when jumping from `from` out of `target`,
    /// innermost first. `None` collects up to the enclosing function.
    pub fn defers_until(&self, from: ScopeId, target: Option<ScopeId>) -> Vec<(ScopeId, DeferKind)> {
        let mut out = Vec::new();
        for s in self.chain(from) {
            if Some(s.id) == target {
                break;
            }
            match &s.kind {
                ScopeKind::Defer { kind } => out.push((s.id, *kind)),
                ScopeKind::FnDef { .. } | ScopeKind::TopLevel { .. } | ScopeKind::Container { .. } => break,
                _ => {}
            }
        }
        out
    }

    /// Registers a local binding in `scope`.
    ///
    /// Unless the request skips the check, the name must not collide with a
    /// visible binding, a primitive type, or a top-level declaration.
    pub fn create_local_var(
        &mut self,
        scope: ScopeId,
        req: BindingRequest,
        decls: &DeclTable,
    ) -> Result<VarId, ErrorMsg> {
        if !req.skip_name_check {
            if let Some(name) = req.name.as_deref() {
                self.check_name(scope, name, &req, decls)?;
            }
        }

        let id = VarId(self.vars.len());
        if let Some(name) = &req.name {
            self.scopes[scope.0].names.insert(name.clone(), id);
        }
        self.scopes[scope.0].vars.push(id);
        self.vars.push(Variable {
            id,
            name: req.name,
            scope,
            location: req.location,
            src_is_const: req.src_is_const,
            gen_is_const: req.gen_is_const,
            is_shadowable: req.is_shadowable,
            comptime: req.comptime,
            skip_name_check: req.skip_name_check,
        });
        log::trace!("declared {} in {}", id, scope);
        Ok(id)
    }

    fn check_name(
        &self,
        scope: ScopeId,
        name: &str,
        req: &BindingRequest,
        decls: &DeclTable,
    ) -> Result<(), ErrorMsg> {
        let existing = self.lookup_all(scope, name);
        let clash = existing
            .iter()
            .find(|v| !self.vars[v.0].is_shadowable || !req.is_shadowable);
        if let Some(prev) = clash {
            return Err(collision(
                format!("redeclaration of variable '{}'", name),
                req.location.clone(),
                "previous declaration here",
                self.vars[prev.0].location.clone(),
            ));
        }

        if is_primitive_type(name) {
            return Err(collision(
                format!("variable shadows primitive type '{}'", name),
                req.location.clone(),
                "primitive type declared here",
                Some(Location::builtin()),
            ));
        }

        if let Some(decl) = self.lookup_decl(scope, name, decls) {
            return Err(collision(
                format!("redefinition of '{}'", name),
                req.location.clone(),
                "previous definition here",
                decl.location.clone(),
            ));
        }
        Ok(())
    }
}

fn member_decl<'d>(scope: &Scope, name: &str, decls: &'d DeclTable) -> Option<&'d Decl> {
    match &scope.kind {
        ScopeKind::Container { path } => decls.get(&format!("{}.{}", path, name)),
        _ => None,
    }
}

fn collision(
    message: String,
    location: Option<Location>,
    note: &str,
    note_location: Option<Location>,
) -> ErrorMsg {
    ErrorMsg::with(DiagnosticKind::NameCollision, message, "create_local_var", location, None)
        .with_note(ErrorMsg::note(note, note_location))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> (ScopeTree, ScopeId) {
        let mut t = ScopeTree::new();
        let top = t.top_level("main");
        (t, top)
    }

    #[test]
    fn lookup_prefers_innermost() {
        let (mut t, top) = tree();
        let decls = DeclTable::new("main");
        let outer = t.push_child(top, ScopeKind::FnDef { name: "f".into() });
        let a = t
            .create_local_var(outer, BindingRequest::named("a", None).shadowable(true), &decls)
            .unwrap();
        let inner = t.push_child(outer, ScopeKind::Block { label: None, end_block: None });
        let b = t
            .create_local_var(inner, BindingRequest::named("a", None).shadowable(true), &decls)
            .unwrap();
        assert_eq!(t.lookup(inner, "a", &decls), Some(Resolved::Var(b)));
        assert_eq!(t.lookup(outer, "a", &decls), Some(Resolved::Var(a)));
    }

    #[test]
    fn continue_on_block_label_is_rejected() {
        let (mut t, top) = tree();
        let blk = t.push_child(top, ScopeKind::Block { label: Some("blk".into()), end_block: None });
        assert_eq!(t.continue_target(blk, Some("blk")), JumpTarget::LabelNotLoop("blk".into()));
        assert_eq!(t.break_target(blk, Some("blk")), JumpTarget::Found(blk));
        assert_eq!(t.break_target(blk, None), JumpTarget::NotInLoop);
        assert_eq!(t.break_target(blk, Some("nope")), JumpTarget::UnknownLabel("nope".into()));
    }

    #[test]
    fn defers_are_collected_innermost_first() {
        let (mut t, top) = tree();
        let f = t.push_child(top, ScopeKind::FnDef { name: "f".into() });
        let d1 = t.push_child(f, ScopeKind::Defer { kind: DeferKind::Normal });
        let d2 = t.push_child(d1, ScopeKind::Defer { kind: DeferKind::Error });
        assert_eq!(
            t.defers_until(d2, None),
            vec![(d2, DeferKind::Error), (d1, DeferKind::Normal)]
        );
        assert_eq!(t.defers_until(d2, Some(d1)), vec![(d2, DeferKind::Error)]);
    }
}
