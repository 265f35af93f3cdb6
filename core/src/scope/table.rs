use lazy_static::lazy_static;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::ast::{AstNode, AstNodeKind};
use crate::diagnostics::{DiagnosticKind, ErrorMsg};
use crate::location::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclKind {
    Fn,
    Var,
    Const,
    Test,
    Comptime,
}

impl DeclKind {
    /// Tests and comptime blocks are units but cannot be named from code.
    pub fn is_referenceable(&self) -> bool {
        matches!(self, DeclKind::Fn | DeclKind::Var | DeclKind::Const)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decl {
    pub id: DeclId,
    pub name: String,
    pub kind: DeclKind,
    pub location: Option<Location>,
    /// Position of the declaration among its siblings: the root's `decls`,
    /// or the member declarations of the container `parent` initializes.
    pub index: usize,
    /// Enclosing container declaration of a member. Members are named by
    /// their qualified path, such as `S.Inner.f`.
    #[serde(default)]
    pub parent: Option<DeclId>,
}

/// Top-level declarations of one file. Built once before any unit is lowered
/// and only read afterwards.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeclTable {
    namespace: String,
    decls: Vec<Decl>,
    #[serde(skip)]
    by_name: FxHashMap<String, DeclId>,
}

impl DeclTable {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), ..Default::default() }
    }

    /// Scans the root's declarations and, recursively, the member
    /// declarations of the containers they initialize. Duplicate or
    /// primitive-shadowing top-level names are reported and left out of the
    /// table; duplicate members are reported when their container is lowered.
    pub fn from_root(root: &AstNode) -> (Self, Vec<ErrorMsg>) {
        let (namespace, nodes): (&str, &[AstNode]) = match &root.kind {
            AstNodeKind::Root { name, decls } => (name, decls),
            _ => ("root", std::slice::from_ref(root)),
        };
        let mut table = DeclTable::new(namespace);
        let mut errors = Vec::new();

        for (index, node) in nodes.iter().enumerate() {
            let Some((name, kind)) = decl_header(node) else {
                continue;
            };

            if kind.is_referenceable() {
                if is_primitive_type(&name) {
                    errors.push(
                        ErrorMsg::with(
                            DiagnosticKind::NameCollision,
                            format!("declaration shadows primitive type '{}'", name),
                            "decl-table",
                            node.location.clone(),
                            node.span.clone(),
                        )
                        .with_note(ErrorMsg::note(
                            "primitive type declared here",
                            Some(Location::builtin()),
                        )),
                    );
                    continue;
                }
                if let Some(prev) = table.get(&name) {
                    errors.push(
                        ErrorMsg::with(
                            DiagnosticKind::NameCollision,
                            format!("redefinition of '{}'", name),
                            "decl-table",
                            node.location.clone(),
                            node.span.clone(),
                        )
                        .with_note(ErrorMsg::note("previous definition here", prev.location.clone())),
                    );
                    continue;
                }
            }

            let id = table.insert(name.clone(), kind, node.location.clone(), index);
            if let Some(members) = container_members(node) {
                table.insert_members(id, &name, members);
            }
        }

        (table, errors)
    }

    fn insert_members(&mut self, parent: DeclId, prefix: &str, members: &[AstNode]) {
        for (index, member) in members.iter().enumerate() {
            let Some((name, kind)) = decl_header(member) else {
                continue;
            };
            let qualified = format!("{}.{}", prefix, name);
            if kind.is_referenceable() && self.by_name.contains_key(&qualified) {
                continue;
            }
            let id = self.push(qualified.clone(), kind, member.location.clone(), index, Some(parent));
            if let Some(nested) = container_members(member) {
                self.insert_members(id, &qualified, nested);
            }
        }
    }

    pub fn insert(
        &mut self,
        name: impl Into<String>,
        kind: DeclKind,
        location: Option<Location>,
        index: usize,
    ) -> DeclId {
        self.push(name.into(), kind, location, index, None)
    }

    fn push(
        &mut self,
        name: String,
        kind: DeclKind,
        location: Option<Location>,
        index: usize,
        parent: Option<DeclId>,
    ) -> DeclId {
        let id = DeclId(self.decls.len());
        if kind.is_referenceable() {
            self.by_name.insert(name.clone(), id);
        }
        self.decls.push(Decl { id, name, kind, location, index, parent });
        id
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Referenceable declaration with the given name.
    pub fn get(&self, name: &str) -> Option<&Decl> {
        self.by_name.get(name).map(|id| &self.decls[id.0])
    }

    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.0]
    }

    /// Qualified names of the containers enclosing `id`, outermost first.
    pub fn containers_of(&self, id: DeclId) -> Vec<&str> {
        let mut out = Vec::new();
        let mut next = self.decl(id).parent;
        while let Some(parent) = next {
            let decl = self.decl(parent);
            out.push(decl.name.as_str());
            next = decl.parent;
        }
        out.reverse();
        out
    }

    /// Syntax node of `id` within the root declarations it was built from.
    pub fn node<'n>(&self, id: DeclId, root_decls: &'n [AstNode]) -> Option<&'n AstNode> {
        let decl = self.decl(id);
        let siblings = match decl.parent {
            None => root_decls,
            Some(parent) => container_members(self.node(parent, root_decls)?)?,
        };
        siblings.get(decl.index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Decl> {
        self.decls.iter()
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

pub(crate) fn decl_header(node: &AstNode) -> Option<(String, DeclKind)> {
    let loc_suffix = || match &node.location {
        Some(loc) => format!("{}:{}", loc.line, loc.column),
        None => node.get_id().to_string(),
    };
    match &node.kind {
        AstNodeKind::FnDecl { name, .. } => Some((name.clone(), DeclKind::Fn)),
        AstNodeKind::VarDecl { name, is_const, .. } => {
            let kind = if *is_const { DeclKind::Const } else { DeclKind::Var };
            Some((name.clone(), kind))
        }
        AstNodeKind::TestDecl { name, .. } => Some((
            name.clone().unwrap_or_else(|| format!("test:{}", loc_suffix())),
            DeclKind::Test,
        )),
        AstNodeKind::Comptime { .. } => Some((format!("comptime:{}", loc_suffix()), DeclKind::Comptime)),
        _ => None,
    }
}

/// Member declarations of the container a `const`/`var` is initialized with.
pub(crate) fn container_members(node: &AstNode) -> Option<&[AstNode]> {
    let AstNodeKind::VarDecl { init: Some(init), .. } = &node.kind else {
        return None;
    };
    match &init.kind {
        AstNodeKind::ContainerDecl { decls, .. } => Some(decls),
        _ => None,
    }
}

lazy_static! {
    static ref PRIMITIVE_TYPES: FxHashSet<&'static str> = [
        "i8", "u8", "i16", "u16", "i32", "u32", "i64", "u64", "i128", "u128",
        "isize", "usize", "c_int", "c_uint", "c_long", "c_ulong", "c_char",
        "f16", "f32", "f64", "f80", "f128",
        "bool", "void", "type", "anyerror", "noreturn", "anyopaque",
        "comptime_int", "comptime_float", "anyframe",
    ]
    .into_iter()
    .collect();
}

/// `true` for builtin type names, including every arbitrary-width `iN`/`uN`.
pub fn is_primitive_type(name: &str) -> bool {
    if PRIMITIVE_TYPES.contains(name) {
        return true;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some('i') | Some('u') => {
            let digits = chars.as_str();
            !digits.is_empty()
                && digits.chars().all(|c| c.is_ascii_digit())
                && !(digits.len() > 1 && digits.starts_with('0'))
                && digits.parse::<u32>().map(|w| w <= 65535).unwrap_or(false)
        }
        _ => false,
    }
}
