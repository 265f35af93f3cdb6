//! AST to IR lowering.
//!
//! Each declaration, top-level or a member of a container, is one generation
//! unit with its own scope arena and instruction stream. Units only share the
//! declaration table and the options, so `generate_module` can lower them in
//! parallel.

pub mod declare_builtins;
mod function_builder;
mod lower_control;
mod lower_expr;
mod lower_objects;
mod lower_stmt;
pub mod lowering_context;

use log::debug;
use rayon::prelude::*;
use serde::Serialize;

use crate::ast::{AstNode, AstNodeKind};
use crate::config::LowerOptions;
use crate::diagnostics::{CallStack, DiagnosticKind, ErrorMsg};
use crate::ir::inst::InstKind;
use crate::ir::result_loc::no_result_loc;
use crate::ir::stream::InstStream;
use crate::scope::table::decl_header;
use crate::scope::{Decl, DeclKind, DeclTable, ScopeId, ScopeKind, ScopeTree};

use function_builder::FunctionBuilder;
pub use lowering_context::{Lowered, LoweringContext, Poisoned};

/// Whether instructions emitted into `stream` for `scope` are evaluated at
/// compile time.
pub fn should_inline(stream: &InstStream, scopes: &ScopeTree, scope: ScopeId) -> bool {
    stream.is_inline() || scopes.is_forced_comptime(scope)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnitKind {
    Function,
    TopLevel,
    Comptime,
    Test,
}

impl std::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UnitKind::Function => "fn",
            UnitKind::TopLevel => "decl",
            UnitKind::Comptime => "comptime",
            UnitKind::Test => "test",
        };
        write!(f, "{}", s)
    }
}

/// Result of lowering one unit. The scope arena is kept alongside the stream
/// because `VarPtr` and `DeclVar` refer into it.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedUnit {
    pub name: String,
    pub kind: UnitKind,
    pub stream: InstStream,
    pub scopes: ScopeTree,
}

impl GeneratedUnit {
    pub fn is_poisoned(&self) -> bool {
        self.stream.is_poisoned()
    }
}

impl<'a> LoweringContext<'a> {
    /// Lowers `node` as the body of the current unit and closes the stream
    /// with a `return` of its value.
    pub fn lower_unit(&mut self, node: &'a AstNode, scope: ScopeId) -> Lowered {
        let value = lower_expr::lower_expr(self, node, scope, no_result_loc())?;
        if self.stream.is_terminated() {
            return Ok(value);
        }
        Ok(self.emit_gen(InstKind::Return { operand: Some(value) }, scope, node.location.as_ref()))
    }
}

/// Lowers generation units against one declaration table.
pub struct Generator<'a> {
    decls: &'a DeclTable,
    options: &'a LowerOptions,
    call_stack: CallStack,
}

impl<'a> Generator<'a> {
    pub fn new(decls: &'a DeclTable, options: &'a LowerOptions) -> Self {
        Generator { decls, options, call_stack: CallStack::new() }
    }

    /// Frames already on the analysis call stack when lowering starts. They
    /// are reported under every fatal diagnostic.
    pub fn with_call_stack(mut self, call_stack: CallStack) -> Self {
        self.call_stack = call_stack;
        self
    }

    fn context<'n>(&'n self, stream: InstStream, scopes: ScopeTree, root: ScopeId) -> LoweringContext<'n> {
        LoweringContext::new(self.decls, self.options, scopes, stream, root)
            .with_call_stack(self.call_stack.clone())
    }

    /// Lowers a top-level declaration into its own unit.
    pub fn generate(&self, node: &AstNode) -> GeneratedUnit {
        let (name, kind) =
            decl_header(node).unwrap_or_else(|| (format!("expr#{}", node.get_id()), DeclKind::Comptime));
        debug!("lowering {} ({:?})", name, kind);
        self.generate_unit(node, name, &[])
    }

    /// Lowers a declaration of the table, `node` being its syntax. Members of
    /// containers see the sibling members of every enclosing container.
    pub fn generate_decl(&self, decl: &Decl, node: &AstNode) -> GeneratedUnit {
        debug!("lowering {} ({:?})", decl.name, decl.kind);
        let containers = self.decls.containers_of(decl.id);
        self.generate_unit(node, decl.name.clone(), &containers)
    }

    fn generate_unit(&self, node: &AstNode, name: String, containers: &[&str]) -> GeneratedUnit {
        let unit = match &node.kind {
            AstNodeKind::FnDecl { .. } => self.generate_function(node, name, UnitKind::Function, containers),
            AstNodeKind::TestDecl { .. } => self.generate_function(node, name, UnitKind::Test, containers),
            AstNodeKind::VarDecl { .. } => self.generate_top_level(node, name, UnitKind::TopLevel, containers),
            _ => self.generate_top_level(node, name, UnitKind::Comptime, containers),
        };
        debug!(
            "lowered {}: {} instructions{}",
            unit.name,
            unit.stream.len(),
            if unit.is_poisoned() { ", poisoned" } else { "" }
        );
        unit
    }

    /// Lowers the parameters and body of a `fn` declaration.
    pub fn generate_fn_body(&self, node: &AstNode) -> GeneratedUnit {
        let name = node.decl_name().unwrap_or("anonymous").to_string();
        self.generate_function(node, name, UnitKind::Function, &[])
    }

    /// Opens the unit's top-level scope and one member scope per enclosing
    /// container. Returns the innermost.
    fn unit_scopes(&self, containers: &[&str]) -> (ScopeTree, ScopeId) {
        let mut scopes = ScopeTree::new();
        let mut scope = scopes.top_level(self.decls.namespace());
        for path in containers {
            scope = scopes.push_child(scope, ScopeKind::Container { path: path.to_string() });
        }
        (scopes, scope)
    }

    fn generate_function(&self, node: &AstNode, name: String, kind: UnitKind, containers: &[&str]) -> GeneratedUnit {
        let (scopes, top) = self.unit_scopes(containers);
        let mut cx = self.context(InstStream::new(name.clone(), false), scopes, top);

        match FunctionBuilder::from_decl(node, name.clone()) {
            Some(builder) => {
                let _ = builder.build(&mut cx, top);
            }
            None => {
                let _ = cx.fail_at(
                    DiagnosticKind::InvalidConstruct,
                    format!("expected function declaration, found {}", node.kind),
                    "generate_fn_body",
                    node,
                );
            }
        }

        let (stream, scopes) = cx.into_parts();
        GeneratedUnit { name, kind, stream, scopes }
    }

    /// Top-level initializers and `comptime` blocks are evaluated at compile
    /// time: the stream is inline and lowering starts in a comptime scope.
    fn generate_top_level(&self, node: &AstNode, name: String, kind: UnitKind, containers: &[&str]) -> GeneratedUnit {
        let (mut scopes, top) = self.unit_scopes(containers);
        let comptime = scopes.push_child(top, ScopeKind::Comptime);
        let mut cx = self.context(InstStream::new(name.clone(), true), scopes, comptime);

        let _ = match &node.kind {
            AstNodeKind::VarDecl { type_expr, init, .. } => {
                lower_global_init(&mut cx, node, &name, type_expr.as_deref(), init.as_deref(), comptime)
            }
            AstNodeKind::Comptime { expr } => cx.lower_unit(expr, comptime),
            _ => cx.lower_unit(node, comptime),
        };

        let (stream, scopes) = cx.into_parts();
        GeneratedUnit { name, kind, stream, scopes }
    }

    /// Lowers `node` in a scope of a caller-provided arena. The stream is
    /// inline when `scope` already is a compile-time scope.
    pub fn generate_in(&self, node: &AstNode, scopes: ScopeTree, scope: ScopeId, name: &str) -> GeneratedUnit {
        let is_inline = scopes.is_forced_comptime(scope);
        let mut cx = self.context(InstStream::new(name, is_inline), scopes, scope);
        let _ = cx.lower_unit(node, scope);
        let (stream, scopes) = cx.into_parts();
        let kind = if is_inline { UnitKind::Comptime } else { UnitKind::Function };
        GeneratedUnit { name: name.to_string(), kind, stream, scopes }
    }
}

fn lower_global_init<'a>(
    cx: &mut LoweringContext<'a>,
    node: &'a AstNode,
    name: &str,
    type_expr: Option<&'a AstNode>,
    init: Option<&'a AstNode>,
    scope: ScopeId,
) -> Lowered {
    if let Some(t) = type_expr {
        lower_expr::lower_expr(cx, t, scope, no_result_loc())?;
    }
    let Some(init) = init else {
        return Err(cx.fail_at(
            DiagnosticKind::InvalidConstruct,
            format!("variables must be initialized: '{}'", name),
            "generate",
            node,
        ));
    };
    cx.set_name_hint(init, name);
    cx.lower_unit(init, scope)
}

/// Every unit of one file plus the diagnostics of all of them.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleOutput {
    pub decls: DeclTable,
    pub units: Vec<GeneratedUnit>,
    /// Declaration-table errors first, then each unit's in declaration order.
    pub diagnostics: Vec<ErrorMsg>,
}

impl ModuleOutput {
    pub fn is_poisoned(&self) -> bool {
        self.units.iter().any(GeneratedUnit::is_poisoned) || self.diagnostics.iter().any(ErrorMsg::is_fatal)
    }

    pub fn unit(&self, name: &str) -> Option<&GeneratedUnit> {
        self.units.iter().find(|u| u.name == name)
    }
}

fn is_declaration(node: &AstNode) -> bool {
    matches!(
        node.kind,
        AstNodeKind::FnDecl { .. }
            | AstNodeKind::VarDecl { .. }
            | AstNodeKind::TestDecl { .. }
            | AstNodeKind::Comptime { .. }
    )
}

/// Lowers every declaration of `root`. Declarations rejected by the
/// declaration table are not lowered.
pub fn generate_module(root: &AstNode, options: &LowerOptions) -> ModuleOutput {
    let (decls, mut diagnostics) = DeclTable::from_root(root);
    let nodes: &[AstNode] = match &root.kind {
        AstNodeKind::Root { decls, .. } => decls,
        _ => std::slice::from_ref(root),
    };

    for node in nodes.iter().filter(|n| !is_declaration(n)) {
        diagnostics.push(ErrorMsg::with(
            DiagnosticKind::InvalidConstruct,
            format!("expected declaration at top level, found {}", node.kind),
            "generate_module",
            node.location.clone(),
            node.span.clone(),
        ));
    }

    let work: Vec<(&Decl, &AstNode)> =
        decls.iter().filter_map(|d| Some((d, decls.node(d.id, nodes)?))).collect();
    let generator = Generator::new(&decls, options);
    debug!(
        "lowering {} units of '{}' ({})",
        work.len(),
        decls.namespace(),
        if options.parallel { "parallel" } else { "sequential" }
    );
    let units: Vec<GeneratedUnit> = if options.parallel {
        work.par_iter().map(|(decl, node)| generator.generate_decl(decl, node)).collect()
    } else {
        work.iter().map(|(decl, node)| generator.generate_decl(decl, node)).collect()
    };

    for unit in &units {
        diagnostics.extend(unit.stream.diagnostics());
    }

    ModuleOutput { decls, units, diagnostics }
}
