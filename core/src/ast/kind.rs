//! file: core/src/ast/kind.rs
//! description: AST node kind definitions and operator enums.
//!
//! Defines `AstNodeKind` along with the operator and modifier enums used by
//! the lowering pass. The tree is produced by an external parser (usually as
//! JSON) and is never mutated once lowering starts.
//!
use serde::{Deserialize, Serialize};

use super::node::AstNode;

/// Represents binary operators in the AST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    Eq,     // ==
    Ne,     // !=
    Lt,     // <
    Le,     // <=
    Gt,     // >
    Ge,     // >=
    Add,    // +
    Sub,    // -
    Mul,    // *
    Div,    // /
    Mod,    // %
    BitAnd, // &
    BitOr,  // |
    BitXor, // ^
    Shl,    // <<
    Shr,    // >>
    BoolAnd, // and
    BoolOr,  // or
    Orelse,  // orelse
}

impl BinaryOperator {
    /// `and`/`or` evaluate their right operand conditionally and are lowered
    /// into branches instead of a single instruction.
    pub fn is_short_circuit(&self) -> bool {
        matches!(self, BinaryOperator::BoolAnd | BinaryOperator::BoolOr)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Eq => "==",
            BinaryOperator::Ne => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitOr => "|",
            BinaryOperator::BitXor => "^",
            BinaryOperator::Shl => "<<",
            BinaryOperator::Shr => ">>",
            BinaryOperator::BoolAnd => "and",
            BinaryOperator::BoolOr => "or",
            BinaryOperator::Orelse => "orelse",
        }
    }
}

/// Represents unary operators in the AST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    Negate,         // -x
    BoolNot,        // !x
    BitNot,         // ~x
    AddressOf,      // &x
    Deref,          // x.*
    OptionalUnwrap, // x.?
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CallModifier {
    #[default]
    Auto,
    AlwaysInline,
    NeverInline,
    CompileTime,
    Async,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerKind {
    Struct,
    Enum,
    Union,
    Opaque,
}

impl ContainerKind {
    /// Tag used in anonymous type names, e.g. `struct:3:12`.
    pub fn tag(&self) -> &'static str {
        match self {
            ContainerKind::Struct => "struct",
            ContainerKind::Enum => "enum",
            ContainerKind::Union => "union",
            ContainerKind::Opaque => "opaque",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeferKind {
    /// Runs on every exit from the enclosing scope.
    Normal,
    /// Runs only when the enclosing function returns an error.
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInit {
    pub name: String,
    pub value: AstNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AstNodeKind {
    Root { name: String, decls: Vec<AstNode> },

    FnDecl {
        name: String,
        #[serde(default)]
        params: Vec<AstNode>,
        return_type: Option<Box<AstNode>>,
        body: Option<Box<AstNode>>,
        #[serde(default)]
        is_inline: bool,
        #[serde(default)]
        is_export: bool,
    },
    Param {
        name: Option<String>,
        type_expr: Option<Box<AstNode>>,
        #[serde(default)]
        is_comptime: bool,
    },
    VarDecl {
        name: String,
        is_const: bool,
        #[serde(default)]
        is_comptime: bool,
        type_expr: Option<Box<AstNode>>,
        init: Option<Box<AstNode>>,
    },
    TestDecl { name: Option<String>, body: Box<AstNode> },

    ContainerDecl {
        kind: ContainerKind,
        #[serde(default)]
        fields: Vec<AstNode>,
        #[serde(default)]
        decls: Vec<AstNode>,
    },
    ContainerField {
        name: String,
        type_expr: Option<Box<AstNode>>,
        default_value: Option<Box<AstNode>>,
    },
    ErrorSetDecl { members: Vec<AstNode> },

    Block {
        label: Option<String>,
        #[serde(default)]
        statements: Vec<AstNode>,
    },
    Comptime { expr: Box<AstNode> },
    Defer { kind: DeferKind, expr: Box<AstNode> },

    If {
        condition: Box<AstNode>,
        payload: Option<String>,
        then_branch: Box<AstNode>,
        else_branch: Option<Box<AstNode>>,
    },
    While {
        label: Option<String>,
        condition: Box<AstNode>,
        payload: Option<String>,
        continue_expr: Option<Box<AstNode>>,
        body: Box<AstNode>,
        else_branch: Option<Box<AstNode>>,
        #[serde(default)]
        is_inline: bool,
    },
    For {
        label: Option<String>,
        iterable: Box<AstNode>,
        item: String,
        index: Option<String>,
        body: Box<AstNode>,
        else_branch: Option<Box<AstNode>>,
        #[serde(default)]
        is_inline: bool,
    },
    Break { label: Option<String>, value: Option<Box<AstNode>> },
    Continue { label: Option<String> },
    Return { value: Option<Box<AstNode>> },
    Unreachable,
    Suspend { body: Option<Box<AstNode>> },
    Asm {
        template: String,
        #[serde(default)]
        is_volatile: bool,
    },

    Assign { target: Box<AstNode>, value: Box<AstNode> },
    AssignOp { op: BinaryOperator, target: Box<AstNode>, value: Box<AstNode> },
    BinaryOp { op: BinaryOperator, lhs: Box<AstNode>, rhs: Box<AstNode> },
    UnaryOp { op: UnaryOperator, operand: Box<AstNode> },
    Call {
        callee: Box<AstNode>,
        #[serde(default)]
        args: Vec<AstNode>,
        #[serde(default)]
        modifier: CallModifier,
    },
    BuiltinCall {
        name: String,
        #[serde(default)]
        args: Vec<AstNode>,
    },
    FieldAccess { container: Box<AstNode>, field: String },
    ArrayAccess { array: Box<AstNode>, index: Box<AstNode> },
    Try { expr: Box<AstNode> },
    Catch {
        lhs: Box<AstNode>,
        payload: Option<String>,
        rhs: Box<AstNode>,
    },
    StructInit {
        type_expr: Option<Box<AstNode>>,
        #[serde(default)]
        fields: Vec<FieldInit>,
    },
    ArrayInit {
        type_expr: Option<Box<AstNode>>,
        #[serde(default)]
        elements: Vec<AstNode>,
    },

    Symbol { name: String },
    IntLiteral { value: i64 },
    FloatLiteral { value: f64 },
    StringLiteral { value: String },
    BoolLiteral { value: bool },
    NullLiteral,
    UndefinedLiteral,
    ErrorValue { name: String },
}

impl AstNodeKind {
    /// Expression statements are the forms whose discarded value is checked
    /// for a missing side effect. Declarations, assignments and control flow
    /// are statements in their own right and never warn.
    pub fn is_expression_statement(&self) -> bool {
        matches!(
            self,
            AstNodeKind::BinaryOp { .. }
                | AstNodeKind::UnaryOp { .. }
                | AstNodeKind::Call { .. }
                | AstNodeKind::BuiltinCall { .. }
                | AstNodeKind::FieldAccess { .. }
                | AstNodeKind::ArrayAccess { .. }
                | AstNodeKind::Try { .. }
                | AstNodeKind::Catch { .. }
                | AstNodeKind::StructInit { .. }
                | AstNodeKind::ArrayInit { .. }
                | AstNodeKind::Symbol { .. }
                | AstNodeKind::IntLiteral { .. }
                | AstNodeKind::FloatLiteral { .. }
                | AstNodeKind::StringLiteral { .. }
                | AstNodeKind::BoolLiteral { .. }
                | AstNodeKind::NullLiteral
                | AstNodeKind::UndefinedLiteral
                | AstNodeKind::ErrorValue { .. }
        )
    }

    /// Nodes that can be the target of an assignment or `&`.
    pub fn is_lvalue(&self) -> bool {
        match self {
            AstNodeKind::Symbol { .. }
            | AstNodeKind::FieldAccess { .. }
            | AstNodeKind::ArrayAccess { .. } => true,
            AstNodeKind::UnaryOp { op, .. } => *op == UnaryOperator::Deref,
            _ => false,
        }
    }
}

use std::fmt;

impl fmt::Display for AstNodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AstNodeKind::Root { .. } => "Root",
            AstNodeKind::FnDecl { .. } => "FnDecl",
            AstNodeKind::Param { .. } => "Param",
            AstNodeKind::VarDecl { .. } => "VarDecl",
            AstNodeKind::TestDecl { .. } => "TestDecl",
            AstNodeKind::ContainerDecl { .. } => "ContainerDecl",
            AstNodeKind::ContainerField { .. } => "ContainerField",
            AstNodeKind::ErrorSetDecl { .. } => "ErrorSetDecl",
            AstNodeKind::Block { .. } => "Block",
            AstNodeKind::Comptime { .. } => "Comptime",
            AstNodeKind::Defer { .. } => "Defer",
            AstNodeKind::If { .. } => "If",
            AstNodeKind::While { .. } => "While",
            AstNodeKind::For { .. } => "For",
            AstNodeKind::Break { .. } => "Break",
            AstNodeKind::Continue { .. } => "Continue",
            AstNodeKind::Return { .. } => "Return",
            AstNodeKind::Unreachable => "Unreachable",
            AstNodeKind::Suspend { .. } => "Suspend",
            AstNodeKind::Asm { .. } => "Asm",
            AstNodeKind::Assign { .. } => "Assign",
            AstNodeKind::AssignOp { .. } => "AssignOp",
            AstNodeKind::BinaryOp { .. } => "BinaryOp",
            AstNodeKind::UnaryOp { .. } => "UnaryOp",
            AstNodeKind::Call { .. } => "Call",
            AstNodeKind::BuiltinCall { .. } => "BuiltinCall",
            AstNodeKind::FieldAccess { .. } => "FieldAccess",
            AstNodeKind::ArrayAccess { .. } => "ArrayAccess",
            AstNodeKind::Try { .. } => "Try",
            AstNodeKind::Catch { .. } => "Catch",
            AstNodeKind::StructInit { .. } => "StructInit",
            AstNodeKind::ArrayInit { .. } => "ArrayInit",
            AstNodeKind::Symbol { .. } => "Symbol",
            AstNodeKind::IntLiteral { .. } => "IntLiteral",
            AstNodeKind::FloatLiteral { .. } => "FloatLiteral",
            AstNodeKind::StringLiteral { .. } => "StringLiteral",
            AstNodeKind::BoolLiteral { .. } => "BoolLiteral",
            AstNodeKind::NullLiteral => "NullLiteral",
            AstNodeKind::UndefinedLiteral => "UndefinedLiteral",
            AstNodeKind::ErrorValue { .. } => "ErrorValue",
        };
        write!(f, "{}", name)
    }
}
