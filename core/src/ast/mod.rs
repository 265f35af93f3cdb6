//! Input syntax tree. Produced by an external parser; the lowering pass only
//! reads it.

pub mod field;
pub mod kind;
pub mod node;

pub use field::{ast_field_to_symbol_node, member_name};
pub use kind::{
    AstNodeKind, BinaryOperator, CallModifier, ContainerKind, DeferKind, FieldInit, UnaryOperator,
};
pub use node::AstNode;

use serde::Deserialize;

/// Deserializes a tree from the JSON form emitted by the parser.
///
/// Nesting is bounded by `LowerOptions::max_depth` during lowering, not by
/// the JSON reader, so the reader grows its stack on demand instead.
pub fn ast_from_json(source: &str) -> Result<AstNode, serde_json::Error> {
    let mut de = serde_json::Deserializer::from_str(source);
    de.disable_recursion_limit();
    let node = AstNode::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    de.end()?;
    Ok(node)
}
