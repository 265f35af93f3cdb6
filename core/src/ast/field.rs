use std::borrow::Cow;

use super::kind::AstNodeKind;
use super::node::AstNode;

/// Rewrites a field-style member (as written inside an error set) into the
/// plain `Symbol` shape the rest of the lowering expects.
///
/// Nodes that already are symbols are returned borrowed. Anything that is not
/// a field or symbol yields `None`.
pub fn ast_field_to_symbol_node(node: &AstNode) -> Option<Cow<'_, AstNode>> {
    match &node.kind {
        AstNodeKind::Symbol { .. } => Some(Cow::Borrowed(node)),
        AstNodeKind::ContainerField { name, .. } => {
            let symbol = AstNode::new(
                AstNodeKind::Symbol { name: name.clone() },
                node.location.clone(),
                node.span.clone(),
            );
            Some(Cow::Owned(symbol))
        }
        _ => None,
    }
}

/// Name carried by an error-set member, in either surface form.
pub fn member_name(node: &AstNode) -> Option<&str> {
    match &node.kind {
        AstNodeKind::Symbol { name } | AstNodeKind::ContainerField { name, .. } => Some(name),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Location;

    #[test]
    fn symbol_is_borrowed() {
        let node = AstNode::new(AstNodeKind::Symbol { name: "A".into() }, None, None);
        let out = ast_field_to_symbol_node(&node).unwrap();
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn field_becomes_symbol_with_same_location() {
        let loc = Location::new("e.zig", 3, 5);
        let node = AstNode::new(
            AstNodeKind::ContainerField { name: "OutOfMemory".into(), type_expr: None, default_value: None },
            Some(loc.clone()),
            None,
        );
        let out = ast_field_to_symbol_node(&node).unwrap();
        assert_eq!(out.kind, AstNodeKind::Symbol { name: "OutOfMemory".into() });
        assert_eq!(out.location, Some(loc));
    }

    #[test]
    fn other_nodes_are_rejected() {
        let node = AstNode::new(AstNodeKind::IntLiteral { value: 1 }, None, None);
        assert!(ast_field_to_symbol_node(&node).is_none());
    }
}
