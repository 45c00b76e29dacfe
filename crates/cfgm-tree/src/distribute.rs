//! Dominant-kind selection.
//!
//! Several consumers (null assignment, dumping, JSON export) need to treat a
//! multi-kind node as a single value. The precedence is fixed:
//! object (or object prototype), string, int, float, bool, list (or list
//! prototype).

use crate::kind::NodeKind;
use crate::node::Node;

/// Pick the kind a node is treated as when a single value is needed.
///
/// Returns `None` for a node with no value kinds. The returned kind is always
/// one of `Obj`, `String`, `Int`, `Float`, `Bool`, `List`.
pub fn dominant_kind(node: &Node) -> Option<NodeKind> {
    if node.has(NodeKind::ObjPrototype) || node.has(NodeKind::Obj) {
        Some(NodeKind::Obj)
    } else if node.has(NodeKind::String) {
        Some(NodeKind::String)
    } else if node.has(NodeKind::Int) {
        Some(NodeKind::Int)
    } else if node.has(NodeKind::Float) {
        Some(NodeKind::Float)
    } else if node.has(NodeKind::Bool) {
        Some(NodeKind::Bool)
    } else if node.has(NodeKind::ListPrototype) || node.has(NodeKind::List) {
        Some(NodeKind::List)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_node_has_no_dominant_kind() {
        assert_eq!(dominant_kind(&Node::new()), None);
    }

    #[test]
    fn test_int_beats_float() {
        let mut node = Node::new();
        node.set_float(1.0);
        node.set_int(1);
        assert_eq!(dominant_kind(&node), Some(NodeKind::Int));
    }

    #[test]
    fn test_prototype_alone_selects_collection() {
        let mut node = Node::new();
        node.set_list_prototype(Node::new());
        assert_eq!(dominant_kind(&node), Some(NodeKind::List));

        node.set_obj_prototype(Node::new());
        assert_eq!(dominant_kind(&node), Some(NodeKind::Obj));
    }

    #[test]
    fn test_string_beats_scalars() {
        let mut node = Node::new();
        node.set_bool(true);
        node.set_string("s");
        assert_eq!(dominant_kind(&node), Some(NodeKind::String));
    }
}
