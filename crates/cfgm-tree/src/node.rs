//! The value tree node.
//!
//! A [`Node`] holds up to seven value kinds at once plus two prototype
//! children. Every kind has independent presence (`has`), null, and nullable
//! flags; collections additionally carry a clear-when-enter flag. The node
//! performs no validation: mixing kinds is legal, and an integer literal is
//! stored as both `Int` and `Float`.

use std::collections::BTreeMap;

use crate::kind::{KindSet, ModifyTime, NodeKind};

/// Keyed children of a node.
pub type NodeObj = BTreeMap<String, Node>;

/// Indexed children of a node.
pub type NodeList = Vec<Node>;

#[derive(Debug, Clone, Default)]
pub struct Node {
    has: KindSet,
    null: KindSet,
    nullable: KindSet,
    clear_when_enter: KindSet,
    modify_time: ModifyTime,

    desc: String,
    int: i64,
    float: f64,
    boolean: bool,
    string: String,
    obj: NodeObj,
    list: NodeList,

    obj_prototype: Option<Box<Node>>,
    list_prototype: Option<Box<Node>>,
}

impl Node {
    /// Create an empty node: no kinds, no flags, never modified.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, kind: NodeKind) -> bool {
        self.has.contains(kind)
    }

    /// The set of populated kinds.
    pub fn kinds(&self) -> KindSet {
        self.has
    }

    pub fn is_null_for(&self, kind: NodeKind) -> bool {
        self.null.contains(kind)
    }

    pub fn nullable_for(&self, kind: NodeKind) -> bool {
        self.nullable.contains(kind)
    }

    pub fn clear_when_enter_for(&self, kind: NodeKind) -> bool {
        self.clear_when_enter.contains(kind)
    }

    pub fn modify_time(&self) -> ModifyTime {
        self.modify_time
    }

    pub fn set_modify_time(&mut self, time: ModifyTime) {
        self.modify_time = time;
    }

    /// Clear the presence flag for `kind`.
    ///
    /// Null and nullable flags are left alone, and the stored value is kept
    /// so a later write can reuse it.
    pub fn delete(&mut self, kind: NodeKind) {
        self.has.remove(kind);
    }

    // <<<==== getters ====>>>

    pub fn desc(&self) -> &str {
        &self.desc
    }

    pub fn int(&self) -> i64 {
        self.int
    }

    pub fn float(&self) -> f64 {
        self.float
    }

    pub fn boolean(&self) -> bool {
        self.boolean
    }

    pub fn string(&self) -> &str {
        &self.string
    }

    pub fn obj(&self) -> &NodeObj {
        &self.obj
    }

    pub fn list(&self) -> &[Node] {
        &self.list
    }

    pub fn obj_prototype(&self) -> Option<&Node> {
        if self.has(NodeKind::ObjPrototype) {
            self.obj_prototype.as_deref()
        } else {
            None
        }
    }

    pub fn list_prototype(&self) -> Option<&Node> {
        if self.has(NodeKind::ListPrototype) {
            self.list_prototype.as_deref()
        } else {
            None
        }
    }

    // <<<==== setters ====>>>

    pub fn set_desc(&mut self, value: impl Into<String>) {
        self.desc = value.into();
        self.has.insert(NodeKind::Desc);
    }

    pub fn set_int(&mut self, value: i64) {
        self.int = value;
        self.has.insert(NodeKind::Int);
    }

    pub fn set_float(&mut self, value: f64) {
        self.float = value;
        self.has.insert(NodeKind::Float);
    }

    pub fn set_bool(&mut self, value: bool) {
        self.boolean = value;
        self.has.insert(NodeKind::Bool);
    }

    pub fn set_string(&mut self, value: impl Into<String>) {
        self.string = value.into();
        self.has.insert(NodeKind::String);
    }

    pub fn set_obj(&mut self, value: NodeObj) {
        self.obj = value;
        self.has.insert(NodeKind::Obj);
    }

    pub fn set_list(&mut self, value: NodeList) {
        self.list = value;
        self.has.insert(NodeKind::List);
    }

    pub fn set_obj_prototype(&mut self, value: Node) {
        self.obj_prototype = Some(Box::new(value));
        self.has.insert(NodeKind::ObjPrototype);
    }

    pub fn set_list_prototype(&mut self, value: Node) {
        self.list_prototype = Some(Box::new(value));
        self.has.insert(NodeKind::ListPrototype);
    }

    pub fn set_null_for(&mut self, kind: NodeKind, value: bool) {
        self.null.set(kind, value);
    }

    pub fn set_nullable_for(&mut self, kind: NodeKind, value: bool) {
        self.nullable.set(kind, value);
    }

    pub fn set_clear_when_enter_for(&mut self, kind: NodeKind, value: bool) {
        self.clear_when_enter.set(kind, value);
    }

    // <<<==== crate-internal child access for cursors ====>>>

    pub(crate) fn obj_storage_mut(&mut self) -> &mut NodeObj {
        &mut self.obj
    }

    pub(crate) fn list_storage_mut(&mut self) -> &mut NodeList {
        &mut self.list
    }

    pub(crate) fn obj_prototype_mut(&mut self) -> Option<&mut Node> {
        if self.has(NodeKind::ObjPrototype) {
            self.obj_prototype.as_deref_mut()
        } else {
            None
        }
    }

    pub(crate) fn list_prototype_mut(&mut self) -> Option<&mut Node> {
        if self.has(NodeKind::ListPrototype) {
            self.list_prototype.as_deref_mut()
        } else {
            None
        }
    }

    /// Export the value content as a `serde_json::Value`.
    ///
    /// The dominant kind decides the JSON shape; prototypes, descriptions and
    /// flags are dropped. A kind marked null exports as JSON `null`.
    pub fn to_json_value(&self) -> serde_json::Value {
        use serde_json::Value;

        let Some(kind) = crate::dominant_kind(self) else {
            return Value::Null;
        };
        if self.is_null_for(kind) {
            return Value::Null;
        }
        match kind {
            NodeKind::Obj => Value::Object(if self.has(NodeKind::Obj) {
                self.obj
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json_value()))
                    .collect()
            } else {
                serde_json::Map::new()
            }),
            NodeKind::List => Value::Array(if self.has(NodeKind::List) {
                self.list.iter().map(Node::to_json_value).collect()
            } else {
                Vec::new()
            }),
            NodeKind::String => Value::String(self.string.clone()),
            NodeKind::Int => Value::Number(self.int.into()),
            NodeKind::Float => serde_json::Number::from_f64(self.float)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            NodeKind::Bool => Value::Bool(self.boolean),
            _ => Value::Null,
        }
    }
}

/// Structural equality: same flags, same stamp, equal values for every
/// populated kind. Storage behind a cleared presence flag is ignored.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        if self.has != other.has
            || self.null != other.null
            || self.nullable != other.nullable
            || self.clear_when_enter != other.clear_when_enter
            || self.modify_time != other.modify_time
        {
            return false;
        }
        self.has.iter().all(|kind| match kind {
            NodeKind::Desc => self.desc == other.desc,
            NodeKind::Int => self.int == other.int,
            NodeKind::Float => self.float == other.float,
            NodeKind::Bool => self.boolean == other.boolean,
            NodeKind::String => self.string == other.string,
            NodeKind::Obj => self.obj == other.obj,
            NodeKind::List => self.list == other.list,
            NodeKind::ObjPrototype => self.obj_prototype == other.obj_prototype,
            NodeKind::ListPrototype => self.list_prototype == other.list_prototype,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_implies_has() {
        let mut node = Node::new();
        assert!(node.kinds().is_empty());

        node.set_int(5);
        node.set_string("x");
        node.set_bool(true);
        assert!(node.has(NodeKind::Int));
        assert!(node.has(NodeKind::String));
        assert!(node.has(NodeKind::Bool));
        assert!(!node.has(NodeKind::Float));
    }

    #[test]
    fn test_delete_only_clears_presence() {
        let mut node = Node::new();
        node.set_int(5);
        node.set_float(5.0);
        node.set_nullable_for(NodeKind::Int, true);
        node.set_null_for(NodeKind::Int, true);

        node.delete(NodeKind::Int);

        assert!(!node.has(NodeKind::Int));
        assert!(node.has(NodeKind::Float));
        assert!(node.is_null_for(NodeKind::Int));
        assert!(node.nullable_for(NodeKind::Int));
        // storage is retained for reuse
        assert_eq!(node.int(), 5);
    }

    #[test]
    fn test_prototype_hidden_after_delete() {
        let mut node = Node::new();
        let mut proto = Node::new();
        proto.set_int(1);
        node.set_obj_prototype(proto);
        assert_eq!(node.obj_prototype().map(Node::int), Some(1));

        node.delete(NodeKind::ObjPrototype);
        assert!(node.obj_prototype().is_none());
    }

    #[test]
    fn test_equality_ignores_deleted_storage() {
        let mut left = Node::new();
        left.set_int(1);
        left.delete(NodeKind::Int);
        let right = Node::new();
        assert_eq!(left, right);

        let mut stamped = Node::new();
        stamped.set_modify_time(ModifyTime(2));
        assert_ne!(stamped, right);
    }

    #[test]
    fn test_to_json_value() {
        let mut root = Node::new();
        let mut port = Node::new();
        port.set_int(8080);
        port.set_float(8080.0);
        let mut host = Node::new();
        host.set_string("localhost");
        let mut tags = Node::new();
        let mut tag = Node::new();
        tag.set_bool(true);
        tags.set_list(vec![tag]);
        let mut obj = NodeObj::new();
        obj.insert("port".to_string(), port);
        obj.insert("host".to_string(), host);
        obj.insert("tags".to_string(), tags);
        root.set_obj(obj);

        let value = root.to_json_value();
        assert_eq!(value["port"], 8080);
        assert_eq!(value["host"], "localhost");
        assert_eq!(value["tags"][0], true);
    }

    #[test]
    fn test_to_json_value_null() {
        let mut node = Node::new();
        node.set_string("");
        node.set_nullable_for(NodeKind::String, true);
        node.set_null_for(NodeKind::String, true);
        assert!(node.to_json_value().is_null());
    }
}
