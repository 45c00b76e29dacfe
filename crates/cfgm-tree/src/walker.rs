//! Cursors over a value tree.
//!
//! [`Walker`] is the writing cursor. It is bound to one priority stamp; every
//! write stamps the current node and its ancestors with that priority, and
//! entering a collection flagged clear-when-enter discards the old children
//! the first time the collection is entered at a new priority.
//!
//! [`Reader`] is the read-only cursor used for projection. It can only probe
//! (`try_enter_*`), read and exit, so a tree shared between decode passes is
//! never written.

use crate::kind::{ModifyTime, NodeKind};
use crate::node::{Node, NodeObj};

const PATH_INVARIANT: &str = "walker path always resolves to an existing node";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Key(String),
    Index(usize),
    ObjPrototype,
    ListPrototype,
}

fn child<'n>(node: &'n Node, step: &Step) -> Option<&'n Node> {
    match step {
        Step::Key(key) => node.obj().get(key),
        Step::Index(index) => node.list().get(*index),
        Step::ObjPrototype => node.obj_prototype(),
        Step::ListPrototype => node.list_prototype(),
    }
}

fn child_mut<'n>(node: &'n mut Node, step: &Step) -> Option<&'n mut Node> {
    match step {
        Step::Key(key) => node.obj_storage_mut().get_mut(key),
        Step::Index(index) => node.list_storage_mut().get_mut(*index),
        Step::ObjPrototype => node.obj_prototype_mut(),
        Step::ListPrototype => node.list_prototype_mut(),
    }
}

/// Writing cursor over an owned tree.
///
/// The cursor keeps the path from the root to the current node instead of
/// parent references; each operation re-resolves that path.
#[derive(Debug)]
pub struct Walker<'a> {
    root: &'a mut Node,
    path: Vec<Step>,
    time: ModifyTime,
}

impl<'a> Walker<'a> {
    /// Start a cursor at `root` that stamps every write with `time`.
    pub fn new(root: &'a mut Node, time: ModifyTime) -> Self {
        Self {
            root,
            path: Vec::new(),
            time,
        }
    }

    /// The priority this cursor writes at.
    pub fn time(&self) -> ModifyTime {
        self.time
    }

    /// Number of enters not yet matched by an exit.
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// The node under the cursor.
    pub fn node(&self) -> &Node {
        let mut node: &Node = &*self.root;
        for step in &self.path {
            node = child(node, step).expect(PATH_INVARIANT);
        }
        node
    }

    fn node_mut(&mut self) -> &mut Node {
        let mut node: &mut Node = &mut *self.root;
        for step in &self.path {
            node = child_mut(node, step).expect(PATH_INVARIANT);
        }
        node
    }

    /// Stamp the current node, then its ancestors from the parent upward,
    /// stopping at the first ancestor that already carries the stamp.
    fn stamp(&mut self) {
        let time = self.time;

        let mut floor = None;
        let mut node: &Node = &*self.root;
        for (depth, step) in self.path.iter().enumerate() {
            if node.modify_time() == time {
                floor = Some(depth);
            }
            node = child(node, step).expect(PATH_INVARIANT);
        }

        let start = floor.map_or(0, |depth| depth + 1);
        let mut node: &mut Node = &mut *self.root;
        for (depth, step) in self.path.iter().enumerate() {
            if depth >= start {
                node.set_modify_time(time);
            }
            node = child_mut(node, step).expect(PATH_INVARIANT);
        }
        node.set_modify_time(time);
    }

    fn needs_clear(node: &Node, kind: NodeKind, time: ModifyTime) -> bool {
        node.clear_when_enter_for(kind) && node.modify_time() != time
    }

    // <<<==== reads ====>>>

    pub fn has(&self, kind: NodeKind) -> bool {
        self.node().has(kind)
    }

    pub fn is_null_for(&self, kind: NodeKind) -> bool {
        self.node().is_null_for(kind)
    }

    pub fn nullable_for(&self, kind: NodeKind) -> bool {
        self.node().nullable_for(kind)
    }

    pub fn clear_when_enter_for(&self, kind: NodeKind) -> bool {
        self.node().clear_when_enter_for(kind)
    }

    pub fn modify_time(&self) -> ModifyTime {
        self.node().modify_time()
    }

    pub fn obj_keys(&self) -> Vec<String> {
        let node = self.node();
        if !node.has(NodeKind::Obj) {
            return Vec::new();
        }
        node.obj().keys().cloned().collect()
    }

    pub fn list_len(&self) -> usize {
        let node = self.node();
        if node.has(NodeKind::List) {
            node.list().len()
        } else {
            0
        }
    }

    // <<<==== probes ====>>>

    pub fn try_enter_obj(&mut self, key: &str) -> bool {
        let node = self.node();
        if !node.has(NodeKind::Obj) || !node.obj().contains_key(key) {
            return false;
        }
        self.path.push(Step::Key(key.to_owned()));
        true
    }

    pub fn try_enter_list(&mut self, index: usize) -> bool {
        let node = self.node();
        if !node.has(NodeKind::List) || index >= node.list().len() {
            return false;
        }
        self.path.push(Step::Index(index));
        true
    }

    pub fn try_enter_obj_prototype(&mut self) -> bool {
        if self.node().obj_prototype().is_none() {
            return false;
        }
        self.path.push(Step::ObjPrototype);
        true
    }

    pub fn try_enter_list_prototype(&mut self) -> bool {
        if self.node().list_prototype().is_none() {
            return false;
        }
        self.path.push(Step::ListPrototype);
        true
    }

    // <<<==== creating enters ====>>>

    /// Descend into the child under `key`, creating it if absent.
    ///
    /// If the object is flagged clear-when-enter and was last touched at a
    /// different priority, its existing children are discarded first.
    pub fn enter_obj(&mut self, key: &str) {
        let time = self.time;
        let node = self.node_mut();
        let created = if !node.has(NodeKind::Obj) || Self::needs_clear(node, NodeKind::Obj, time) {
            let mut obj = NodeObj::new();
            obj.insert(key.to_owned(), Node::new());
            node.set_obj(obj);
            true
        } else if !node.obj().contains_key(key) {
            node.obj_storage_mut().insert(key.to_owned(), Node::new());
            true
        } else {
            false
        };
        if created {
            self.stamp();
        }
        self.path.push(Step::Key(key.to_owned()));
    }

    /// Descend into element `index`, filling any gap with empty nodes.
    ///
    /// Clear-when-enter applies the same way as for [`Walker::enter_obj`].
    pub fn enter_list(&mut self, index: usize) {
        let time = self.time;
        let node = self.node_mut();
        let created = if !node.has(NodeKind::List) || Self::needs_clear(node, NodeKind::List, time) {
            node.set_list((0..=index).map(|_| Node::new()).collect());
            true
        } else if index >= node.list().len() {
            node.list_storage_mut().resize_with(index + 1, Node::new);
            true
        } else {
            false
        };
        if created {
            self.stamp();
        }
        self.path.push(Step::Index(index));
    }

    pub fn enter_obj_prototype(&mut self) {
        let node = self.node_mut();
        if node.obj_prototype().is_none() {
            node.set_obj_prototype(Node::new());
            self.stamp();
        }
        self.path.push(Step::ObjPrototype);
    }

    pub fn enter_list_prototype(&mut self) {
        let node = self.node_mut();
        if node.list_prototype().is_none() {
            node.set_list_prototype(Node::new());
            self.stamp();
        }
        self.path.push(Step::ListPrototype);
    }

    /// Return to the parent node.
    ///
    /// # Panics
    /// Panics when the cursor is already at the root; every exit must match
    /// an earlier enter.
    pub fn exit(&mut self) {
        if self.path.pop().is_none() {
            panic!("Walker::exit called at the root");
        }
    }

    // <<<==== writes ====>>>

    pub fn set_desc(&mut self, value: impl Into<String>) {
        self.node_mut().set_desc(value);
        self.stamp();
    }

    pub fn set_int(&mut self, value: i64) {
        self.node_mut().set_int(value);
        self.stamp();
    }

    pub fn set_float(&mut self, value: f64) {
        self.node_mut().set_float(value);
        self.stamp();
    }

    pub fn set_bool(&mut self, value: bool) {
        self.node_mut().set_bool(value);
        self.stamp();
    }

    pub fn set_string(&mut self, value: impl Into<String>) {
        self.node_mut().set_string(value);
        self.stamp();
    }

    pub fn set_null_for(&mut self, kind: NodeKind, value: bool) {
        self.node_mut().set_null_for(kind, value);
        self.stamp();
    }

    /// Drop the null flag for `kind` if it is set; a no-op otherwise.
    ///
    /// Used after writing into a collection, so that a collection that
    /// defaulted to null takes the values written into it.
    pub fn clear_null_for(&mut self, kind: NodeKind) {
        if self.is_null_for(kind) {
            self.set_null_for(kind, false);
        }
    }

    pub fn set_nullable_for(&mut self, kind: NodeKind, value: bool) {
        self.node_mut().set_nullable_for(kind, value);
        self.stamp();
    }

    pub fn set_clear_when_enter_for(&mut self, kind: NodeKind, value: bool) {
        self.node_mut().set_clear_when_enter_for(kind, value);
        self.stamp();
    }

    pub fn delete(&mut self, kind: NodeKind) {
        self.node_mut().delete(kind);
        self.stamp();
    }
}

/// Read-only cursor.
///
/// Holds shared borrows only, so any number of readers may walk the same
/// tree from different threads.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    current: &'a Node,
    stack: Vec<&'a Node>,
}

impl<'a> Reader<'a> {
    pub fn new(root: &'a Node) -> Self {
        Self {
            current: root,
            stack: Vec::new(),
        }
    }

    /// The node under the cursor.
    pub fn node(&self) -> &'a Node {
        self.current
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn has(&self, kind: NodeKind) -> bool {
        self.current.has(kind)
    }

    pub fn is_null_for(&self, kind: NodeKind) -> bool {
        self.current.is_null_for(kind)
    }

    pub fn nullable_for(&self, kind: NodeKind) -> bool {
        self.current.nullable_for(kind)
    }

    pub fn modify_time(&self) -> ModifyTime {
        self.current.modify_time()
    }

    pub fn desc(&self) -> &'a str {
        self.current.desc()
    }

    pub fn int(&self) -> i64 {
        self.current.int()
    }

    pub fn float(&self) -> f64 {
        self.current.float()
    }

    pub fn boolean(&self) -> bool {
        self.current.boolean()
    }

    pub fn string(&self) -> &'a str {
        self.current.string()
    }

    /// Keys of the current object, empty when the node has no object kind.
    pub fn obj_keys(&self) -> Vec<&'a str> {
        if !self.current.has(NodeKind::Obj) {
            return Vec::new();
        }
        self.current.obj().keys().map(String::as_str).collect()
    }

    pub fn list_len(&self) -> usize {
        if self.current.has(NodeKind::List) {
            self.current.list().len()
        } else {
            0
        }
    }

    fn descend(&mut self, next: Option<&'a Node>) -> bool {
        match next {
            Some(next) => {
                self.stack.push(self.current);
                self.current = next;
                true
            }
            None => false,
        }
    }

    pub fn try_enter_obj(&mut self, key: &str) -> bool {
        let next = if self.current.has(NodeKind::Obj) {
            self.current.obj().get(key)
        } else {
            None
        };
        self.descend(next)
    }

    pub fn try_enter_list(&mut self, index: usize) -> bool {
        let next = if self.current.has(NodeKind::List) {
            self.current.list().get(index)
        } else {
            None
        };
        self.descend(next)
    }

    pub fn try_enter_obj_prototype(&mut self) -> bool {
        let next = self.current.obj_prototype();
        self.descend(next)
    }

    pub fn try_enter_list_prototype(&mut self) -> bool {
        let next = self.current.list_prototype();
        self.descend(next)
    }

    /// Return to the parent node.
    ///
    /// # Panics
    /// Panics when the cursor is already at the root.
    pub fn exit(&mut self) {
        match self.stack.pop() {
            Some(parent) => self.current = parent,
            None => panic!("Reader::exit called at the root"),
        }
    }
}
