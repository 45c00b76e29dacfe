//! Node kinds, kind sets and priority stamps.

use std::fmt;

/// One facet of a [`Node`](crate::Node).
///
/// A node may carry any combination of kinds at once; each is tracked by its
/// own presence flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Desc,
    Int,
    Float,
    Bool,
    String,
    Obj,
    List,
    ObjPrototype,
    ListPrototype,
}

impl NodeKind {
    /// Every kind, in flag-bit order.
    pub const ALL: [NodeKind; 9] = [
        NodeKind::Desc,
        NodeKind::Int,
        NodeKind::Float,
        NodeKind::Bool,
        NodeKind::String,
        NodeKind::Obj,
        NodeKind::List,
        NodeKind::ObjPrototype,
        NodeKind::ListPrototype,
    ];

    const fn bit(self) -> u16 {
        match self {
            NodeKind::Desc => 1 << 0,
            NodeKind::Int => 1 << 1,
            NodeKind::Float => 1 << 2,
            NodeKind::Bool => 1 << 3,
            NodeKind::String => 1 << 4,
            NodeKind::Obj => 1 << 5,
            NodeKind::List => 1 << 6,
            NodeKind::ObjPrototype => 1 << 7,
            NodeKind::ListPrototype => 1 << 8,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Desc => write!(f, "desc"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::Bool => write!(f, "bool"),
            Self::String => write!(f, "string"),
            Self::Obj => write!(f, "obj"),
            Self::List => write!(f, "list"),
            Self::ObjPrototype => write!(f, "obj-prototype"),
            Self::ListPrototype => write!(f, "list-prototype"),
        }
    }
}

/// A small bit set of [`NodeKind`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct KindSet(u16);

impl KindSet {
    pub const EMPTY: KindSet = KindSet(0);

    pub fn contains(self, kind: NodeKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn insert(&mut self, kind: NodeKind) {
        self.0 |= kind.bit();
    }

    pub fn remove(&mut self, kind: NodeKind) {
        self.0 &= !kind.bit();
    }

    pub fn set(&mut self, kind: NodeKind, value: bool) {
        if value {
            self.insert(kind);
        } else {
            self.remove(kind);
        }
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate the kinds in this set in flag-bit order.
    pub fn iter(self) -> impl Iterator<Item = NodeKind> {
        NodeKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

impl FromIterator<NodeKind> for KindSet {
    fn from_iter<I: IntoIterator<Item = NodeKind>>(iter: I) -> Self {
        let mut set = KindSet::EMPTY;
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

/// Priority stamp recording which merge stage last touched a node.
///
/// Stages use strictly increasing values. [`ModifyTime::UNSET`] marks a node
/// nothing has written yet; [`ModifyTime::READONLY`] never matches a write
/// stage and is used by read-only traversals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModifyTime(pub i32);

impl ModifyTime {
    pub const UNSET: ModifyTime = ModifyTime(0);
    pub const READONLY: ModifyTime = ModifyTime(-1);
}

impl fmt::Display for ModifyTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
