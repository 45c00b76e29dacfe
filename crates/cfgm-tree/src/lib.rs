//! Value tree for layered configuration.
//!
//! This crate implements the node model every merge stage writes into:
//! a sparse multi-kind [`Node`], the priority-stamping [`Walker`] cursor that
//! creates children lazily, and the read-only [`Reader`] used when the merged
//! tree is projected back onto native values.

mod distribute;
mod kind;
mod node;
mod walker;

pub use distribute::dominant_kind;
pub use kind::{KindSet, ModifyTime, NodeKind};
pub use node::{Node, NodeList, NodeObj};
pub use walker::{Reader, Walker};
