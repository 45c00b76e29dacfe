//! Command-line property assignments.
//!
//! Each `-D<path>[=<value>]` argument names a node by a dotted path; list
//! elements are addressed with `[n]`, and `[+n]` or a negative `n` counts
//! from the list's length at the time the assignment is applied. Parsed
//! assignments collect in a [`PropertyTree`], which is later written into
//! the value tree at the command-line priority.

mod fix;
mod parse;

pub use fix::MAX_INDEX_GROWTH;
pub use parse::{parse_command_line, CommandLine, PropertyTree, Segment};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PropertyError {
    #[error("property conflict at {path}")]
    Conflict { path: String },

    #[error("invalid property: {property}")]
    Invalid { property: String },
}
