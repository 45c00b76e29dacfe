//! Relaxed JSON front end for cfgm value trees.
//!
//! [`merge`] and [`merge_str`] parse a document straight into a
//! [`cfgm_tree::Node`] at a given priority; [`dump_to_string`] renders a
//! tree back to annotated JSON.

mod chars;
mod dump;
mod error;
mod parser;
mod token;

pub use chars::Utf8Chars;
pub use dump::{dump_to_string, dump_to_writer, Dumper, DEFAULT_PROTOTYPE_LABEL};
pub use error::{LexError, ParseError};
pub use parser::{merge, merge_at, merge_str, Parser};
pub use token::{StrChars, Token, Tokenizer};
