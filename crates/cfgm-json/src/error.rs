//! Lexical and syntactic errors.
//!
//! Every error carries a 1-based line and column. For parse errors the
//! position is where the offending token starts.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LexError {
    #[error("unexpected character '{ch}' at line {line}, column {column}")]
    UnexpectedCharacter { line: usize, column: usize, ch: char },

    #[error("unexpected end of input at line {line}, column {column}: {source}")]
    UnexpectedEnd {
        line: usize,
        column: usize,
        #[source]
        source: io::Error,
    },

    #[error("invalid number '{text}' at line {line}, column {column}")]
    InvalidNumber {
        line: usize,
        column: usize,
        text: String,
    },
}

impl LexError {
    pub fn position(&self) -> (usize, usize) {
        match self {
            Self::UnexpectedCharacter { line, column, .. }
            | Self::UnexpectedEnd { line, column, .. }
            | Self::InvalidNumber { line, column, .. } => (*line, *column),
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("parsing error at line {line}, column {column}: {source}")]
    Lex {
        line: usize,
        column: usize,
        #[source]
        source: LexError,
    },

    #[error("unexpected token ({token}) at line {line}, column {column}")]
    UnexpectedToken {
        line: usize,
        column: usize,
        token: String,
    },

    #[error("duplicate key ({key}) at line {line}, column {column}")]
    DuplicateKey {
        line: usize,
        column: usize,
        key: String,
    },
}

impl ParseError {
    /// Start position of the offending token.
    pub fn position(&self) -> (usize, usize) {
        match self {
            Self::Lex { line, column, .. }
            | Self::UnexpectedToken { line, column, .. }
            | Self::DuplicateKey { line, column, .. } => (*line, *column),
        }
    }
}
