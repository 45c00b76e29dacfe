//! Top-level error type.
//!
//! A stage failure is handed to every pending callback, so `Error` is cheap
//! to clone: non-clonable sources are shared behind `Arc`. Equality on those
//! variants is identity of the shared source, which is what lets `init`
//! collapse one broadcast failure back into a single entry.

use std::io;
use std::sync::Arc;

use cfgm_json::ParseError;

use crate::codec::CodecError;
use crate::property::PropertyError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(Arc<ParseError>),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Property(#[from] PropertyError),

    #[error("unsupported file type: {path}")]
    UnsupportedFileType { path: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("{0}")]
    Callback(String),

    #[error("registration at '{path}' panicked: {message}")]
    Panicked { path: String, message: String },
}

impl Error {
    /// Error returned from a completion callback.
    pub fn callback(message: impl std::fmt::Display) -> Self {
        Self::Callback(message.to_string())
    }

    pub(crate) fn io(path: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Self::Parse(Arc::new(e))
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Parse(a), Self::Parse(b)) => Arc::ptr_eq(a, b),
            (Self::Codec(a), Self::Codec(b)) => a == b,
            (Self::Property(a), Self::Property(b)) => a == b,
            (Self::UnsupportedFileType { path: a }, Self::UnsupportedFileType { path: b }) => {
                a == b
            }
            (
                Self::Io {
                    path: a,
                    source: x,
                },
                Self::Io {
                    path: b,
                    source: y,
                },
            ) => a == b && Arc::ptr_eq(x, y),
            (Self::Callback(a), Self::Callback(b)) => a == b,
            (
                Self::Panicked { path, message },
                Self::Panicked {
                    path: other_path,
                    message: other_message,
                },
            ) => path == other_path && message == other_message,
            _ => false,
        }
    }
}

/// Keep the first occurrence of each distinct error, in order.
pub(crate) fn dedup_errors(errors: impl IntoIterator<Item = Error>) -> Vec<Error> {
    let mut unique: Vec<Error> = Vec::new();
    for error in errors {
        if !unique.contains(&error) {
            unique.push(error);
        }
    }
    unique
}
