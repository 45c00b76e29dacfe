//! Conversion between native values and the value tree.
//!
//! Encoding writes a value's defaults through a [`Walker`] at the build
//! priority. Decoding reads the merged tree back, skipping every node whose
//! stamp still equals the build priority: nothing overrode it, so the native
//! value already holds the right content and is left untouched.
//!
//! `Option<T>` plays the role of a nullable pointer. A record field may nest
//! it twice; a collection element only once.

mod collection;
mod record;
mod scalar;

use cfgm_tree::{ModifyTime, Node, NodeKind, Reader, Walker};

pub use collection::{ProtoMap, ProtoVec};
pub use record::{decode_field, encode_field, finish_record};

/// Deepest `Option` nesting allowed for a record field.
pub const MAX_FIELD_POINTER_DEPTH: usize = 2;

/// Deepest `Option` nesting allowed for a collection element.
pub const MAX_ELEMENT_POINTER_DEPTH: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("{level}-level pointer is not allowed for {context}")]
    PointerDepth { level: usize, context: &'static str },

    #[error("value {value} does not fit in {target}")]
    OutOfRange { value: String, target: &'static str },
}

/// Null flags written alongside a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Nullness {
    pub is_null: bool,
    pub nullable: bool,
}

impl Nullness {
    pub const NULL: Nullness = Nullness {
        is_null: true,
        nullable: true,
    };
    pub const PRESENT: Nullness = Nullness {
        is_null: false,
        nullable: true,
    };

    pub(crate) fn apply(self, walker: &mut Walker<'_>, kind: NodeKind) {
        walker.set_null_for(kind, self.is_null);
        walker.set_nullable_for(kind, self.nullable);
    }
}

/// Static shape of a value type.
pub trait Schema {
    /// Node kind this type is stored as.
    const KIND: NodeKind;

    /// Number of `Option` layers wrapped around the stored value.
    const POINTER_DEPTH: usize = 0;

    /// Whether an existing native value can be merged into instead of being
    /// replaced. Only `None` is absent.
    fn is_present(&self) -> bool {
        true
    }
}

pub trait Encode: Schema {
    fn encode(&self, walker: &mut Walker<'_>, nullness: Nullness) -> Result<(), CodecError>;

    /// Write the zero value used as a collection prototype.
    ///
    /// Pointer layers are stripped, so the template is never null.
    fn encode_template(walker: &mut Walker<'_>) -> Result<(), CodecError>
    where
        Self: Default,
    {
        Self::default().encode(walker, Nullness::default())
    }
}

pub trait Decode: Schema {
    /// Overwrite `self` from the node under `reader`.
    ///
    /// Called through [`Decoder::decode`], which applies the build-priority
    /// skip first.
    fn decode_node(&mut self, reader: &mut Reader<'_>, decoder: &Decoder)
        -> Result<(), CodecError>;
}

/// Decoding pass bound to one build priority.
#[derive(Debug, Clone, Copy)]
pub struct Decoder {
    build_time: ModifyTime,
}

impl Decoder {
    pub fn new(build_time: ModifyTime) -> Self {
        Self { build_time }
    }

    /// A decoder that never skips.
    ///
    /// Used for values with nothing in memory worth preserving: freshly
    /// allocated collection elements and lookups.
    pub fn full() -> Self {
        Self::new(ModifyTime::READONLY)
    }

    pub fn build_time(&self) -> ModifyTime {
        self.build_time
    }

    pub fn decode<T: Decode + ?Sized>(
        &self,
        value: &mut T,
        reader: &mut Reader<'_>,
    ) -> Result<(), CodecError> {
        if reader.modify_time() == self.build_time {
            return Ok(());
        }
        value.decode_node(reader, self)
    }
}

/// Encode `value` at the walker's position.
pub fn encode_into<T: Encode + ?Sized>(
    walker: &mut Walker<'_>,
    value: &T,
) -> Result<(), CodecError> {
    value.encode(walker, Nullness::default())
}

/// Encode `value` into a fresh tree stamped with `time`.
pub fn build_from<T: Encode + ?Sized>(value: &T, time: ModifyTime) -> Result<Node, CodecError> {
    let mut root = Node::new();
    let mut walker = Walker::new(&mut root, time);
    encode_into(&mut walker, value)?;
    Ok(root)
}

/// Project `root` onto `value`, leaving nodes stamped `build_time` alone.
pub fn refill<T: Decode + ?Sized>(
    root: &Node,
    value: &mut T,
    build_time: ModifyTime,
) -> Result<(), CodecError> {
    let mut reader = Reader::new(root);
    Decoder::new(build_time).decode(value, &mut reader)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUILD: ModifyTime = ModifyTime(1);

    #[test]
    fn test_decoder_skips_build_stamped_nodes() {
        let root = build_from(&7i64, BUILD).unwrap();
        let mut value = 99i64;
        refill(&root, &mut value, BUILD).unwrap();
        assert_eq!(value, 99);

        Decoder::full()
            .decode(&mut value, &mut Reader::new(&root))
            .unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_pointer_depth_error_message() {
        let err = CodecError::PointerDepth {
            level: 3,
            context: "field type of struct",
        };
        assert_eq!(
            err.to_string(),
            "3-level pointer is not allowed for field type of struct"
        );
    }
}
