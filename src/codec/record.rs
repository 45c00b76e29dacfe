//! Records: named fields under an object node.
//!
//! Records implement the codec traits through [`record!`](crate::record),
//! which expands to one [`encode_field`] / [`decode_field`] call per field.

use cfgm_tree::{NodeKind, Reader, Walker};

use super::{CodecError, Decode, Decoder, Encode, Nullness, MAX_FIELD_POINTER_DEPTH};

const FIELD_CONTEXT: &str = "field type of struct";

/// Encode one field under `key`, attaching `desc` when given.
pub fn encode_field<V: Encode + ?Sized>(
    walker: &mut Walker<'_>,
    key: &str,
    desc: Option<&str>,
    value: &V,
) -> Result<(), CodecError> {
    if V::POINTER_DEPTH > MAX_FIELD_POINTER_DEPTH {
        return Err(CodecError::PointerDepth {
            level: V::POINTER_DEPTH,
            context: FIELD_CONTEXT,
        });
    }
    walker.enter_obj(key);
    let result = value.encode(walker, Nullness::default());
    if result.is_ok() {
        if let Some(desc) = desc.filter(|d| !d.is_empty()) {
            walker.set_desc(desc);
        }
    }
    walker.exit();
    result
}

/// Write the record's own null flags once its fields are in place.
pub fn finish_record(walker: &mut Walker<'_>, nullness: Nullness) {
    nullness.apply(walker, NodeKind::Obj);
}

/// Decode one field from `key`; a missing key leaves the field alone.
pub fn decode_field<V: Decode + ?Sized>(
    reader: &mut Reader<'_>,
    decoder: &Decoder,
    key: &str,
    value: &mut V,
) -> Result<(), CodecError> {
    if !reader.try_enter_obj(key) {
        return Ok(());
    }
    let result = decoder.decode(value, reader);
    reader.exit();
    result
}

/// Implement the codec traits for a struct, one tree key per listed field.
///
/// Each field may be renamed with `as "Key"` and documented with
/// `: "description"`; the description becomes a comment in dumps.
///
/// ```
/// #[derive(Debug, Default)]
/// struct Server {
///     host: String,
///     port: u16,
///     tls: Option<bool>,
/// }
///
/// cfgm::record!(Server {
///     host as "Host": "address to bind",
///     port as "Port",
///     tls,
/// });
/// ```
#[macro_export]
macro_rules! record {
    ($ty:ty { $($field:ident $(as $key:literal)? $(: $desc:literal)?),* $(,)? }) => {
        impl $crate::codec::Schema for $ty {
            const KIND: $crate::tree::NodeKind = $crate::tree::NodeKind::Obj;
        }

        impl $crate::codec::Encode for $ty {
            fn encode(
                &self,
                walker: &mut $crate::tree::Walker<'_>,
                nullness: $crate::codec::Nullness,
            ) -> ::std::result::Result<(), $crate::codec::CodecError> {
                $(
                    $crate::codec::encode_field(
                        walker,
                        $crate::record!(@key $field $($key)?),
                        $crate::record!(@desc $($desc)?),
                        &self.$field,
                    )?;
                )*
                $crate::codec::finish_record(walker, nullness);
                ::std::result::Result::Ok(())
            }
        }

        impl $crate::codec::Decode for $ty {
            fn decode_node(
                &mut self,
                reader: &mut $crate::tree::Reader<'_>,
                decoder: &$crate::codec::Decoder,
            ) -> ::std::result::Result<(), $crate::codec::CodecError> {
                if !reader.has($crate::tree::NodeKind::Obj) {
                    return ::std::result::Result::Ok(());
                }
                $(
                    $crate::codec::decode_field(
                        reader,
                        decoder,
                        $crate::record!(@key $field $($key)?),
                        &mut self.$field,
                    )?;
                )*
                ::std::result::Result::Ok(())
            }
        }
    };
    (@key $field:ident $key:literal) => { $key };
    (@key $field:ident) => { stringify!($field) };
    (@desc $desc:literal) => { ::std::option::Option::Some($desc) };
    (@desc) => { ::std::option::Option::None };
}
