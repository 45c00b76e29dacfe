//! Scalars and `Option`.

use cfgm_tree::{NodeKind, Reader, Walker};

use super::{CodecError, Decode, Decoder, Encode, Nullness, Schema};

macro_rules! int_codec {
    ($($ty:ty),* $(,)?) => {$(
        impl Schema for $ty {
            const KIND: NodeKind = NodeKind::Int;
        }

        impl Encode for $ty {
            fn encode(&self, walker: &mut Walker<'_>, nullness: Nullness) -> Result<(), CodecError> {
                let value = i64::try_from(*self).map_err(|_| CodecError::OutOfRange {
                    value: self.to_string(),
                    target: "i64",
                })?;
                walker.set_int(value);
                nullness.apply(walker, NodeKind::Int);
                Ok(())
            }
        }

        impl Decode for $ty {
            fn decode_node(&mut self, reader: &mut Reader<'_>, _: &Decoder) -> Result<(), CodecError> {
                if reader.has(NodeKind::Int) {
                    let value = reader.int();
                    *self = <$ty>::try_from(value).map_err(|_| CodecError::OutOfRange {
                        value: value.to_string(),
                        target: stringify!($ty),
                    })?;
                }
                Ok(())
            }
        }
    )*};
}

int_codec!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! float_codec {
    ($($ty:ty),* $(,)?) => {$(
        impl Schema for $ty {
            const KIND: NodeKind = NodeKind::Float;
        }

        impl Encode for $ty {
            fn encode(&self, walker: &mut Walker<'_>, nullness: Nullness) -> Result<(), CodecError> {
                walker.set_float(f64::from(*self));
                nullness.apply(walker, NodeKind::Float);
                Ok(())
            }
        }

        impl Decode for $ty {
            #[allow(clippy::unnecessary_cast)]
            fn decode_node(&mut self, reader: &mut Reader<'_>, _: &Decoder) -> Result<(), CodecError> {
                if reader.has(NodeKind::Float) {
                    *self = reader.float() as $ty;
                }
                Ok(())
            }
        }
    )*};
}

float_codec!(f32, f64);

impl Schema for bool {
    const KIND: NodeKind = NodeKind::Bool;
}

impl Encode for bool {
    fn encode(&self, walker: &mut Walker<'_>, nullness: Nullness) -> Result<(), CodecError> {
        walker.set_bool(*self);
        nullness.apply(walker, NodeKind::Bool);
        Ok(())
    }
}

impl Decode for bool {
    fn decode_node(&mut self, reader: &mut Reader<'_>, _: &Decoder) -> Result<(), CodecError> {
        if reader.has(NodeKind::Bool) {
            *self = reader.boolean();
        }
        Ok(())
    }
}

impl Schema for String {
    const KIND: NodeKind = NodeKind::String;
}

impl Encode for String {
    fn encode(&self, walker: &mut Walker<'_>, nullness: Nullness) -> Result<(), CodecError> {
        walker.set_string(self.as_str());
        nullness.apply(walker, NodeKind::String);
        Ok(())
    }
}

impl Decode for String {
    fn decode_node(&mut self, reader: &mut Reader<'_>, _: &Decoder) -> Result<(), CodecError> {
        if reader.has(NodeKind::String) {
            self.clear();
            self.push_str(reader.string());
        }
        Ok(())
    }
}

impl<T: Schema> Schema for Option<T> {
    const KIND: NodeKind = T::KIND;
    const POINTER_DEPTH: usize = T::POINTER_DEPTH + 1;

    fn is_present(&self) -> bool {
        self.is_some()
    }
}

impl<T: Encode + Default> Encode for Option<T> {
    /// `None` writes the zero value marked null; `Some` writes the value
    /// marked nullable. The caller's flags are replaced either way.
    fn encode(&self, walker: &mut Walker<'_>, _: Nullness) -> Result<(), CodecError> {
        match self {
            Some(value) => value.encode(walker, Nullness::PRESENT),
            None => T::default().encode(walker, Nullness::NULL),
        }
    }

    fn encode_template(walker: &mut Walker<'_>) -> Result<(), CodecError>
    where
        Self: Default,
    {
        T::encode_template(walker)
    }
}

impl<T: Decode + Default> Decode for Option<T> {
    fn decode_node(&mut self, reader: &mut Reader<'_>, decoder: &Decoder) -> Result<(), CodecError> {
        if reader.is_null_for(T::KIND) {
            *self = None;
            return Ok(());
        }
        let value = self.get_or_insert_with(T::default);
        decoder.decode(value, reader)
    }
}
