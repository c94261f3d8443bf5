//! Structured records
//!
//! A record is an ordered list of `(field, codec)` pairs. The wire form is
//! the field encodings concatenated in declaration order with no tags, no
//! separators and no optional fields. Changing a record's shape is a breaking
//! change and needs a new message type.
//!
//! ```ignore
//! record! {
//!     /// Liveness probe response
//!     pub struct Pong {
//!         id: Vec<u8> => blob(4),
//!         shard_mask_list: Vec<ShardMask> => list(4, Inline),
//!     }
//! }
//! ```
//!
//! Fields without `=> codec` use [`Inline`](crate::codec::Inline).

/// Resolve a field's codec, defaulting to `Inline`.
macro_rules! field_codec {
    () => {
        $crate::codec::Inline
    };
    ($codec:expr) => {
        $codec
    };
}

/// Declare a wire record: struct, positional constructor and codec impls.
macro_rules! record {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $field:ident : $ty:ty $(=> $codec:expr)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $name {
            $(
                $(#[$fmeta])*
                pub $field: $ty,
            )*
        }

        impl $name {
            /// Build from every field, in wire order.
            #[allow(clippy::too_many_arguments, clippy::new_without_default)]
            pub fn new($($field: $ty),*) -> Self {
                Self { $($field),* }
            }
        }

        impl $crate::codec::Encode for $name {
            #[allow(unused_variables)]
            fn encode(&self, buf: &mut ::bytes::BytesMut) -> $crate::codec::CodecResult<()> {
                $(
                    $crate::codec::FieldCodec::<$ty>::encode_field(
                        &field_codec!($($codec)?),
                        &self.$field,
                        buf,
                    )?;
                )*
                Ok(())
            }
        }

        impl $crate::codec::Decode for $name {
            #[allow(unused_variables)]
            fn decode(buf: &mut &[u8]) -> $crate::codec::CodecResult<Self> {
                $(
                    let $field: $ty = $crate::codec::FieldCodec::<$ty>::decode_field(
                        &field_codec!($($codec)?),
                        buf,
                    )
                    .map_err(|e| {
                        $crate::codec::CodecError::field(stringify!($name), stringify!($field), e)
                    })?;
                )*
                Ok(Self { $($field),* })
            }
        }

        impl $crate::codec::Record for $name {
            const NAME: &'static str = stringify!($name);
            const FIELDS: &'static [&'static str] = &[$(stringify!($field)),*];
        }
    };
}
