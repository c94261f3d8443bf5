//! Codec module - Deterministic binary encoding for cluster messages
//!
//! The byte layout is positional and tag-free:
//! - fixed-width integers are big-endian
//! - byte blobs carry a fixed-width length prefix
//! - lists carry a fixed-width element count followed by each element
//! - records are their fields concatenated in declared order
//!
//! Decoding a whole message must consume every byte; anything left over is an
//! error.

mod error;
pub mod primitive;
#[macro_use]
pub mod record;
pub mod varlen;

pub use error::*;
pub use primitive::{decode_uint, encode_uint};
pub use varlen::{blob, list, PrefixedBytes, PrefixedList, DEFAULT_PREFIX_WIDTH};

use bytes::{Bytes, BytesMut};

/// Types with a single canonical wire encoding.
pub trait Encode {
    /// Append the encoding of `self` to `buf`.
    fn encode(&self, buf: &mut BytesMut) -> CodecResult<()>;
}

/// Types that can be read back from their canonical encoding.
pub trait Decode: Sized {
    /// Read one value from the front of `buf`, advancing it past the bytes used.
    fn decode(buf: &mut &[u8]) -> CodecResult<Self>;
}

/// How a single record field is written and read.
///
/// Most fields use [`Inline`], which defers to the field type's own
/// [`Encode`]/[`Decode`]. Blobs and lists need a prefix width and, for lists,
/// an element codec; see [`varlen`].
pub trait FieldCodec<T> {
    fn encode_field(&self, value: &T, buf: &mut BytesMut) -> CodecResult<()>;
    fn decode_field(&self, buf: &mut &[u8]) -> CodecResult<T>;
}

/// Field codec that uses the type's own encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inline;

impl<T: Encode + Decode> FieldCodec<T> for Inline {
    fn encode_field(&self, value: &T, buf: &mut BytesMut) -> CodecResult<()> {
        value.encode(buf)
    }

    fn decode_field(&self, buf: &mut &[u8]) -> CodecResult<T> {
        T::decode(buf)
    }
}

/// A named, ordered collection of fields.
///
/// Implemented by the [`record!`] macro.
pub trait Record: Encode + Decode {
    /// Type name used in error reports.
    const NAME: &'static str;
    /// Field names in wire order.
    const FIELDS: &'static [&'static str];

    /// Encode into a fresh buffer
    fn to_bytes(&self) -> CodecResult<Bytes> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Decode a complete value, rejecting trailing bytes
    fn from_bytes(bytes: &[u8]) -> CodecResult<Self> {
        let mut cursor = bytes;
        let value = Self::decode(&mut cursor)?;
        if !cursor.is_empty() {
            return Err(CodecError::TrailingBytes {
                message: Self::NAME,
                trailing: cursor.len(),
            });
        }
        Ok(value)
    }
}

/// Check that `buf` still holds at least `need` bytes.
#[inline]
pub(crate) fn ensure(buf: &[u8], need: usize) -> CodecResult<()> {
    if buf.len() < need {
        return Err(CodecError::Truncated {
            need,
            have: buf.len(),
        });
    }
    Ok(())
}

/// Split `len` bytes off the front of `buf`.
#[inline]
pub(crate) fn take<'a>(buf: &mut &'a [u8], len: usize) -> CodecResult<&'a [u8]> {
    ensure(buf, len)?;
    let (head, tail) = buf.split_at(len);
    *buf = tail;
    Ok(head)
}
