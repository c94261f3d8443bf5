//! Variable-length shapes
//!
//! - [`PrefixedBytes`]: `[len: width bytes][raw bytes]`
//! - [`PrefixedList`]: `[count: width bytes][element]...` with a nested codec
//!
//! List order is preserved exactly; a list is a sequence, not a set.

use bytes::{BufMut, BytesMut};

use super::{decode_uint, encode_uint, take, CodecError, CodecResult, FieldCodec};

/// Prefix width used by nearly every blob and list in the catalog.
pub const DEFAULT_PREFIX_WIDTH: usize = 4;

/// Largest prefix width accepted for lengths and counts.
const MAX_PREFIX_WIDTH: usize = 8;

/// Length-prefixed byte blob
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefixedBytes {
    width: usize,
}

/// Count-prefixed list of elements encoded by `C`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefixedList<C> {
    width: usize,
    element: C,
}

/// Blob codec with a `width`-byte length prefix.
///
/// # Panics
///
/// Panics if `width` is not in `1..=8`. Widths are part of a message's
/// declaration, so a bad width is a programming error.
pub const fn blob(width: usize) -> PrefixedBytes {
    assert!(width >= 1 && width <= MAX_PREFIX_WIDTH, "prefix width must be 1..=8");
    PrefixedBytes { width }
}

/// List codec with a `width`-byte count prefix and `element` for each item.
///
/// # Panics
///
/// Panics if `width` is not in `1..=8`.
pub fn list<C>(width: usize, element: C) -> PrefixedList<C> {
    assert!(width >= 1 && width <= MAX_PREFIX_WIDTH, "prefix width must be 1..=8");
    PrefixedList { width, element }
}

impl PrefixedBytes {
    pub fn width(&self) -> usize {
        self.width
    }
}

impl<C> PrefixedList<C> {
    pub fn width(&self) -> usize {
        self.width
    }
}

fn read_prefix(buf: &mut &[u8], width: usize) -> CodecResult<usize> {
    let value = decode_uint(buf, width)?;
    // Anything that does not fit usize can never be satisfied by the input.
    usize::try_from(value).map_err(|_| CodecError::Truncated {
        need: usize::MAX,
        have: buf.len(),
    })
}

impl FieldCodec<Vec<u8>> for PrefixedBytes {
    fn encode_field(&self, value: &Vec<u8>, buf: &mut BytesMut) -> CodecResult<()> {
        encode_uint(value.len() as u128, self.width, buf)?;
        buf.put_slice(value);
        Ok(())
    }

    fn decode_field(&self, buf: &mut &[u8]) -> CodecResult<Vec<u8>> {
        let len = read_prefix(buf, self.width)?;
        Ok(take(buf, len)?.to_vec())
    }
}

impl<T, C: FieldCodec<T>> FieldCodec<Vec<T>> for PrefixedList<C> {
    fn encode_field(&self, value: &Vec<T>, buf: &mut BytesMut) -> CodecResult<()> {
        encode_uint(value.len() as u128, self.width, buf)?;
        for item in value {
            self.element.encode_field(item, buf)?;
        }
        Ok(())
    }

    fn decode_field(&self, buf: &mut &[u8]) -> CodecResult<Vec<T>> {
        let count = read_prefix(buf, self.width)?;
        // Elements may be zero-width, so the count is only trusted for
        // preallocation up to the remaining input.
        let mut items = Vec::with_capacity(count.min(buf.len()));
        for index in 0..count {
            let item = self
                .element
                .decode_field(buf)
                .map_err(|e| CodecError::element(index, e))?;
            items.push(item);
        }
        Ok(items)
    }
}
