//! Fixed-width primitives
//!
//! Unsigned integers are big-endian. Booleans are a single `0x00`/`0x01`
//! byte. Fixed-size byte arrays are copied as-is.

use bytes::{Buf, BufMut, BytesMut};

use super::{ensure, take, CodecError, CodecResult, Decode, Encode};

/// Widest integer `encode_uint`/`decode_uint` handle natively.
pub const MAX_UINT_WIDTH: usize = 16;

/// Encode `value` as a big-endian unsigned integer of exactly `width` bytes.
///
/// Fails with [`CodecError::Range`] when `value` needs more than `width` bytes.
pub fn encode_uint(value: u128, width: usize, buf: &mut BytesMut) -> CodecResult<()> {
    if width == 0 || width > MAX_UINT_WIDTH {
        return Err(CodecError::UnsupportedWidth(width));
    }
    if width < MAX_UINT_WIDTH && value >> (width * 8) != 0 {
        return Err(CodecError::range(value, width));
    }
    buf.put_slice(&value.to_be_bytes()[MAX_UINT_WIDTH - width..]);
    Ok(())
}

/// Decode a big-endian unsigned integer of exactly `width` bytes.
pub fn decode_uint(buf: &mut &[u8], width: usize) -> CodecResult<u128> {
    if width == 0 || width > MAX_UINT_WIDTH {
        return Err(CodecError::UnsupportedWidth(width));
    }
    let raw = take(buf, width)?;
    let mut bytes = [0u8; MAX_UINT_WIDTH];
    bytes[MAX_UINT_WIDTH - width..].copy_from_slice(raw);
    Ok(u128::from_be_bytes(bytes))
}

macro_rules! impl_uint {
    ($($ty:ty => $put:ident, $get:ident;)*) => {
        $(
            impl Encode for $ty {
                #[inline]
                fn encode(&self, buf: &mut BytesMut) -> CodecResult<()> {
                    buf.$put(*self);
                    Ok(())
                }
            }

            impl Decode for $ty {
                #[inline]
                fn decode(buf: &mut &[u8]) -> CodecResult<Self> {
                    ensure(buf, std::mem::size_of::<$ty>())?;
                    Ok(buf.$get())
                }
            }
        )*
    };
}

impl_uint! {
    u8 => put_u8, get_u8;
    u16 => put_u16, get_u16;
    u32 => put_u32, get_u32;
    u64 => put_u64, get_u64;
    u128 => put_u128, get_u128;
}

impl Encode for bool {
    fn encode(&self, buf: &mut BytesMut) -> CodecResult<()> {
        buf.put_u8(u8::from(*self));
        Ok(())
    }
}

impl Decode for bool {
    fn decode(buf: &mut &[u8]) -> CodecResult<Self> {
        match u8::decode(buf)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::InvalidBool(other)),
        }
    }
}

impl<const N: usize> Encode for [u8; N] {
    fn encode(&self, buf: &mut BytesMut) -> CodecResult<()> {
        buf.put_slice(self);
        Ok(())
    }
}

impl<const N: usize> Decode for [u8; N] {
    fn decode(buf: &mut &[u8]) -> CodecResult<Self> {
        let raw = take(buf, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(raw);
        Ok(out)
    }
}

/// Copy `slice` into an array, requiring the exact width.
pub fn fixed_bytes<const N: usize>(slice: &[u8]) -> CodecResult<[u8; N]> {
    <[u8; N]>::try_from(slice).map_err(|_| CodecError::InvalidLength {
        expected: N,
        actual: slice.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded<T: Encode>(value: T) -> Vec<u8> {
        let mut buf = BytesMut::new();
        value.encode(&mut buf).unwrap();
        buf.to_vec()
    }

    #[test]
    fn test_integers_are_big_endian() {
        assert_eq!(encoded(0x0102u16), vec![0x01, 0x02]);
        assert_eq!(encoded(0x01020304u32), vec![0x01, 0x02, 0x03, 0x04]);
        assert_eq!(encoded(1u64), vec![0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(encoded(1u128).len(), 16);
    }

    #[test]
    fn test_integer_decode_advances() {
        let bytes = [0x00, 0x2a, 0xff, 0xff, 0xff, 0xff];
        let mut cursor = &bytes[..];
        assert_eq!(u16::decode(&mut cursor).unwrap(), 42);
        assert_eq!(u32::decode(&mut cursor).unwrap(), u32::MAX);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_integer_decode_truncated() {
        let bytes = [0x00, 0x01, 0x02];
        let mut cursor = &bytes[..];
        let err = u32::decode(&mut cursor).unwrap_err();
        assert_eq!(err, CodecError::Truncated { need: 4, have: 3 });
    }

    #[test]
    fn test_encode_uint_range() {
        let mut buf = BytesMut::new();
        encode_uint(255, 1, &mut buf).unwrap();
        assert_eq!(&buf[..], &[0xff]);

        let err = encode_uint(256, 1, &mut buf).unwrap_err();
        assert_eq!(err.kind(), crate::codec::ErrorKind::Range);

        buf.clear();
        encode_uint(u128::MAX, 16, &mut buf).unwrap();
        assert_eq!(buf.len(), 16);

        assert_eq!(
            encode_uint(1, 0, &mut buf).unwrap_err(),
            CodecError::UnsupportedWidth(0)
        );
        assert_eq!(
            encode_uint(1, 17, &mut buf).unwrap_err(),
            CodecError::UnsupportedWidth(17)
        );
    }

    #[test]
    fn test_decode_uint_widths() {
        let bytes = [0x01, 0x00, 0x00];
        let mut cursor = &bytes[..];
        assert_eq!(decode_uint(&mut cursor, 3).unwrap(), 0x010000);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_bool_strict() {
        assert_eq!(encoded(true), vec![1]);
        assert_eq!(encoded(false), vec![0]);

        let mut cursor = &[1u8][..];
        assert!(bool::decode(&mut cursor).unwrap());

        let mut cursor = &[2u8][..];
        assert_eq!(bool::decode(&mut cursor).unwrap_err(), CodecError::InvalidBool(2));
    }

    #[test]
    fn test_fixed_arrays() {
        let digest = [7u8; 32];
        assert_eq!(encoded(digest), vec![7u8; 32]);

        let bytes = [9u8; 40];
        let mut cursor = &bytes[..];
        let decoded: [u8; 32] = Decode::decode(&mut cursor).unwrap();
        assert_eq!(decoded, [9u8; 32]);
        assert_eq!(cursor.len(), 8);

        let err = fixed_bytes::<32>(&[0u8; 31]).unwrap_err();
        assert_eq!(
            err,
            CodecError::InvalidLength {
                expected: 32,
                actual: 31
            }
        );
    }
}
