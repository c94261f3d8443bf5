//! 256-bit values
//!
//! `H256` is an opaque digest with no numeric meaning. `U256` is an unsigned
//! amount (balances, coinbase rewards, gas). Both are 32 bytes big-endian on
//! the wire.

use std::fmt;

use bytes::BytesMut;

use crate::codec::primitive::fixed_bytes;
use crate::codec::{CodecError, CodecResult, Decode, Encode};

/// 32-byte hash digest
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct H256(pub [u8; 32]);

impl H256 {
    pub const ZERO: H256 = H256([0u8; 32]);

    /// Build from a slice of exactly 32 bytes
    pub fn from_slice(slice: &[u8]) -> CodecResult<Self> {
        Ok(Self(fixed_bytes(slice)?))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl From<[u8; 32]> for H256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H256({})", hex::encode(self.0))
    }
}

impl fmt::Display for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Encode for H256 {
    fn encode(&self, buf: &mut BytesMut) -> CodecResult<()> {
        self.0.encode(buf)
    }
}

impl Decode for H256 {
    fn decode(buf: &mut &[u8]) -> CodecResult<Self> {
        Ok(Self(<[u8; 32]>::decode(buf)?))
    }
}

/// 256-bit unsigned integer, stored big-endian
///
/// Ordering follows numeric value because the bytes are big-endian.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct U256([u8; 32]);

impl U256 {
    pub const ZERO: U256 = U256([0u8; 32]);
    pub const MAX: U256 = U256([0xff; 32]);

    pub const fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn to_be_bytes(self) -> [u8; 32] {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    fn low_u128(&self) -> Option<u128> {
        if self.0[..16].iter().any(|b| *b != 0) {
            return None;
        }
        let mut low = [0u8; 16];
        low.copy_from_slice(&self.0[16..]);
        Some(u128::from_be_bytes(low))
    }
}

impl From<u128> for U256 {
    fn from(value: u128) -> Self {
        let mut bytes = [0u8; 32];
        bytes[16..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }
}

macro_rules! u256_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for U256 {
                fn from(value: $ty) -> Self {
                    U256::from(u128::from(value))
                }
            }
        )*
    };
}

u256_from!(u8, u16, u32, u64);

impl TryFrom<U256> for u128 {
    type Error = CodecError;

    fn try_from(value: U256) -> Result<Self, Self::Error> {
        value.low_u128().ok_or_else(|| CodecError::range(value, 16))
    }
}

impl fmt::Debug for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U256({})", self)
    }
}

impl fmt::Display for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.low_u128() {
            Some(small) => write!(f, "{small}"),
            None => write!(f, "0x{}", hex::encode(self.0)),
        }
    }
}

impl Encode for U256 {
    fn encode(&self, buf: &mut BytesMut) -> CodecResult<()> {
        self.0.encode(buf)
    }
}

impl Decode for U256 {
    fn decode(buf: &mut &[u8]) -> CodecResult<Self> {
        Ok(Self(<[u8; 32]>::decode(buf)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ErrorKind;

    #[test]
    fn test_u256_small_values() {
        let v = U256::from(1_000_000u64);
        assert_eq!(u128::try_from(v).unwrap(), 1_000_000);
        assert_eq!(v.to_string(), "1000000");
        assert!(U256::ZERO.is_zero());
    }

    #[test]
    fn test_u256_ordering_is_numeric() {
        assert!(U256::from(2u8) > U256::from(1u8));
        assert!(U256::MAX > U256::from(u128::MAX));
    }

    #[test]
    fn test_u256_narrowing_range() {
        let err = u128::try_from(U256::MAX).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Range);
    }

    #[test]
    fn test_u256_wire_layout() {
        let mut buf = BytesMut::new();
        U256::from(0x0102u16).encode(&mut buf).unwrap();
        assert_eq!(buf.len(), 32);
        assert_eq!(&buf[30..], &[0x01, 0x02]);
        assert!(buf[..30].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_h256_from_slice() {
        let hash = H256::from_slice(&[0xab; 32]).unwrap();
        assert_eq!(hash.as_bytes(), &[0xab; 32]);
        assert!(H256::from_slice(b"abcd").is_err());
        assert_eq!(H256::from([1u8; 32]).to_string(), format!("0x{}", "01".repeat(32)));
    }
}
