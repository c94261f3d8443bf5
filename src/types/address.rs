//! Account addresses

use crate::codec::primitive::fixed_bytes;
use crate::codec::CodecResult;

use super::Branch;

/// Length of the public-key-derived recipient
pub const RECIPIENT_LEN: usize = 20;

record! {
    /// Account identity plus the full shard id used for routing
    #[derive(Copy, Hash)]
    pub struct Address {
        recipient: [u8; RECIPIENT_LEN],
        full_shard_id: u32,
    }
}

impl Address {
    /// Build from a recipient slice of exactly 20 bytes
    pub fn from_slice(recipient: &[u8], full_shard_id: u32) -> CodecResult<Self> {
        Ok(Self::new(fixed_bytes(recipient)?, full_shard_id))
    }

    /// Shard this address lives in for a cluster of `shard_size` shards
    pub fn shard_id(&self, shard_size: u32) -> u32 {
        self.full_shard_id & shard_size.wrapping_sub(1)
    }

    pub fn branch(&self, shard_size: u32) -> Option<Branch> {
        Branch::create(shard_size, self.shard_id(shard_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Record;

    #[test]
    fn test_address_layout() {
        let address = Address::new([0x11; RECIPIENT_LEN], 0x0102_0304);
        let bytes = address.to_bytes().unwrap();
        assert_eq!(bytes.len(), 24);
        assert_eq!(&bytes[20..], &[1, 2, 3, 4]);
        assert_eq!(Address::from_bytes(&bytes).unwrap(), address);
    }

    #[test]
    fn test_address_from_slice_requires_exact_width() {
        assert!(Address::from_slice(&[0u8; 20], 0).is_ok());
        assert!(Address::from_slice(&[0u8; 19], 0).is_err());
        assert!(Address::from_slice(b"0x0000000000000000000000000000000000000000", 0).is_err());
    }

    #[test]
    fn test_address_routing() {
        let address = Address::new([0; RECIPIENT_LEN], 0b1011);
        assert_eq!(address.shard_id(4), 0b11);
        assert_eq!(address.branch(4), Branch::create(4, 3));
    }
}
