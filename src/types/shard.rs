//! Shard routing values
//!
//! A [`Branch`] names one shard: `shard_size | shard_id`, where `shard_size`
//! is a power of two and `shard_id < shard_size`. A [`ShardMask`] names a set
//! of shards by their low bits; its highest set bit marks the mask width.

/// Position of the highest set bit, 1-based. Zero for zero.
fn left_most_bit(value: u32) -> u32 {
    u32::BITS - value.leading_zeros()
}

record! {
    /// Shard identifier
    #[derive(Copy, Hash, PartialOrd, Ord)]
    pub struct Branch {
        value: u32,
    }
}

impl Branch {
    /// Build a branch from a power-of-two shard count and a shard id below it
    pub fn create(shard_size: u32, shard_id: u32) -> Option<Self> {
        if !shard_size.is_power_of_two() || shard_id >= shard_size {
            return None;
        }
        Some(Self::new(shard_size | shard_id))
    }

    /// Number of shards in the cluster this branch was created for
    pub fn shard_size(&self) -> u32 {
        match left_most_bit(self.value) {
            0 => 0,
            bits => 1 << (bits - 1),
        }
    }

    pub fn shard_id(&self) -> u32 {
        self.value ^ self.shard_size()
    }
}

record! {
    /// Set of shards a slave serves
    ///
    /// `0` is the root sentinel: the root chain, owning no shard.
    #[derive(Copy, Hash)]
    pub struct ShardMask {
        value: u32,
    }
}

impl ShardMask {
    pub const ROOT: ShardMask = ShardMask { value: 0 };

    pub fn is_root(&self) -> bool {
        self.value == 0
    }

    fn low_bits(&self) -> u32 {
        (1u32 << (left_most_bit(self.value) - 1)) - 1
    }

    pub fn contains_shard_id(&self, shard_id: u32) -> bool {
        if self.is_root() {
            return false;
        }
        let bit_mask = self.low_bits();
        (bit_mask & shard_id) == (bit_mask & self.value)
    }

    pub fn contains_branch(&self, branch: Branch) -> bool {
        self.contains_shard_id(branch.shard_id())
    }

    /// Whether some shard id is covered by both masks
    pub fn has_overlap(&self, other: &ShardMask) -> bool {
        if self.is_root() || other.is_root() {
            return false;
        }
        let width = left_most_bit(self.value).min(left_most_bit(other.value));
        let bit_mask = (1u32 << (width - 1)) - 1;
        (self.value & bit_mask) == (other.value & bit_mask)
    }

    /// Every shard id below `shard_size` covered by this mask, ascending
    pub fn iter_shard_ids(&self, shard_size: u32) -> Vec<u32> {
        let shard_bits = left_most_bit(shard_size);
        if self.is_root() || !shard_size.is_power_of_two() {
            return Vec::new();
        }
        let mask_bits = left_most_bit(self.value) - 1;
        if mask_bits >= shard_bits {
            return Vec::new();
        }
        let base = self.low_bits() & self.value;
        (0..1u32 << (shard_bits - mask_bits - 1))
            .map(|i| (i << mask_bits) + base)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_parts() {
        let branch = Branch::create(8, 5).unwrap();
        assert_eq!(branch.value, 0b1101);
        assert_eq!(branch.shard_size(), 8);
        assert_eq!(branch.shard_id(), 5);

        assert!(Branch::create(6, 1).is_none());
        assert!(Branch::create(4, 4).is_none());
        assert_eq!(Branch::default().shard_size(), 0);
    }

    #[test]
    fn test_mask_contains() {
        // 0b10: width 1, low bit 0 -> even shards
        let even = ShardMask::new(0b10);
        assert!(even.contains_shard_id(0));
        assert!(even.contains_shard_id(2));
        assert!(!even.contains_shard_id(3));

        // 0b1: width 0 -> every shard
        let all = ShardMask::new(1);
        assert!(all.contains_shard_id(7));

        assert!(even.contains_branch(Branch::create(4, 2).unwrap()));
        assert!(!ShardMask::ROOT.contains_shard_id(0));
    }

    #[test]
    fn test_mask_overlap() {
        assert!(ShardMask::new(0b101).has_overlap(&ShardMask::new(0b11)));
        assert!(!ShardMask::new(0b101).has_overlap(&ShardMask::new(0b10)));
        assert!(!ShardMask::ROOT.has_overlap(&ShardMask::new(1)));
    }

    #[test]
    fn test_mask_iterate() {
        assert_eq!(ShardMask::new(0b10).iter_shard_ids(8), vec![0, 2, 4, 6]);
        assert_eq!(ShardMask::new(0b111).iter_shard_ids(8), vec![3, 7]);
        assert_eq!(ShardMask::new(1).iter_shard_ids(4), vec![0, 1, 2, 3]);
        assert!(ShardMask::new(0b10000).iter_shard_ids(4).is_empty());
        assert!(ShardMask::ROOT.iter_shard_ids(4).is_empty());
    }
}
