//! Cache keys and the spatial hash that maps them to table buckets.

use crate::request::BoxRequest;

/// Position of a box in units of its own size on the horizontal plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoxKey {
    pub x: i32,
    pub z: i32,
}

impl BoxKey {
    /// Key for a box at block position `(x, z)` with power-of-two sizes.
    #[inline]
    pub fn new(x: i32, z: i32, sx: u32, sz: u32) -> Self {
        debug_assert!(sx.is_power_of_two() && sz.is_power_of_two());
        Self {
            x: x >> sx.trailing_zeros(),
            z: z >> sz.trailing_zeros(),
        }
    }

    pub fn for_request(request: &BoxRequest) -> Self {
        Self::new(request.x, request.z, request.sx(), request.sz())
    }

    /// Bucket index in a table of `1 << bits` cells.
    ///
    /// Interleaves the low 16 bits of `x` (even bits) and `z` (odd bits) so
    /// neighbouring boxes land in different buckets.
    #[inline]
    pub fn bucket(&self, bits: u32) -> usize {
        let mask = if bits >= 32 { u32::MAX } else { (1u32 << bits) - 1 };
        (morton_spread(self.x as u32) | (morton_spread(self.z as u32) << 1)) as usize & mask as usize
    }
}

/// Spread the low 16 bits of `v` into the even bits of the result.
#[inline]
fn morton_spread(v: u32) -> u32 {
    let mut v = v & 0x0000_FFFF;
    v = (v | (v << 8)) & 0x00FF_00FF;
    v = (v | (v << 4)) & 0x0F0F_0F0F;
    v = (v | (v << 2)) & 0x3333_3333;
    v = (v | (v << 1)) & 0x5555_5555;
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_key_divides_by_size() {
        assert_eq!(BoxKey::new(48, 32, 16, 16), BoxKey { x: 3, z: 2 });
        assert_eq!(BoxKey::new(-16, -1, 16, 16), BoxKey { x: -1, z: -1 });
    }

    #[test]
    fn test_morton_interleave() {
        assert_eq!(morton_spread(0b1011), 0b1000101);
        assert_eq!(BoxKey { x: 1, z: 0 }.bucket(10), 0b01);
        assert_eq!(BoxKey { x: 0, z: 1 }.bucket(10), 0b10);
        assert_eq!(BoxKey { x: 3, z: 3 }.bucket(10), 0b1111);
    }

    #[test]
    fn test_neighbours_use_distinct_buckets() {
        let mut seen = std::collections::HashSet::new();
        for x in 0..32 {
            for z in 0..32 {
                assert!(seen.insert(BoxKey { x, z }.bucket(10)));
            }
        }
    }

    proptest! {
        #[test]
        fn prop_key_stable(x in -100_000i32..100_000, z in -100_000i32..100_000, sx in 0u32..8, sz in 0u32..8) {
            let (sx, sz) = (1u32 << sx, 1u32 << sz);
            prop_assert_eq!(BoxKey::new(x, z, sx, sz), BoxKey::new(x, z, sx, sz));
        }

        #[test]
        fn prop_distinct_aligned_boxes_distinct_keys(
            x in -10_000i32..10_000,
            z in -10_000i32..10_000,
            k in 1i32..64,
            shift in 0u32..8,
        ) {
            let size = 1u32 << shift;
            let s = size as i32;
            let base = BoxKey::new(x * s, z * s, size, size);
            prop_assert_ne!(base, BoxKey::new(x * s + k * s, z * s, size, size));
            prop_assert_ne!(base, BoxKey::new(x * s - k * s, z * s, size, size));
        }

        #[test]
        fn prop_bucket_in_range(x in any::<i32>(), z in any::<i32>(), bits in 1u32..16) {
            prop_assert!(BoxKey { x, z }.bucket(bits) < (1usize << bits));
        }
    }
}
