//! Fixed-size table of lockable cache cells.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use super::{BoxKey, BoxResult};
use crate::request::BoxRequest;

/// Default table size as a power of two.
pub const DEFAULT_HASH_BITS: u32 = 10;

/// First value of the access clock.
const ACCESS_CLOCK_START: u64 = 0xFF;

/// Box result cache.
///
/// One preallocated cell per bucket, each behind its own mutex. A request
/// hashes to exactly one bucket; boxes sharing a bucket evict each other.
pub struct BoxCache {
    cells: Box<[Mutex<BoxResult>]>,
    bits: u32,
    clock: AtomicU64,
}

/// Exclusive access to the cell a request hashed to.
///
/// The cell stays locked for as long as the guard lives.
pub struct CellGuard<'a> {
    cell: MutexGuard<'a, BoxResult>,
    bucket: usize,
    hit: bool,
    collision: bool,
}

impl CellGuard<'_> {
    /// The cell already held the complete result for this request.
    pub fn is_hit(&self) -> bool {
        self.hit
    }

    /// The cell held a valid result for a different request.
    pub fn is_collision(&self) -> bool {
        self.collision
    }

    pub fn bucket(&self) -> usize {
        self.bucket
    }
}

impl Deref for CellGuard<'_> {
    type Target = BoxResult;

    fn deref(&self) -> &BoxResult {
        &self.cell
    }
}

impl DerefMut for CellGuard<'_> {
    fn deref_mut(&mut self) -> &mut BoxResult {
        &mut self.cell
    }
}

/// Point-in-time view of cache occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub cells: usize,
    pub valid: usize,
    pub compressed: usize,
    pub raw_bytes: usize,
    pub compressed_bytes: usize,
    /// Cells skipped because another thread held them.
    pub busy: usize,
}

impl BoxCache {
    /// Create a table with `1 << bits` cells.
    ///
    /// # Panics
    ///
    /// Panics if `bits` is 0 or greater than 24.
    pub fn new(bits: u32) -> Self {
        assert!((1..=24).contains(&bits), "hash bits out of range: {}", bits);
        let cells: Vec<Mutex<BoxResult>> =
            (0..1usize << bits).map(|_| Mutex::new(BoxResult::default())).collect();
        debug!(bits, cells = cells.len(), "Box cache allocated");
        Self {
            cells: cells.into_boxed_slice(),
            bits,
            clock: AtomicU64::new(ACCESS_CLOCK_START),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn hash_bits(&self) -> u32 {
        self.bits
    }

    /// Bucket a request hashes to.
    pub fn bucket_for(&self, request: &BoxRequest) -> usize {
        BoxKey::for_request(request).bucket(self.bits)
    }

    /// Lock the cell for `request`, blocking while another thread holds it.
    ///
    /// The returned guard reports whether the cell already holds this
    /// request's result. On a miss the caller regenerates and calls
    /// [`BoxResult::store`] before dropping the guard.
    pub fn get_or_create(&self, request: &BoxRequest) -> CellGuard<'_> {
        let bucket = self.bucket_for(request);
        let mut cell = self.cells[bucket].lock();
        cell.touch(self.clock.fetch_add(1, Ordering::Relaxed) + 1);

        let hit = cell.matches(request);
        let collision = !hit && cell.is_valid();
        CellGuard {
            cell,
            bucket,
            hit,
            collision,
        }
    }

    /// Current access clock value.
    pub fn clock(&self) -> u64 {
        self.clock.load(Ordering::Relaxed)
    }

    /// Occupancy summary. Cells locked by other threads are counted as busy
    /// rather than waited on.
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            cells: self.cells.len(),
            ..CacheStats::default()
        };
        for cell in self.cells.iter() {
            let Some(cell) = cell.try_lock() else {
                stats.busy += 1;
                continue;
            };
            if cell.is_valid() {
                stats.valid += 1;
            }
            if cell.is_compressed() {
                stats.compressed += 1;
            }
            stats.raw_bytes += cell.raw_len();
            stats.compressed_bytes += cell.compressed_len();
        }
        stats
    }
}

impl Default for BoxCache {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_BITS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{BoxParams, DEFAULT_MAX_BOX_VOLUME};
    use std::sync::Arc;
    use std::thread;

    fn request(x: i32, z: i32) -> BoxRequest {
        let params = BoxParams::new((0, 0, 0), (x, 0, z), (16, 16, 16));
        BoxRequest::validate(&params, DEFAULT_MAX_BOX_VOLUME).unwrap()
    }

    #[test]
    fn test_table_size() {
        let cache = BoxCache::default();
        assert_eq!(cache.len(), 1024);
        assert_eq!(cache.clock(), 0xFF);
    }

    #[test]
    fn test_miss_then_hit() {
        let cache = BoxCache::new(4);
        {
            let mut cell = cache.get_or_create(&request(0, 0));
            assert!(!cell.is_hit());
            assert!(!cell.is_collision());
            cell.store(request(0, 0), vec![1, 2, 3]);
        }
        let cell = cache.get_or_create(&request(0, 0));
        assert!(cell.is_hit());
        assert!(cell.access() > 0xFF);
    }

    #[test]
    fn test_collision_evicts() {
        let cache = BoxCache::new(2);
        let a = request(0, 0);
        // x key 4 wraps to the same two-bit bucket as 0.
        let b = request(4 * 16, 0);
        assert_eq!(cache.bucket_for(&a), cache.bucket_for(&b));

        cache.get_or_create(&a).store(a, vec![1]);
        {
            let mut cell = cache.get_or_create(&b);
            assert!(!cell.is_hit());
            assert!(cell.is_collision());
            cell.store(b, vec![2]);
        }
        assert!(!cache.get_or_create(&a).is_hit());
    }

    #[test]
    fn test_differs_only_in_world_hash_is_miss() {
        let cache = BoxCache::new(4);
        let a = request(0, 0);
        let mut b = a;
        b.world_hash = 99;
        cache.get_or_create(&a).store(a, vec![1]);
        assert!(!cache.get_or_create(&b).is_hit());
    }

    #[test]
    fn test_stats_counts_cells() {
        let cache = BoxCache::new(3);
        let a = request(0, 0);
        {
            let mut cell = cache.get_or_create(&a);
            cell.store(a, vec![0u8; 1000]);
            cell.compress();
        }
        let stats = cache.stats();
        assert_eq!(stats.cells, 8);
        assert_eq!(stats.valid, 1);
        assert_eq!(stats.compressed, 1);
        assert_eq!(stats.raw_bytes, 0);
        assert!(stats.compressed_bytes > 0);
    }

    #[test]
    fn test_cell_exclusive_across_threads() {
        let cache = Arc::new(BoxCache::new(2));
        let req = request(0, 0);
        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let mut cell = cache.get_or_create(&req);
                        // A reader must never see a half-written buffer.
                        let mut scratch = Vec::new();
                        if let Some(bytes) = cell.payload(&mut scratch) {
                            assert!(bytes.iter().all(|&b| b == bytes[0]));
                        }
                        cell.store(req, vec![i; 256]);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }
}
