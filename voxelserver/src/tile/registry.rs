//! Reference-counted, memory-bounded pool of open tiles.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{MapCloud, TileError, TilePoolConfig, TileSource};
use crate::coord::TileId;
use crate::metrics::RuntimeCounters;

/// Registry of open tiles.
///
/// Tiles are opened on first [`acquire`](TileRegistry::acquire) and stay
/// open until the trim pass evicts them. Reference counts change only under
/// the registry lock, and the trim pass never evicts a tile with a nonzero
/// count.
pub struct TileRegistry {
    source: Arc<dyn TileSource>,
    config: TilePoolConfig,
    tiles: Mutex<HashMap<TileId, Arc<MapCloud>>>,
    clock: AtomicU64,
    counters: Arc<RuntimeCounters>,
}

/// Shared handle to an acquired tile. Releases its reference on drop.
pub struct TileHandle {
    registry: Arc<TileRegistry>,
    cloud: Arc<MapCloud>,
}

impl Deref for TileHandle {
    type Target = MapCloud;

    fn deref(&self) -> &MapCloud {
        &self.cloud
    }
}

impl Drop for TileHandle {
    fn drop(&mut self) {
        self.registry.release(&self.cloud);
    }
}

impl std::fmt::Debug for TileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TileHandle").field(&self.cloud).finish()
    }
}

/// Summary of one resident tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSummary {
    pub id: TileId,
    pub refs: usize,
    pub readers: usize,
    pub free_readers: usize,
    pub raster_bytes: usize,
    pub last_access: u64,
}

/// Point-in-time view of the pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TilePoolStats {
    pub tiles: Vec<TileSummary>,
    pub raster_bytes: usize,
    pub raster_budget: usize,
}

impl TileRegistry {
    pub fn new(
        source: Arc<dyn TileSource>,
        config: TilePoolConfig,
        counters: Arc<RuntimeCounters>,
    ) -> Arc<Self> {
        Arc::new(Self {
            source,
            config,
            tiles: Mutex::new(HashMap::new()),
            clock: AtomicU64::new(0),
            counters,
        })
    }

    pub fn config(&self) -> &TilePoolConfig {
        &self.config
    }

    /// Whether the tile source has data for `id`.
    pub fn is_available(&self, id: TileId) -> bool {
        self.source.resolve(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.tiles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.lock().is_empty()
    }

    pub fn contains(&self, id: TileId) -> bool {
        self.tiles.lock().contains_key(&id)
    }

    /// Current reference count of a resident tile.
    pub fn ref_count(&self, id: TileId) -> Option<usize> {
        self.tiles.lock().get(&id).map(|cloud| cloud.ref_count())
    }

    /// Total raster bytes across resident tiles.
    pub fn raster_bytes(&self) -> usize {
        self.tiles.lock().values().map(|c| c.raster_bytes()).sum()
    }

    /// Acquire a handle to tile `id`, opening it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`TileError::Unavailable`] if the source has no data for the
    /// tile.
    pub fn acquire(self: &Arc<Self>, id: TileId) -> Result<TileHandle, TileError> {
        if let Some(handle) = self.try_acquire_resident(id) {
            return Ok(handle);
        }

        let bucket = self.source.resolve(id).ok_or(TileError::Unavailable(id))?;
        // Opening can sleep on retries, so it happens outside the lock.
        let opened = Arc::new(MapCloud::open(id, &bucket, self.source.as_ref(), &self.config));

        let (cloud, created) = {
            let mut tiles = self.tiles.lock();
            let (cloud, created) = match tiles.get(&id) {
                Some(existing) => (Arc::clone(existing), false),
                None => {
                    tiles.insert(id, Arc::clone(&opened));
                    (opened, true)
                }
            };
            self.retain(&cloud);
            (cloud, created)
        };

        if created {
            let bytes = cloud.raster_bytes();
            self.counters.tile_loaded(bytes as u64);
            info!(tile = %id, raster_bytes = bytes, "Tile loaded");
            self.trim();
        } else {
            debug!(tile = %id, "Tile opened concurrently, using resident copy");
        }

        Ok(TileHandle {
            registry: Arc::clone(self),
            cloud,
        })
    }

    fn try_acquire_resident(self: &Arc<Self>, id: TileId) -> Option<TileHandle> {
        let tiles = self.tiles.lock();
        let cloud = Arc::clone(tiles.get(&id)?);
        self.retain(&cloud);
        drop(tiles);
        Some(TileHandle {
            registry: Arc::clone(self),
            cloud,
        })
    }

    /// Caller must hold the registry lock.
    fn retain(&self, cloud: &MapCloud) {
        cloud.refs.fetch_add(1, Ordering::AcqRel);
        cloud.touch(self.clock.fetch_add(1, Ordering::Relaxed) + 1);
    }

    fn release(&self, cloud: &MapCloud) {
        let _tiles = self.tiles.lock();
        let previous = cloud.refs.fetch_sub(1, Ordering::AcqRel);
        assert!(
            previous > 0,
            "tile {} released more times than acquired",
            cloud.id()
        );
    }

    /// Evict least-recently-used unreferenced tiles until raster memory is
    /// within budget.
    ///
    /// When every tile is referenced the pass sleeps with exponential
    /// backoff, with the lock released, and tries again up to
    /// `trim_max_attempts` times. Returns whether the pool ended within
    /// budget.
    pub fn trim(&self) -> bool {
        let budget = self.config.raster_budget;
        let mut delay = self.config.trim_backoff;

        for attempt in 0..self.config.trim_max_attempts.max(1) {
            {
                let mut tiles = self.tiles.lock();
                loop {
                    let used: usize = tiles.values().map(|c| c.raster_bytes()).sum();
                    if used <= budget {
                        return true;
                    }
                    let victim = tiles
                        .values()
                        .filter(|c| c.ref_count() == 0)
                        .min_by_key(|c| c.last_access())
                        .map(|c| c.id());
                    let Some(victim) = victim else {
                        debug!(used, budget, attempt, "No evictable tile, backing off");
                        break;
                    };
                    if let Some(cloud) = tiles.remove(&victim) {
                        let bytes = cloud.raster_bytes();
                        self.counters.tile_evicted(bytes as u64);
                        info!(tile = %victim, raster_bytes = bytes, "Tile evicted");
                    }
                }
            }
            thread::sleep(delay);
            delay *= 2;
        }

        warn!(
            used = self.raster_bytes(),
            budget, "Raster memory over budget, all tiles in use"
        );
        false
    }

    pub fn stats(&self) -> TilePoolStats {
        let tiles = self.tiles.lock();
        let mut summaries: Vec<TileSummary> = tiles
            .values()
            .map(|c| TileSummary {
                id: c.id(),
                refs: c.ref_count(),
                readers: c.reader_count(),
                free_readers: c.free_readers(),
                raster_bytes: c.raster_bytes(),
                last_access: c.last_access(),
            })
            .collect();
        summaries.sort_by_key(|s| s.id);
        TilePoolStats {
            raster_bytes: summaries.iter().map(|s| s.raster_bytes).sum(),
            raster_budget: self.config.raster_budget,
            tiles: summaries,
        }
    }
}
