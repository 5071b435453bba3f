//! Process-wide runtime counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters shared by the cache, tile pool and box service.
///
/// Event counters are reset each time a snapshot is taken with
/// [`snapshot_and_reset`](RuntimeCounters::snapshot_and_reset); gauges keep
/// their value.
#[derive(Debug, Default)]
pub struct RuntimeCounters {
    requests_served: AtomicU64,
    boxes_sent: AtomicU64,
    boxes_created: AtomicU64,
    points_loaded: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    cache_collisions: AtomicU64,
    invalid_requests: AtomicU64,
    tiles_loaded: AtomicU64,
    tiles_evicted: AtomicU64,
    // Gauges
    raster_bytes: AtomicU64,
    tiles_resident: AtomicU64,
    cached_bytes: AtomicU64,
}

/// Values read from [`RuntimeCounters`] at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub requests_served: u64,
    pub boxes_sent: u64,
    pub boxes_created: u64,
    pub points_loaded: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_collisions: u64,
    pub invalid_requests: u64,
    pub tiles_loaded: u64,
    pub tiles_evicted: u64,
    pub raster_bytes: u64,
    pub tiles_resident: u64,
    /// Bytes held by cached payloads, raw or compressed.
    pub cached_bytes: u64,
}

impl CounterSnapshot {
    /// Fraction of served boxes that came from the cache.
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

impl RuntimeCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_served(&self) {
        self.requests_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn box_sent(&self) {
        self.boxes_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn box_created(&self) {
        self.boxes_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn points_loaded(&self, count: u64) {
        self.points_loaded.fetch_add(count, Ordering::Relaxed);
    }

    pub fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_miss(&self, collision: bool) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
        if collision {
            self.cache_collisions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn invalid_request(&self) {
        self.invalid_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn tile_loaded(&self, raster_bytes: u64) {
        self.tiles_loaded.fetch_add(1, Ordering::Relaxed);
        self.tiles_resident.fetch_add(1, Ordering::Relaxed);
        self.raster_bytes.fetch_add(raster_bytes, Ordering::Relaxed);
    }

    pub fn tile_evicted(&self, raster_bytes: u64) {
        self.tiles_evicted.fetch_add(1, Ordering::Relaxed);
        self.tiles_resident.fetch_sub(1, Ordering::Relaxed);
        self.raster_bytes.fetch_sub(raster_bytes, Ordering::Relaxed);
    }

    /// A cache cell's stored payload changed size.
    pub fn cache_resized(&self, before: usize, after: usize) {
        if after >= before {
            self.cached_bytes
                .fetch_add((after - before) as u64, Ordering::Relaxed);
        } else {
            self.cached_bytes
                .fetch_sub((before - after) as u64, Ordering::Relaxed);
        }
    }

    /// Read every counter without resetting.
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            requests_served: self.requests_served.load(Ordering::Relaxed),
            boxes_sent: self.boxes_sent.load(Ordering::Relaxed),
            boxes_created: self.boxes_created.load(Ordering::Relaxed),
            points_loaded: self.points_loaded.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_collisions: self.cache_collisions.load(Ordering::Relaxed),
            invalid_requests: self.invalid_requests.load(Ordering::Relaxed),
            tiles_loaded: self.tiles_loaded.load(Ordering::Relaxed),
            tiles_evicted: self.tiles_evicted.load(Ordering::Relaxed),
            raster_bytes: self.raster_bytes.load(Ordering::Relaxed),
            tiles_resident: self.tiles_resident.load(Ordering::Relaxed),
            cached_bytes: self.cached_bytes.load(Ordering::Relaxed),
        }
    }

    /// Read every counter and reset the event counters to zero.
    pub fn snapshot_and_reset(&self) -> CounterSnapshot {
        CounterSnapshot {
            requests_served: self.requests_served.swap(0, Ordering::Relaxed),
            boxes_sent: self.boxes_sent.swap(0, Ordering::Relaxed),
            boxes_created: self.boxes_created.swap(0, Ordering::Relaxed),
            points_loaded: self.points_loaded.swap(0, Ordering::Relaxed),
            cache_hits: self.cache_hits.swap(0, Ordering::Relaxed),
            cache_misses: self.cache_misses.swap(0, Ordering::Relaxed),
            cache_collisions: self.cache_collisions.swap(0, Ordering::Relaxed),
            invalid_requests: self.invalid_requests.swap(0, Ordering::Relaxed),
            tiles_loaded: self.tiles_loaded.swap(0, Ordering::Relaxed),
            tiles_evicted: self.tiles_evicted.swap(0, Ordering::Relaxed),
            raster_bytes: self.raster_bytes.load(Ordering::Relaxed),
            tiles_resident: self.tiles_resident.load(Ordering::Relaxed),
            cached_bytes: self.cached_bytes.load(Ordering::Relaxed),
        }
    }
}
