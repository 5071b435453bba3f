//! Per-tile resources: a pool of point readers plus optional rasters.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use super::{ColorRaster, HeightRaster, PointReader, TilePoolConfig, TileSource};
use crate::classify::classes::GROUND;
use crate::coord::{TileId, WorldRect};
use crate::point::PointIndex;

/// Open resources for one tile.
///
/// Point readers are exclusive: [`load`](MapCloud::load) borrows one, blocking
/// while all are in use. A tile whose point file could not be opened has no
/// readers and loads nothing, but its rasters may still be usable.
pub struct MapCloud {
    id: TileId,
    extent: WorldRect,
    readers: Mutex<Vec<Box<dyn PointReader>>>,
    reader_returned: Condvar,
    reader_count: usize,
    color: Option<ColorRaster>,
    height: Option<HeightRaster>,
    pub(super) refs: AtomicUsize,
    last_access: AtomicU64,
}

impl MapCloud {
    /// Open every resource for `id`. Never fails; missing parts are logged
    /// and left empty.
    pub fn open(id: TileId, bucket: &str, source: &dyn TileSource, config: &TilePoolConfig) -> Self {
        let mut readers = Vec::with_capacity(config.readers);
        for _ in 0..config.readers {
            match open_reader(id, bucket, source, config) {
                Some(reader) => readers.push(reader),
                None => break,
            }
        }
        if readers.is_empty() {
            warn!(tile = %id, "Point source unavailable, tile will load no points");
        }

        let color = match source.open_color(id, bucket) {
            Ok(color) => color,
            Err(e) => {
                warn!(tile = %id, error = %e, "Failed to open color raster");
                None
            }
        };
        let height = match source.open_height(id, bucket) {
            Ok(height) => height,
            Err(e) => {
                warn!(tile = %id, error = %e, "Failed to open height raster");
                None
            }
        };

        let reader_count = readers.len();
        debug!(
            tile = %id,
            readers = reader_count,
            color = color.is_some(),
            height = height.is_some(),
            "Tile opened"
        );

        Self {
            id,
            extent: id.extent(config.tile_size),
            readers: Mutex::new(readers),
            reader_returned: Condvar::new(),
            reader_count,
            color,
            height,
            refs: AtomicUsize::new(0),
            last_access: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> TileId {
        self.id
    }

    pub fn extent(&self) -> WorldRect {
        self.extent
    }

    pub fn has_points(&self) -> bool {
        self.reader_count > 0
    }

    pub fn reader_count(&self) -> usize {
        self.reader_count
    }

    /// Readers not currently borrowed.
    pub fn free_readers(&self) -> usize {
        self.readers.lock().len()
    }

    pub fn has_color(&self) -> bool {
        self.color.is_some()
    }

    pub fn has_height(&self) -> bool {
        self.height.is_some()
    }

    pub fn ref_count(&self) -> usize {
        self.refs.load(Ordering::Acquire)
    }

    pub fn last_access(&self) -> u64 {
        self.last_access.load(Ordering::Relaxed)
    }

    pub(super) fn touch(&self, stamp: u64) {
        self.last_access.store(stamp, Ordering::Relaxed);
    }

    /// Bytes held by this tile's rasters.
    pub fn raster_bytes(&self) -> usize {
        self.color.as_ref().map_or(0, ColorRaster::bytes)
            + self.height.as_ref().map_or(0, HeightRaster::bytes)
    }

    /// Load every point inside `rect` into `all`, and the GROUND points also
    /// into `ground`. Returns the number of points loaded.
    pub fn load(&self, rect: &WorldRect, all: &mut PointIndex, ground: &mut PointIndex) -> usize {
        if !self.has_points() || !self.extent.intersects(rect) {
            return 0;
        }

        let mut lease = self.lease();
        let mut count = 0;
        let result = lease.reader().read_rect(rect, &mut |point| {
            if point.classification == GROUND {
                ground.insert(point);
            }
            all.insert(point);
            count += 1;
        });
        if let Err(e) = result {
            warn!(tile = %self.id, error = %e, loaded = count, "Point scan failed part way");
        }
        count
    }

    /// Aerial color at a world position, if the tile has a color raster.
    pub fn map_pixel(&self, wx: f64, wy: f64) -> Option<[u8; 3]> {
        self.color
            .as_ref()
            .map(|raster| raster.sample(&self.extent, wx, wy))
    }

    /// Ground elevation at a world position, or NaN.
    pub fn height(&self, wx: f64, wy: f64) -> f64 {
        self.height
            .as_ref()
            .map_or(f64::NAN, |raster| raster.sample(&self.extent, wx, wy))
    }

    fn lease(&self) -> ReaderLease<'_> {
        let mut readers = self.readers.lock();
        loop {
            if let Some(reader) = readers.pop() {
                return ReaderLease {
                    cloud: self,
                    reader: Some(reader),
                };
            }
            self.reader_returned.wait(&mut readers);
        }
    }
}

impl std::fmt::Debug for MapCloud {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapCloud")
            .field("id", &self.id)
            .field("readers", &self.reader_count)
            .field("refs", &self.ref_count())
            .field("raster_bytes", &self.raster_bytes())
            .finish()
    }
}

/// A borrowed point reader, returned to the pool on drop.
struct ReaderLease<'a> {
    cloud: &'a MapCloud,
    reader: Option<Box<dyn PointReader>>,
}

impl ReaderLease<'_> {
    fn reader(&mut self) -> &mut dyn PointReader {
        match self.reader.as_mut() {
            Some(reader) => reader.as_mut(),
            None => unreachable!("reader lease used after release"),
        }
    }
}

impl Drop for ReaderLease<'_> {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            self.cloud.readers.lock().push(reader);
            self.cloud.reader_returned.notify_one();
        }
    }
}

/// Open one point reader, retrying transient failures with exponential
/// backoff.
///
/// Only errors that [`TileError::is_transient`](super::TileError::is_transient)
/// accepts are retried: I/O failures and unreadable headers. A missing
/// point file gives up on the first attempt, since sleeping cannot make it
/// appear and the caller may be holding other tiles.
fn open_reader(
    id: TileId,
    bucket: &str,
    source: &dyn TileSource,
    config: &TilePoolConfig,
) -> Option<Box<dyn PointReader>> {
    let mut delay = config.open_backoff;
    for attempt in 0..=config.open_retries {
        match source.open_points(id, bucket) {
            Ok(reader) => return Some(reader),
            Err(e) if !e.is_transient() => {
                debug!(tile = %id, error = %e, "Point source missing");
                return None;
            }
            Err(e) => {
                warn!(tile = %id, attempt, error = %e, "Failed to open point source");
                if attempt < config.open_retries {
                    thread::sleep(delay);
                    delay *= 2;
                }
            }
        }
    }
    None
}
