//! Geographic tile resources.
//!
//! Each tile groups one point file, one color raster and one height raster.
//! The [`TileRegistry`] opens tiles lazily, hands out reference-counted
//! [`TileHandle`]s, and evicts the least-recently-used unreferenced tiles
//! when raster memory exceeds its budget.

mod cloud;
mod file;
mod memory;
mod raster;
mod registry;
mod source;

pub use cloud::MapCloud;
pub use file::{
    BucketMap, FileLayout, FileTileSource, LasPointReader, DEFAULT_COLOR_PATH,
    DEFAULT_HEIGHT_PATH, DEFAULT_POINT_PATH,
};
pub use memory::{MemoryTile, MemoryTileSource};
pub use raster::{ColorRaster, HeightRaster, HEIGHT_NODATA_THRESHOLD};
pub use registry::{TileHandle, TilePoolStats, TileRegistry, TileSummary};
pub use source::{PointReader, TileSource};

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::coord::{TileId, DEFAULT_TILE_SIZE};

/// Errors from opening or reading tile data.
#[derive(Debug, Error)]
pub enum TileError {
    #[error("Tile {0} is not available")]
    Unavailable(TileId),

    #[error("Point file not found: {0}")]
    PointSourceMissing(PathBuf),

    #[error("Invalid point file {path}: {reason}")]
    PointFormat { path: PathBuf, reason: String },

    #[error("Invalid raster {path}: {reason}")]
    Raster { path: PathBuf, reason: String },

    #[error("Tile I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TileError {
    /// Whether retrying the same open could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, TileError::Io(_) | TileError::PointFormat { .. })
    }
}

/// Tile pool configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TilePoolConfig {
    /// Edge length of a tile in world units.
    pub tile_size: f64,
    /// Point readers opened per tile.
    pub readers: usize,
    /// Raster memory above which unreferenced tiles are evicted.
    pub raster_budget: usize,
    /// Retries after a failed point-source open.
    pub open_retries: u32,
    /// Delay before the first retry; doubles each time.
    pub open_backoff: Duration,
    /// Trim passes before giving up while every tile is referenced.
    pub trim_max_attempts: u32,
    /// Delay between trim passes; doubles each time.
    pub trim_backoff: Duration,
}

impl Default for TilePoolConfig {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            readers: 6,
            raster_budget: 1024 * 1024 * 1024,
            open_retries: 3,
            open_backoff: Duration::from_millis(100),
            trim_max_attempts: 8,
            trim_backoff: Duration::from_millis(50),
        }
    }
}

impl TilePoolConfig {
    pub fn with_tile_size(mut self, tile_size: f64) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_readers(mut self, readers: usize) -> Self {
        self.readers = readers.max(1);
        self
    }

    pub fn with_raster_budget(mut self, bytes: usize) -> Self {
        self.raster_budget = bytes;
        self
    }

    pub fn with_open_retries(mut self, retries: u32) -> Self {
        self.open_retries = retries;
        self
    }

    pub fn with_open_backoff(mut self, backoff: Duration) -> Self {
        self.open_backoff = backoff;
        self
    }

    pub fn with_trim_max_attempts(mut self, attempts: u32) -> Self {
        self.trim_max_attempts = attempts;
        self
    }

    pub fn with_trim_backoff(mut self, backoff: Duration) -> Self {
        self.trim_backoff = backoff;
        self
    }
}
