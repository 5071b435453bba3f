//! In-memory tile source.
//!
//! Holds point lists and rasters for a set of tiles directly. Used to embed
//! the pipeline without files and throughout the tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use image::RgbImage;
use parking_lot::RwLock;

use super::{ColorRaster, HeightRaster, PointReader, TileError, TileSource};
use crate::coord::{TileId, WorldRect};
use crate::point::Point;

/// Data for one in-memory tile.
#[derive(Debug, Clone, Default)]
pub struct MemoryTile {
    pub points: Arc<Vec<Point>>,
    pub color: Option<RgbImage>,
    pub heights: Option<Vec<f32>>,
    /// Number of point-reader opens that fail before one succeeds.
    pub failing_opens: usize,
}

impl MemoryTile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_points(mut self, points: Vec<Point>) -> Self {
        self.points = Arc::new(points);
        self
    }

    pub fn with_color(mut self, color: RgbImage) -> Self {
        self.color = Some(color);
        self
    }

    /// Single-color raster of the given side length.
    pub fn with_uniform_color(self, side: u32, rgb: [u8; 3]) -> Self {
        self.with_color(RgbImage::from_pixel(side, side, image::Rgb(rgb)))
    }

    pub fn with_heights(mut self, heights: Vec<f32>) -> Self {
        self.heights = Some(heights);
        self
    }

    /// Flat height raster of the given side length.
    pub fn with_uniform_height(self, side: usize, height: f32) -> Self {
        self.with_heights(vec![height; side * side])
    }

    pub fn with_failing_opens(mut self, count: usize) -> Self {
        self.failing_opens = count;
        self
    }
}

/// Tile source over in-memory tiles. Unknown tiles are unavailable.
#[derive(Debug, Default)]
pub struct MemoryTileSource {
    tiles: RwLock<HashMap<TileId, MemoryTile>>,
    point_opens: AtomicUsize,
    failed_opens: AtomicUsize,
}

impl MemoryTileSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tile(self, tile: TileId, data: MemoryTile) -> Self {
        self.insert(tile, data);
        self
    }

    pub fn insert(&self, tile: TileId, data: MemoryTile) {
        self.tiles.write().insert(tile, data);
    }

    /// Successful point-reader opens so far.
    pub fn point_opens(&self) -> usize {
        self.point_opens.load(Ordering::Relaxed)
    }

    /// Point-reader opens that were made to fail.
    pub fn failed_opens(&self) -> usize {
        self.failed_opens.load(Ordering::Relaxed)
    }
}

impl TileSource for MemoryTileSource {
    fn resolve(&self, tile: TileId) -> Option<String> {
        self.tiles.read().contains_key(&tile).then(|| "memory".to_string())
    }

    fn open_points(&self, tile: TileId, _bucket: &str) -> Result<Box<dyn PointReader>, TileError> {
        let mut tiles = self.tiles.write();
        let data = tiles.get_mut(&tile).ok_or(TileError::Unavailable(tile))?;
        if data.failing_opens > 0 {
            data.failing_opens -= 1;
            self.failed_opens.fetch_add(1, Ordering::Relaxed);
            return Err(TileError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "simulated open failure",
            )));
        }
        self.point_opens.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(MemoryPointReader {
            points: Arc::clone(&data.points),
        }))
    }

    fn open_color(&self, tile: TileId, _bucket: &str) -> Result<Option<ColorRaster>, TileError> {
        let tiles = self.tiles.read();
        let data = tiles.get(&tile).ok_or(TileError::Unavailable(tile))?;
        Ok(data.color.clone().and_then(ColorRaster::new))
    }

    fn open_height(&self, tile: TileId, _bucket: &str) -> Result<Option<HeightRaster>, TileError> {
        let tiles = self.tiles.read();
        let data = tiles.get(&tile).ok_or(TileError::Unavailable(tile))?;
        Ok(data.heights.clone().and_then(HeightRaster::from_samples))
    }
}

struct MemoryPointReader {
    points: Arc<Vec<Point>>,
}

impl PointReader for MemoryPointReader {
    fn read_rect(
        &mut self,
        rect: &WorldRect,
        sink: &mut dyn FnMut(Point),
    ) -> Result<usize, TileError> {
        let mut count = 0;
        for point in self.points.iter().filter(|p| rect.contains(p.x, p.y)) {
            sink(*point);
            count += 1;
        }
        Ok(count)
    }
}
