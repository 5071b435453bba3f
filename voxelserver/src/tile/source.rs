//! Access to the point and raster data behind each tile.

use super::{ColorRaster, HeightRaster, TileError};
use crate::coord::{TileId, WorldRect};
use crate::point::Point;

/// An open, exclusive cursor over one tile's point file.
pub trait PointReader: Send {
    /// Scan the tile from the start and pass every point whose horizontal
    /// position lies inside `rect` to `sink`.
    ///
    /// Returns the number of points passed on. Errors part way through a
    /// scan keep whatever was already delivered.
    fn read_rect(&mut self, rect: &WorldRect, sink: &mut dyn FnMut(Point))
        -> Result<usize, TileError>;
}

/// Provider of tile data.
///
/// `resolve` is the availability check: tiles it returns `None` for are
/// never opened. The bucket it returns is passed back to the open calls.
pub trait TileSource: Send + Sync {
    /// Storage bucket for `tile`, or `None` if no data exists for it.
    fn resolve(&self, tile: TileId) -> Option<String>;

    /// Open a new point reader. Called once per pooled reader.
    fn open_points(&self, tile: TileId, bucket: &str) -> Result<Box<dyn PointReader>, TileError>;

    /// Load the color raster. `Ok(None)` when the tile has none.
    fn open_color(&self, tile: TileId, bucket: &str) -> Result<Option<ColorRaster>, TileError>;

    /// Load the height raster. `Ok(None)` when the tile has none.
    fn open_height(&self, tile: TileId, bucket: &str) -> Result<Option<HeightRaster>, TileError>;
}
