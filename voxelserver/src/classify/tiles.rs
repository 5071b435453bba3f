//! The tiles a single box computation holds open.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::coord::{TileId, WorldRect};
use crate::point::PointIndex;
use crate::tile::{TileHandle, TileRegistry};

/// Raster queries the classification passes need.
pub trait RasterLookup {
    /// Aerial color at a world position, if known.
    fn color_at(&self, wx: f64, wy: f64) -> Option<[u8; 3]>;

    /// Ground elevation at a world position, or NaN.
    fn height_at(&self, wx: f64, wy: f64) -> f64;
}

/// Handles to every available tile touched by a box's load rectangle.
///
/// Dropping the set releases the tiles.
pub struct TileSet {
    handles: Vec<TileHandle>,
    tile_size: f64,
}

impl TileSet {
    /// Acquire every available tile overlapping `rect`.
    pub fn acquire(registry: &Arc<TileRegistry>, rect: &WorldRect) -> Self {
        let tile_size = registry.config().tile_size;
        let mut handles = Vec::with_capacity(4);
        for id in rect.overlapping_tiles(tile_size) {
            if !registry.is_available(id) {
                debug!(tile = %id, "Tile not available, skipping");
                continue;
            }
            match registry.acquire(id) {
                Ok(handle) => handles.push(handle),
                Err(e) => warn!(tile = %id, error = %e, "Failed to acquire tile"),
            }
        }
        Self { handles, tile_size }
    }

    pub fn ids(&self) -> Vec<TileId> {
        self.handles.iter().map(|h| h.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Load the points inside `rect` from every tile.
    pub fn load(&self, rect: &WorldRect, all: &mut PointIndex, ground: &mut PointIndex) -> usize {
        self.handles
            .iter()
            .map(|tile| tile.load(rect, all, ground))
            .sum()
    }

    fn tile_at(&self, wx: f64, wy: f64) -> Option<&TileHandle> {
        let id = TileId::containing(wx, wy, self.tile_size);
        self.handles.iter().find(|h| h.id() == id)
    }
}

impl RasterLookup for TileSet {
    fn color_at(&self, wx: f64, wy: f64) -> Option<[u8; 3]> {
        self.tile_at(wx, wy)?.map_pixel(wx, wy)
    }

    fn height_at(&self, wx: f64, wy: f64) -> f64 {
        self.tile_at(wx, wy).map_or(f64::NAN, |t| t.height(wx, wy))
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::metrics::RuntimeCounters;
    use crate::tile::{MemoryTile, MemoryTileSource, TilePoolConfig};

    /// Raster lookup returning the same values everywhere.
    pub struct UniformRasters {
        pub color: Option<[u8; 3]>,
        pub height: f64,
    }

    impl RasterLookup for UniformRasters {
        fn color_at(&self, _wx: f64, _wy: f64) -> Option<[u8; 3]> {
            self.color
        }

        fn height_at(&self, _wx: f64, _wy: f64) -> f64 {
            self.height
        }
    }

    #[test]
    fn test_acquire_skips_unavailable() {
        let source = MemoryTileSource::new()
            .with_tile(TileId::new(0, 0), MemoryTile::new().with_uniform_color(4, [1, 2, 3]));
        let registry = TileRegistry::new(
            Arc::new(source),
            TilePoolConfig::default().with_readers(1),
            Arc::new(RuntimeCounters::new()),
        );
        let rect = WorldRect {
            min_x: 990.0,
            min_y: 990.0,
            max_x: 1010.0,
            max_y: 1010.0,
        };
        let set = TileSet::acquire(&registry, &rect);
        assert_eq!(set.ids(), vec![TileId::new(0, 0)]);
        assert_eq!(set.color_at(995.0, 995.0), Some([1, 2, 3]));
        assert_eq!(set.color_at(1005.0, 995.0), None);
        assert!(set.height_at(995.0, 995.0).is_nan());

        drop(set);
        assert_eq!(registry.ref_count(TileId::new(0, 0)), Some(0));
    }
}
