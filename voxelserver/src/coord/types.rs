//! Coordinate type definitions

use std::fmt;

/// Raw vertical origin value that asks the pipeline to derive the origin
/// from the height raster.
pub const AUTO_VERTICAL_ORIGIN: i32 = i32::MAX;

/// Default edge length of a geographic tile in world units (metres).
pub const DEFAULT_TILE_SIZE: f64 = 1000.0;

/// Identifier of a fixed-size geographic tile.
///
/// `lat` indexes the world X axis and `lon` the world Y axis, in units of
/// the tile size. The names follow the naming of the source data files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    pub lat: i32,
    pub lon: i32,
}

impl TileId {
    pub const fn new(lat: i32, lon: i32) -> Self {
        Self { lat, lon }
    }

    /// Tile containing the world position `(wx, wy)`.
    #[inline]
    pub fn containing(wx: f64, wy: f64, tile_size: f64) -> Self {
        Self {
            lat: (wx / tile_size).floor() as i32,
            lon: (wy / tile_size).floor() as i32,
        }
    }

    /// World-space extent of this tile.
    pub fn extent(&self, tile_size: f64) -> WorldRect {
        let min_x = self.lat as f64 * tile_size;
        let min_y = self.lon as f64 * tile_size;
        WorldRect {
            min_x,
            min_y,
            max_x: min_x + tile_size,
            max_y: min_y + tile_size,
        }
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.lat, self.lon)
    }
}

/// Vertical component of a request origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerticalOrigin {
    Fixed(i32),
    /// Derived from the height raster at the horizontal origin.
    Auto,
}

impl VerticalOrigin {
    /// Interpret a raw wire value, where [`AUTO_VERTICAL_ORIGIN`] selects `Auto`.
    pub fn from_raw(raw: i32) -> Self {
        if raw == AUTO_VERTICAL_ORIGIN {
            Self::Auto
        } else {
            Self::Fixed(raw)
        }
    }

    pub fn to_raw(self) -> i32 {
        match self {
            Self::Fixed(z) => z,
            Self::Auto => AUTO_VERTICAL_ORIGIN,
        }
    }
}

/// World origin of a box request.
///
/// `x` and `y` are horizontal world coordinates (east, north); `z` is the
/// elevation that block row 0 is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Origin {
    pub x: i32,
    pub y: i32,
    pub z: VerticalOrigin,
}

impl Origin {
    pub fn new(x: i32, y: i32, z: VerticalOrigin) -> Self {
        Self { x, y, z }
    }
}

/// Axis-aligned rectangle on the horizontal world plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldRect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl WorldRect {
    /// Grow the rectangle by `margin` on every side.
    pub fn expand(&self, margin: f64) -> Self {
        Self {
            min_x: self.min_x - margin,
            min_y: self.min_y - margin,
            max_x: self.max_x + margin,
            max_y: self.max_y + margin,
        }
    }

    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    pub fn intersects(&self, other: &WorldRect) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Every tile the rectangle overlaps, edges included, row by row.
    ///
    /// A rectangle smaller than a tile touches at most the four tiles under
    /// its corners; wider ones also cover the tiles in between.
    pub fn overlapping_tiles(&self, tile_size: f64) -> Vec<TileId> {
        let low = TileId::containing(self.min_x, self.min_y, tile_size);
        let high = TileId::containing(self.max_x, self.max_y, tile_size);
        (low.lon..=high.lon)
            .flat_map(|lon| (low.lat..=high.lat).map(move |lat| TileId::new(lat, lon)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_containing() {
        assert_eq!(
            TileId::containing(462_000.0, 101_000.0, 1000.0),
            TileId::new(462, 101)
        );
        assert_eq!(
            TileId::containing(462_999.9, 101_000.5, 1000.0),
            TileId::new(462, 101)
        );
        assert_eq!(TileId::containing(-0.5, 0.0, 1000.0), TileId::new(-1, 0));
    }

    #[test]
    fn test_tile_display() {
        assert_eq!(TileId::new(462, 101).to_string(), "462_101");
    }

    #[test]
    fn test_vertical_origin_sentinel() {
        assert_eq!(VerticalOrigin::from_raw(i32::MAX), VerticalOrigin::Auto);
        assert_eq!(VerticalOrigin::from_raw(0), VerticalOrigin::Fixed(0));
        assert_eq!(
            VerticalOrigin::from_raw(i32::MAX - 1),
            VerticalOrigin::Fixed(i32::MAX - 1)
        );
        assert_eq!(VerticalOrigin::Auto.to_raw(), AUTO_VERTICAL_ORIGIN);
    }

    #[test]
    fn test_overlapping_tiles_small_rect() {
        let inside = WorldRect {
            min_x: 462_100.0,
            min_y: 101_100.0,
            max_x: 462_200.0,
            max_y: 101_200.0,
        };
        assert_eq!(inside.overlapping_tiles(1000.0), vec![TileId::new(462, 101)]);

        let straddle = inside.expand(150.0);
        assert_eq!(
            straddle.overlapping_tiles(1000.0),
            vec![
                TileId::new(461, 101),
                TileId::new(462, 101),
                TileId::new(461, 102),
                TileId::new(462, 102),
            ]
        );
    }

    #[test]
    fn test_overlapping_tiles_wide_rect() {
        // 4096 blocks wide: the corners alone would miss the middle tiles.
        let wide = WorldRect {
            min_x: -2.0,
            min_y: 982.0,
            max_x: 4098.0,
            max_y: 1002.0,
        };
        let tiles = wide.overlapping_tiles(1000.0);
        assert_eq!(tiles.len(), 12);
        for lat in -1..=4 {
            assert!(tiles.contains(&TileId::new(lat, 0)), "missing {lat}_0");
            assert!(tiles.contains(&TileId::new(lat, 1)), "missing {lat}_1");
        }
    }

    #[test]
    fn test_extent_round_trip() {
        let tile = TileId::new(462, 101);
        let extent = tile.extent(1000.0);
        assert_eq!(extent.min_x, 462_000.0);
        assert_eq!(extent.max_y, 102_000.0);
        assert!(extent.contains(462_500.0, 101_500.0));
    }
}
