//! World ↔ block transform for a single box.
//!
//! Block axes map onto world axes as follows:
//!
//! | block | world | direction |
//! |-------|-------|-----------|
//! | x     | x     | east      |
//! | y     | z     | up        |
//! | z     | y     | south     |
//!
//! Every conversion in the pipeline goes through [`BoxFrame`] so the forward
//! and inverse mappings cannot drift apart.

use super::types::WorldRect;

/// Placement of a box in world space, including any vertical shrink window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxFrame {
    origin_x: f64,
    origin_y: f64,
    origin_z: f64,
    x: i64,
    y: i64,
    z: i64,
    sx: usize,
    sy: usize,
    sz: usize,
    offset_y: i64,
    height: usize,
}

impl BoxFrame {
    /// Create a frame for a box at block position `(x, y, z)` with size
    /// `(sx, sy, sz)` relative to a resolved world origin.
    pub fn new(
        origin: (f64, f64, f64),
        position: (i32, i32, i32),
        size: (usize, usize, usize),
    ) -> Self {
        Self {
            origin_x: origin.0,
            origin_y: origin.1,
            origin_z: origin.2,
            x: position.0 as i64,
            y: position.1 as i64,
            z: position.2 as i64,
            sx: size.0,
            sy: size.1,
            sz: size.2,
            offset_y: 0,
            height: size.1,
        }
    }

    pub fn width(&self) -> usize {
        self.sx
    }

    pub fn depth(&self) -> usize {
        self.sz
    }

    /// Height of the current vertical window.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Offset of the vertical window from the bottom of the requested box.
    pub fn offset_y(&self) -> i64 {
        self.offset_y
    }

    pub fn is_shrunk(&self) -> bool {
        self.height != self.sy
    }

    /// Restrict the vertical window to `[offset, offset + height)` of the
    /// requested box.
    pub fn shrink(&mut self, offset: i64, height: usize) {
        self.offset_y = offset;
        self.height = height;
    }

    /// Forward transform: world position to (unbounded) block indices.
    #[inline]
    pub fn to_block(&self, wx: f64, wy: f64, wz: f64) -> (i64, i64, i64) {
        let bx = (wx - self.origin_x).floor() as i64 - self.x;
        let by = (wz - self.origin_z).floor() as i64 - self.y - self.offset_y;
        let bz = (self.origin_y - wy).floor() as i64 - self.z;
        (bx, by, bz)
    }

    /// Forward transform restricted to the current window.
    #[inline]
    pub fn cell(&self, wx: f64, wy: f64, wz: f64) -> Option<(usize, usize, usize)> {
        let (bx, by, bz) = self.to_block(wx, wy, wz);
        if bx < 0 || by < 0 || bz < 0 {
            return None;
        }
        let (bx, by, bz) = (bx as usize, by as usize, bz as usize);
        if bx >= self.sx || by >= self.height || bz >= self.sz {
            return None;
        }
        Some((bx, by, bz))
    }

    /// Continuous block height of a world elevation, in window coordinates.
    #[inline]
    pub fn block_height(&self, wz: f64) -> f64 {
        wz - self.origin_z - (self.y + self.offset_y) as f64
    }

    /// Inverse of [`block_height`](Self::block_height).
    #[inline]
    pub fn world_height(&self, by: f64) -> f64 {
        self.origin_z + (self.y + self.offset_y) as f64 + by
    }

    /// Inverse transform: world position of the centre of a block.
    #[inline]
    pub fn to_world(&self, bx: usize, by: usize, bz: usize) -> (f64, f64, f64) {
        let (wx, wy) = self.column_centre(bx, bz);
        (wx, wy, self.world_height(by as f64 + 0.5))
    }

    /// Horizontal world position of the centre of column `(bx, bz)`.
    #[inline]
    pub fn column_centre(&self, bx: usize, bz: usize) -> (f64, f64) {
        let wx = self.origin_x + (self.x + bx as i64) as f64 + 0.5;
        let wy = self.origin_y - ((self.z + bz as i64) as f64 + 0.5);
        (wx, wy)
    }

    /// Horizontal footprint of the box in world space.
    pub fn footprint(&self) -> WorldRect {
        let min_x = self.origin_x + self.x as f64;
        let max_y = self.origin_y - self.z as f64;
        WorldRect {
            min_x,
            min_y: max_y - self.sz as f64,
            max_x: min_x + self.sx as f64,
            max_y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> BoxFrame {
        BoxFrame::new((462_000.0, 101_000.0, 300.0), (16, 32, 48), (16, 64, 16))
    }

    #[test]
    fn test_forward_inverse_agree() {
        let f = frame();
        for &(bx, by, bz) in &[(0, 0, 0), (15, 63, 15), (3, 17, 9)] {
            let (wx, wy, wz) = f.to_world(bx, by, bz);
            assert_eq!(f.cell(wx, wy, wz), Some((bx, by, bz)));
        }
    }

    #[test]
    fn test_footprint_matches_cells() {
        let f = frame();
        let rect = f.footprint();
        assert_eq!(rect.min_x, 462_016.0);
        assert_eq!(rect.max_x, 462_032.0);
        assert_eq!(rect.max_y, 100_952.0);
        assert_eq!(rect.min_y, 100_936.0);

        assert!(f.cell(rect.min_x + 0.01, rect.max_y - 0.01, 333.0).is_some());
        assert!(f.cell(rect.max_x, rect.max_y - 0.01, 333.0).is_none());
    }

    #[test]
    fn test_cell_outside_vertical_window() {
        let f = frame();
        assert!(f.cell(462_020.0, 100_950.0, 331.5).is_none());
        assert_eq!(f.cell(462_020.0, 100_950.0, 332.5).map(|c| c.1), Some(0));
        assert!(f.cell(462_020.0, 100_950.0, 396.5).is_none());
    }

    #[test]
    fn test_shrink_moves_window() {
        let mut f = frame();
        f.shrink(10, 20);
        assert!(f.is_shrunk());
        assert_eq!(f.height(), 20);
        assert_eq!(f.cell(462_020.0, 100_950.0, 342.5).map(|c| c.1), Some(0));
        assert!(f.cell(462_020.0, 100_950.0, 362.5).is_none());
        assert_eq!(f.block_height(f.world_height(7.25)), 7.25);
    }
}
