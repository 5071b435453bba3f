//! Dense block grid for one box.

use super::classes::class_of;

/// Cells of a box, indexed `x + z * sx + y * sx * sz`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoxelGrid {
    sx: usize,
    sy: usize,
    sz: usize,
    cells: Vec<u32>,
}

impl VoxelGrid {
    pub fn new(sx: usize, sy: usize, sz: usize) -> Self {
        Self {
            sx,
            sy,
            sz,
            cells: vec![0; sx * sy * sz],
        }
    }

    /// Grid with every cell set to `value`.
    pub fn filled(sx: usize, sy: usize, sz: usize, value: u32) -> Self {
        Self {
            sx,
            sy,
            sz,
            cells: vec![value; sx * sy * sz],
        }
    }

    pub fn width(&self) -> usize {
        self.sx
    }

    pub fn height(&self) -> usize {
        self.sy
    }

    pub fn depth(&self) -> usize {
        self.sz
    }

    pub fn columns(&self) -> usize {
        self.sx * self.sz
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        debug_assert!(x < self.sx && y < self.sy && z < self.sz);
        x + z * self.sx + y * self.sx * self.sz
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> u32 {
        self.cells[self.index(x, y, z)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: u32) {
        let i = self.index(x, y, z);
        self.cells[i] = value;
    }

    #[inline]
    pub fn class(&self, x: usize, y: usize, z: usize) -> u8 {
        class_of(self.get(x, y, z))
    }

    #[inline]
    pub fn set_class(&mut self, x: usize, y: usize, z: usize, class: u8) {
        self.set(x, y, z, class as u32);
    }

    pub fn cells(&self) -> &[u32] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [u32] {
        &mut self.cells
    }

    pub fn into_cells(self) -> Vec<u32> {
        self.cells
    }

    /// Topmost `y` in column `(x, z)` whose class satisfies `accept`.
    pub fn column_top<F>(&self, x: usize, z: usize, accept: F) -> Option<usize>
    where
        F: Fn(u8) -> bool,
    {
        (0..self.sy).rev().find(|&y| accept(self.class(x, y, z)))
    }

    /// No cell holds anything.
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|&c| c == 0)
    }

    /// Keep only layers `[offset, offset + height)`.
    ///
    /// Layers are contiguous in memory, so this is a single slice copy.
    pub fn truncate_y(&mut self, offset: usize, height: usize) {
        debug_assert!(offset + height <= self.sy);
        let layer = self.sx * self.sz;
        let start = offset * layer;
        self.cells.copy_within(start..start + height * layer, 0);
        self.cells.truncate(height * layer);
        self.sy = height;
    }

    /// Lowest and highest `y` holding a non-empty cell.
    pub fn occupied_range(&self) -> Option<(usize, usize)> {
        let layer = self.sx * self.sz;
        if layer == 0 {
            return None;
        }
        let occupied = |y: usize| self.cells[y * layer..(y + 1) * layer].iter().any(|&c| c != 0);
        let min = (0..self.sy).find(|&y| occupied(y))?;
        let max = (0..self.sy).rev().find(|&y| occupied(y))?;
        Some((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classes::{BUILDING, GROUND, NONE};

    #[test]
    fn test_index_layout() {
        let grid = VoxelGrid::new(4, 3, 2);
        assert_eq!(grid.index(1, 0, 0), 1);
        assert_eq!(grid.index(0, 0, 1), 4);
        assert_eq!(grid.index(0, 1, 0), 8);
        assert_eq!(grid.cells().len(), 24);
    }

    #[test]
    fn test_column_top() {
        let mut grid = VoxelGrid::new(2, 8, 2);
        grid.set_class(1, 2, 1, GROUND);
        grid.set_class(1, 5, 1, BUILDING);
        assert_eq!(grid.column_top(1, 1, |c| c != NONE), Some(5));
        assert_eq!(grid.column_top(1, 1, |c| c == GROUND), Some(2));
        assert_eq!(grid.column_top(0, 0, |c| c != NONE), None);
    }

    #[test]
    fn test_truncate_keeps_window() {
        let mut grid = VoxelGrid::new(2, 8, 2);
        grid.set_class(0, 3, 0, GROUND);
        grid.set_class(1, 6, 1, BUILDING);
        grid.truncate_y(2, 5);
        assert_eq!(grid.height(), 5);
        assert_eq!(grid.class(0, 1, 0), GROUND);
        assert_eq!(grid.class(1, 4, 1), BUILDING);
        assert_eq!(grid.cells().len(), 2 * 5 * 2);
    }

    #[test]
    fn test_occupied_range() {
        let mut grid = VoxelGrid::new(2, 8, 2);
        assert_eq!(grid.occupied_range(), None);
        grid.set_class(0, 3, 0, GROUND);
        grid.set_class(1, 6, 1, BUILDING);
        assert_eq!(grid.occupied_range(), Some((3, 6)));
    }
}
