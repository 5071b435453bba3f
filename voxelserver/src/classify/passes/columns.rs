//! Per-column height summaries.

use crate::classify::classes::{is_ground_family, is_trivial, NONE, WATER};
use crate::classify::VoxelGrid;

/// Column heights, indexed `x + z * sx`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnTops {
    /// Topmost cell with a non-trivial class.
    pub solid: Vec<Option<usize>>,
    /// Topmost ground or water cell.
    pub ground: Vec<Option<usize>>,
}

pub fn column_tops(grid: &VoxelGrid) -> ColumnTops {
    let mut solid = Vec::with_capacity(grid.columns());
    let mut ground = Vec::with_capacity(grid.columns());
    for z in 0..grid.depth() {
        for x in 0..grid.width() {
            solid.push(grid.column_top(x, z, |c| !is_trivial(c)));
            ground.push(grid.column_top(x, z, |c| is_ground_family(c) || c == WATER));
        }
    }
    ColumnTops { solid, ground }
}

/// Topmost non-empty cell of a column.
#[inline]
pub fn surface(grid: &VoxelGrid, x: usize, z: usize) -> Option<usize> {
    grid.column_top(x, z, |c| c != NONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classes::{GROUND_ASPHALT, UNASSIGNED, VEGETATION_HIGH};

    #[test]
    fn test_column_tops() {
        let mut grid = VoxelGrid::new(2, 10, 1);
        grid.set_class(0, 2, 0, GROUND_ASPHALT);
        grid.set_class(0, 6, 0, VEGETATION_HIGH);
        grid.set_class(0, 8, 0, UNASSIGNED);
        let tops = column_tops(&grid);
        assert_eq!(tops.solid, vec![Some(6), None]);
        assert_eq!(tops.ground, vec![Some(2), None]);
        assert_eq!(surface(&grid, 0, 0), Some(8));
    }
}
