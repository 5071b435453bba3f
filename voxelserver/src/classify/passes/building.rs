//! Fill building columns down to the lowest occupied layer.

use super::columns::column_tops;
use crate::classify::classes::{is_building_family, BUILDING};
use crate::classify::VoxelGrid;

/// For every column topped by a building-family cell, set the cells from
/// just below the top down to, but not including, `min_height` to BUILDING.
///
/// Returns the number of cells changed. Running it again on its own output
/// changes nothing.
pub fn fill_buildings(grid: &mut VoxelGrid, min_height: usize) -> usize {
    let tops = column_tops(grid);
    let mut changed = 0;
    for z in 0..grid.depth() {
        for x in 0..grid.width() {
            let Some(top) = tops.solid[x + z * grid.width()] else {
                continue;
            };
            if !is_building_family(grid.class(x, top, z)) {
                continue;
            }
            for y in (min_height + 1)..top {
                if grid.class(x, y, z) != BUILDING {
                    grid.set_class(x, y, z, BUILDING);
                    changed += 1;
                }
            }
        }
    }
    changed
}
