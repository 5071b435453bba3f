//! Refine column tops using the aerial imagery.

use super::columns::surface;
use crate::classify::classes::{allowed_targets, match_palette};
use crate::classify::{RasterLookup, VoxelGrid};
use crate::coord::BoxFrame;
use crate::point::PointIndex;

/// Replace each column's top class by the nearest palette class it is
/// allowed to become, then relabel the points of the old class around the
/// cell. Returns the number of cells changed.
pub fn specialize(
    frame: &BoxFrame,
    grid: &mut VoxelGrid,
    all: &mut PointIndex,
    rasters: &dyn RasterLookup,
    palette_max_distance: f64,
    relabel_radius: f64,
) -> usize {
    let mut changed = 0;
    for z in 0..grid.depth() {
        for x in 0..grid.width() {
            let Some(top) = surface(grid, x, z) else {
                continue;
            };
            let class = grid.class(x, top, z);
            let allowed = allowed_targets(class);
            if allowed.is_empty() {
                continue;
            }
            let (wx, wy) = frame.column_centre(x, z);
            let Some(rgb) = rasters.color_at(wx, wy) else {
                continue;
            };
            let Some(target) = match_palette(rgb, Some(allowed), palette_max_distance) else {
                continue;
            };
            if target == class {
                continue;
            }
            grid.set_class(x, top, z, target);
            let (cx, cy, cz) = frame.to_world(x, top, z);
            all.relabel_within([cx, cy, cz], relabel_radius, class, target);
            changed += 1;
        }
    }
    changed
}
