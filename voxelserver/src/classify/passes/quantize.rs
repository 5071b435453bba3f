//! Write point classifications into the grid.

use crate::classify::classes::{is_trivial, NONE};
use crate::classify::VoxelGrid;
use crate::coord::BoxFrame;
use crate::point::Point;

/// Quantize `points` into `grid`.
///
/// A point writes its class only into a trivial cell, so the first useful
/// classification to reach a cell wins and unassigned points never replace
/// it. Returns the lowest and highest `y` reached by any point with a class.
pub fn quantize(points: &[Point], frame: &BoxFrame, grid: &mut VoxelGrid) -> Option<(usize, usize)> {
    let mut range: Option<(usize, usize)> = None;
    for point in points {
        if point.classification == NONE {
            continue;
        }
        let Some((x, y, z)) = frame.cell(point.x, point.y, point.z) else {
            continue;
        };
        range = Some(match range {
            Some((lo, hi)) => (lo.min(y), hi.max(y)),
            None => (y, y),
        });
        if is_trivial(grid.class(x, y, z)) {
            grid.set_class(x, y, z, point.classification);
        }
    }
    range
}
