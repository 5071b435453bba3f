//! Synthesize ground under columns that have none.

use super::columns::ColumnTops;
use crate::classify::classes::{GROUND, NONE, WATER};
use crate::classify::VoxelGrid;
use crate::coord::BoxFrame;
use crate::point::{Point, PointIndex};

/// Nearest-ground refinement steps per column.
pub const MAX_GROUND_ITERATIONS: usize = 4;

/// Height change below which refinement stops, in metres.
pub const GROUND_CONVERGENCE: f64 = 0.25;

/// Fill empty cells under every column lacking ground or water.
///
/// `ground` must be built. The surface is found by querying the nearest
/// ground point from the column centre and snapping the query height to it.
/// The block height is clamped to `[sea, height)` where `sea` is
/// `sea_level` in window coordinates; negative heights skip the column. A
/// surface at or below `sea` is WATER over GROUND. Each filled column adds a
/// synthetic GROUND point to `all` at its top. Returns the columns filled.
pub fn fill_ground(
    frame: &BoxFrame,
    grid: &mut VoxelGrid,
    tops: &ColumnTops,
    ground: &PointIndex,
    all: &mut PointIndex,
    sea_level: f64,
) -> usize {
    if ground.indexed_len() == 0 {
        return 0;
    }
    let height = grid.height();
    let sea = frame.block_height(sea_level).floor();
    let mut filled = 0;

    for z in 0..grid.depth() {
        for x in 0..grid.width() {
            let col = x + z * grid.width();
            if tops.ground[col].is_some() {
                continue;
            }

            let start = tops.solid[col].unwrap_or(height / 2);
            let (wx, wy) = frame.column_centre(x, z);
            let Some(wz) = snap_to_ground(ground, wx, wy, frame.world_height(start as f64 + 0.5))
            else {
                continue;
            };

            let h = frame
                .block_height(wz)
                .floor()
                .max(sea)
                .min((height - 1) as f64);
            if h < 0.0 {
                continue;
            }
            let h = h as usize;
            let top_class = if h as f64 <= sea { WATER } else { GROUND };

            for y in 0..=h {
                if grid.class(x, y, z) == NONE {
                    let class = if y == h { top_class } else { GROUND };
                    grid.set_class(x, y, z, class);
                }
            }
            all.insert(Point::new(wx, wy, frame.world_height(h as f64 + 0.5), GROUND));
            filled += 1;
        }
    }
    filled
}

/// Repeatedly move the query height to the nearest ground point.
fn snap_to_ground(ground: &PointIndex, wx: f64, wy: f64, start: f64) -> Option<f64> {
    let mut wz = start;
    let mut found = None;
    for _ in 0..MAX_GROUND_ITERATIONS {
        let Some((idx, _)) = ground.nearest([wx, wy, wz]) else {
            break;
        };
        let pz = ground.points()[idx].z;
        found = Some(pz);
        let converged = (pz - wz).abs() < GROUND_CONVERGENCE;
        wz = pz;
        if converged {
            break;
        }
    }
    found
}
