//! Water passes: inference for empty boxes, surface equalization and
//! depth carving.

use super::columns::surface;
use crate::classify::classes::{match_palette, GROUND, NONE, WATER};
use crate::classify::{RasterLookup, VoxelGrid};
use crate::coord::BoxFrame;

/// Build a water body in a box that received no points, if the aerial
/// imagery over the box is mostly water.
///
/// The surface is the block height of the mean height-raster sample, or of
/// `sea_level` when no height data exists. Each column gets WATER from the
/// surface down `max_depth` cells and a GROUND bed under that, matching what
/// [`deepen_water`] carves in open water. Near the bottom of the box the
/// water is shallower so the bed stays inside. Returns the occupied range
/// written.
pub fn infer_water(
    frame: &BoxFrame,
    grid: &mut VoxelGrid,
    rasters: &dyn RasterLookup,
    sea_level: f64,
    max_depth: usize,
    palette_max_distance: f64,
) -> Option<(usize, usize)> {
    let mut sampled = 0usize;
    let mut water = 0usize;
    let mut height_sum = 0.0;
    let mut height_count = 0usize;

    for z in 0..grid.depth() {
        for x in 0..grid.width() {
            let (wx, wy) = frame.column_centre(x, z);
            if let Some(rgb) = rasters.color_at(wx, wy) {
                sampled += 1;
                if match_palette(rgb, None, palette_max_distance) == Some(WATER) {
                    water += 1;
                }
            }
            let h = rasters.height_at(wx, wy);
            if h.is_finite() {
                height_sum += h;
                height_count += 1;
            }
        }
    }

    if sampled == 0 || water * 2 <= sampled {
        return None;
    }

    let world_surface = if height_count > 0 {
        height_sum / height_count as f64
    } else {
        sea_level
    };
    let top = (grid.height() - 1) as f64;
    let surface = frame.block_height(world_surface).floor().clamp(0.0, top) as usize;
    let bed = surface.saturating_sub(max_depth + 1);

    for z in 0..grid.depth() {
        for x in 0..grid.width() {
            grid.set_class(x, bed, z, GROUND);
            for y in (bed + 1)..=surface {
                grid.set_class(x, y, z, WATER);
            }
        }
    }
    Some((bed, surface))
}

/// Bring every water column's surface to the median surface height.
///
/// Uses the upper median, `heights[len / 2]` after sorting. Columns below it
/// are filled with WATER, columns above it are cleared. Returns the median,
/// or `None` if the box has no water columns.
pub fn equalize_water(grid: &mut VoxelGrid) -> Option<usize> {
    let mut columns = Vec::new();
    for z in 0..grid.depth() {
        for x in 0..grid.width() {
            if let Some(y) = surface(grid, x, z) {
                if grid.class(x, y, z) == WATER {
                    columns.push((x, z, y));
                }
            }
        }
    }
    if columns.is_empty() {
        return None;
    }

    let mut heights: Vec<usize> = columns.iter().map(|&(_, _, y)| y).collect();
    heights.sort_unstable();
    let median = heights[heights.len() / 2];

    for (x, z, y) in columns {
        if y < median {
            for fill in (y + 1)..=median {
                grid.set_class(x, fill, z, WATER);
            }
        } else if y > median {
            for clear in (median + 1)..=y {
                grid.set_class(x, clear, z, NONE);
            }
            grid.set_class(x, median, z, WATER);
        }
    }
    Some(median)
}

const DIRECTIONS: [(i64, i64); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// Carve water columns downward in proportion to their distance from shore.
///
/// The depth of a column is the fewest steps, over the eight compass
/// directions, to a column whose surface is not WATER, capped at
/// `max_depth`. Walking off the grid counts as `max_depth`. That many cells
/// below the surface become WATER, leaving at least the bottom cell of the
/// window for the bed, and an empty cell under the carved water becomes
/// GROUND. Returns the number of cells carved.
pub fn deepen_water(grid: &mut VoxelGrid, max_depth: usize) -> usize {
    let (sx, sz) = (grid.width(), grid.depth());
    let surfaces: Vec<Option<usize>> = (0..sz)
        .flat_map(|z| (0..sx).map(move |x| (x, z)))
        .map(|(x, z)| surface(grid, x, z).filter(|&y| grid.class(x, y, z) == WATER))
        .collect();

    let mut carved = 0;
    for z in 0..sz {
        for x in 0..sx {
            let Some(top) = surfaces[x + z * sx] else {
                continue;
            };
            let depth = DIRECTIONS
                .iter()
                .map(|&(dx, dz)| shore_distance(&surfaces, sx, sz, x, z, dx, dz, max_depth))
                .min()
                .unwrap_or(max_depth);

            if top == 0 {
                continue;
            }
            let steps = depth.min(top - 1);
            for step in 1..=steps {
                let y = top - step;
                if grid.class(x, y, z) != WATER {
                    grid.set_class(x, y, z, WATER);
                    carved += 1;
                }
            }
            let bed = top - steps - 1;
            if grid.class(x, bed, z) == NONE {
                grid.set_class(x, bed, z, GROUND);
            }
        }
    }
    carved
}

#[allow(clippy::too_many_arguments)]
fn shore_distance(
    surfaces: &[Option<usize>],
    sx: usize,
    sz: usize,
    x: usize,
    z: usize,
    dx: i64,
    dz: i64,
    max_depth: usize,
) -> usize {
    for step in 1..=max_depth {
        let nx = x as i64 + dx * step as i64;
        let nz = z as i64 + dz * step as i64;
        if nx < 0 || nz < 0 || nx >= sx as i64 || nz >= sz as i64 {
            return max_depth;
        }
        if surfaces[nx as usize + nz as usize * sx].is_none() {
            return step;
        }
    }
    max_depth
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::tiles::tests::UniformRasters;

    const WATER_RGB: [u8; 3] = [40, 70, 95];

    fn frame(sy: usize) -> BoxFrame {
        BoxFrame::new((0.0, 16.0, 0.0), (0, 0, 0), (16, sy, 16))
    }

    #[test]
    fn test_infer_water_majority() {
        let f = frame(64);
        let mut grid = VoxelGrid::new(16, 64, 16);
        let rasters = UniformRasters {
            color: Some(WATER_RGB),
            height: 20.4,
        };
        let range = infer_water(&f, &mut grid, &rasters, 0.0, 6, 60.0);
        assert_eq!(range, Some((13, 20)));
        assert_eq!(grid.class(3, 20, 3), WATER);
        assert_eq!(grid.class(3, 14, 3), WATER);
        assert_eq!(grid.class(3, 13, 3), GROUND);
        assert_eq!(grid.class(3, 21, 3), NONE);
    }

    #[test]
    fn test_infer_water_uses_sea_level_without_heights() {
        let f = frame(64);
        let mut grid = VoxelGrid::new(16, 64, 16);
        let rasters = UniformRasters {
            color: Some(WATER_RGB),
            height: f64::NAN,
        };
        assert_eq!(infer_water(&f, &mut grid, &rasters, 3.0, 6, 60.0), Some((0, 3)));
    }

    #[test]
    fn test_infer_water_needs_majority() {
        let f = frame(64);
        let mut grid = VoxelGrid::new(16, 64, 16);
        let rasters = UniformRasters {
            color: Some([86, 125, 70]),
            height: 10.0,
        };
        assert_eq!(infer_water(&f, &mut grid, &rasters, 0.0, 6, 60.0), None);
        let none = UniformRasters {
            color: None,
            height: 10.0,
        };
        assert_eq!(infer_water(&f, &mut grid, &none, 0.0, 6, 60.0), None);
        assert!(grid.is_empty());
    }

    #[test]
    fn test_equalize_to_upper_median() {
        let mut grid = VoxelGrid::new(4, 16, 1);
        for (x, h) in [(0, 3), (1, 5), (2, 9), (3, 6)] {
            grid.set_class(x, 0, 0, GROUND);
            for y in 1..=h {
                grid.set_class(x, y, 0, WATER);
            }
        }
        // Sorted 3, 5, 6, 9: upper median is 6.
        assert_eq!(equalize_water(&mut grid), Some(6));
        for x in 0..4 {
            assert_eq!(surface(&grid, x, 0), Some(6));
            assert_eq!(grid.class(x, 6, 0), WATER);
        }
    }

    #[test]
    fn test_equalize_ignores_dry_columns() {
        let mut grid = VoxelGrid::new(2, 16, 1);
        grid.set_class(0, 10, 0, GROUND);
        grid.set_class(1, 4, 0, WATER);
        assert_eq!(equalize_water(&mut grid), Some(4));
        assert_eq!(grid.class(0, 10, 0), GROUND);
    }

    #[test]
    fn test_deepen_by_shore_distance() {
        // One row of water between two shore columns.
        let mut grid = VoxelGrid::new(7, 16, 1);
        grid.set_class(0, 10, 0, GROUND);
        grid.set_class(6, 10, 0, GROUND);
        for x in 1..6 {
            grid.set_class(x, 10, 0, WATER);
        }
        deepen_water(&mut grid, 6);

        let depth = |g: &VoxelGrid, x| (0..10).rev().take_while(|&y| g.class(x, y, 0) == WATER).count();
        // z is a single row, so stepping in z leaves the grid at max depth;
        // the x directions reach shore first.
        assert_eq!(depth(&grid, 1), 1);
        assert_eq!(depth(&grid, 2), 2);
        assert_eq!(depth(&grid, 3), 3);
        assert_eq!(grid.class(3, 6, 0), GROUND);
    }

    #[test]
    fn test_deepen_open_water_uses_max_depth() {
        let mut grid = VoxelGrid::new(3, 16, 3);
        for z in 0..3 {
            for x in 0..3 {
                grid.set_class(x, 10, z, WATER);
            }
        }
        deepen_water(&mut grid, 4);
        assert_eq!(grid.class(1, 6, 1), WATER);
        assert_eq!(grid.class(1, 5, 1), GROUND);
    }

    fn water_below(grid: &VoxelGrid, x: usize, z: usize, top: usize) -> usize {
        (0..top).rev().take_while(|&y| grid.class(x, y, z) == WATER).count()
    }

    #[test]
    fn test_inferred_water_survives_deepening() {
        for height in [1.0, 3.0, 5.0, 6.0, 7.0, 12.0] {
            let f = frame(32);
            let mut grid = VoxelGrid::new(16, 32, 16);
            let rasters = UniformRasters {
                color: Some(WATER_RGB),
                height,
            };
            infer_water(&f, &mut grid, &rasters, 0.0, 6, 60.0).unwrap();
            deepen_water(&mut grid, 6);

            let top = height as usize;
            for (x, z) in [(0, 0), (8, 8), (15, 3)] {
                assert_eq!(grid.class(x, top, z), WATER, "surface at h={height}");
                let deep = water_below(&grid, x, z, top);
                assert_eq!(deep, 6.min(top - 1), "water depth at h={height}");
                assert_eq!(grid.class(x, top - deep - 1, z), GROUND, "bed at h={height}");
            }
        }
    }

    #[test]
    fn test_deepen_keeps_bed_in_shallow_box() {
        let mut grid = VoxelGrid::new(3, 8, 3);
        for z in 0..3 {
            for x in 0..3 {
                grid.set_class(x, 2, z, WATER);
            }
        }
        deepen_water(&mut grid, 6);
        assert_eq!(grid.class(1, 1, 1), WATER);
        assert_eq!(grid.class(1, 0, 1), GROUND);
    }
}
