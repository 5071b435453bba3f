//! Proximity reclassification of column tops.

use super::columns::surface;
use crate::classify::classes::{ClassificationFilter, NONE};
use crate::classify::VoxelGrid;
use crate::coord::BoxFrame;
use crate::point::PointIndex;

/// Apply `filters` in order. Returns the number of cells reclassified.
pub fn apply_filters(
    frame: &BoxFrame,
    grid: &mut VoxelGrid,
    all: &mut PointIndex,
    filters: &[ClassificationFilter],
    relabel_radius: f64,
) -> usize {
    filters
        .iter()
        .map(|filter| apply_filter(frame, grid, all, filter, relabel_radius))
        .sum()
}

fn apply_filter(
    frame: &BoxFrame,
    grid: &mut VoxelGrid,
    all: &mut PointIndex,
    filter: &ClassificationFilter,
    relabel_radius: f64,
) -> usize {
    let mut changed = 0;
    for z in 0..grid.depth() {
        for x in 0..grid.width() {
            let Some(top) = surface(grid, x, z) else {
                continue;
            };
            let class = grid.class(x, top, z);
            if !filter.sources.contains(&class) {
                continue;
            }
            let (cx, cy, cz) = frame.to_world(x, top, z);
            let Some(target) = vote(all, [cx, cy, cz], filter) else {
                continue;
            };
            grid.set_class(x, top, z, target);
            all.relabel_within([cx, cy, cz], relabel_radius, class, target);
            changed += 1;
        }
    }
    changed
}

/// Class the cell at `center` should become under `filter`, if any.
fn vote(all: &PointIndex, center: [f64; 3], filter: &ClassificationFilter) -> Option<u8> {
    let hits = all.radius(center, filter.radius);
    if hits.is_empty() {
        return None;
    }
    let points = all.points();
    let mut source = 0usize;
    let mut target = 0usize;
    for &(idx, _) in &hits {
        let class = points[idx].classification;
        if filter.sources.contains(&class) {
            source += 1;
        } else if filter.target == NONE || class == filter.target {
            target += 1;
        }
    }
    let ratio = (target as f64 - source as f64) / hits.len() as f64;
    if ratio <= filter.threshold {
        return None;
    }
    if filter.target != NONE {
        return Some(filter.target);
    }
    let (idx, _) = all.nearest_matching(center, |p| {
        p.classification != NONE && !filter.sources.contains(&p.classification)
    })?;
    Some(points[idx].classification)
}
