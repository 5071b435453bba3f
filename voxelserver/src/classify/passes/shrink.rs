//! Vertical shrink of the box to the occupied band.

/// Window `[offset, offset + height)` covering the occupied range plus room
/// for water carving below and one layer above, or `None` if that window is
/// the whole box.
pub fn shrink_window(range: (usize, usize), sy: usize, max_water_depth: usize) -> Option<(usize, usize)> {
    let (min, max) = range;
    let lo = min.saturating_sub(1 + max_water_depth);
    let hi = (max + 1).min(sy.saturating_sub(1));
    if hi < lo {
        return None;
    }
    let height = hi - lo + 1;
    (height < sy).then_some((lo, height))
}
