//! Turn the classified grid into a payload.

use crate::classify::classes::final_transform;
use crate::classify::VoxelGrid;
use crate::codec::{BoxPayload, NOT_SHRUNK};
use crate::coord::BoxFrame;
use crate::request::BoxRequest;

/// Build the payload for `request` from its classified grid.
///
/// Unless the request is a debug request, every cell is mapped to its final
/// block code. Column tops and `max_height` are reported in coordinates of
/// the unshrunk box.
pub fn finalize(request: &BoxRequest, frame: &BoxFrame, mut grid: VoxelGrid) -> BoxPayload {
    let Some((_, max_y)) = grid.occupied_range() else {
        return BoxPayload::empty(request);
    };

    if !request.debug {
        for cell in grid.cells_mut() {
            if *cell != 0 {
                *cell = final_transform(*cell);
            }
        }
    }

    let offset = frame.offset_y();
    let mut columns = Vec::with_capacity(grid.columns());
    for z in 0..grid.depth() {
        for x in 0..grid.width() {
            let top = (0..grid.height()).rev().find(|&y| grid.get(x, y, z) != 0);
            columns.push(top.map_or(0, |y| (y as i64 + offset) as u32));
        }
    }

    let (block_x, block_y, block_z) = request.block_index();
    BoxPayload {
        world_hash: request.world_hash,
        shrink_offset: if frame.is_shrunk() {
            offset as i32
        } else {
            NOT_SHRUNK
        },
        shrunk_height: frame.height() as i32,
        block_x,
        block_y,
        block_z,
        max_height: (max_y as i64 + offset + 1) as i32,
        columns,
        blocks: grid.into_cells(),
    }
}
