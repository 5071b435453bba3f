//! Coordinate types and the world ↔ block transform.
//!
//! World space uses metres with `x` east, `y` north and `z` up. Geographic
//! tiles partition the horizontal plane into squares keyed by [`TileId`].

mod frame;
mod types;

pub use frame::BoxFrame;
pub use types::{
    Origin, TileId, VerticalOrigin, WorldRect, AUTO_VERTICAL_ORIGIN, DEFAULT_TILE_SIZE,
};
