//! Voxel classification pipeline.
//!
//! Turns the points and rasters of the tiles under a box into a block grid.
//! [`Pipeline::generate`] runs the passes in [`passes`] over a [`VoxelGrid`]
//! and returns the finished [`BoxPayload`](crate::codec::BoxPayload).

pub mod classes;
mod grid;
pub mod passes;
mod pipeline;
mod tiles;

pub use grid::VoxelGrid;
pub use pipeline::{
    Pipeline, PipelineConfig, DEFAULT_LOAD_MARGIN, DEFAULT_MAX_WATER_DEPTH, DEFAULT_RELABEL_RADIUS,
};
pub use tiles::{RasterLookup, TileSet};
