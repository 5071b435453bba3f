//! Individual classification passes, in the order the pipeline runs them.

pub mod building;
pub mod columns;
pub mod filters;
pub mod finalize;
pub mod ground;
pub mod quantize;
pub mod shrink;
pub mod specialize;
pub mod water;

pub use building::fill_buildings;
pub use columns::{column_tops, surface, ColumnTops};
pub use filters::apply_filters;
pub use finalize::finalize;
pub use ground::{fill_ground, GROUND_CONVERGENCE, MAX_GROUND_ITERATIONS};
pub use quantize::quantize;
pub use shrink::shrink_window;
pub use specialize::specialize;
pub use water::{deepen_water, equalize_water, infer_water};
