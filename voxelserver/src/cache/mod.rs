//! Box result cache.
//!
//! A fixed table of lockable cells addressed by a spatial hash of the box
//! key. Generating a box is expensive, so whichever thread misses holds the
//! cell lock while it regenerates; concurrent requests for the same bucket
//! wait and then observe the finished result.

mod cell;
mod key;
mod table;

pub use cell::BoxResult;
pub use key::BoxKey;
pub use table::{BoxCache, CacheStats, CellGuard, DEFAULT_HASH_BITS};
