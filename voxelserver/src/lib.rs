//! voxelserver - voxel boxes from classified point scans and aerial imagery
//!
//! Terrain is stored as geographic tiles, each with a LAS/LAZ point file, an
//! aerial color raster and a height raster. A box request names a block
//! region relative to a world origin; the server loads the points under it,
//! classifies every block through a fixed sequence of passes and returns a
//! compact binary payload. Generating a box is expensive, so results are
//! cached per spatial bucket and compressed once sent.
//!
//! # High-Level API
//!
//! [`service::ServerContext`] wires everything together from a config file:
//!
//! ```ignore
//! use voxelserver::config::ConfigFile;
//! use voxelserver::request::BoxParams;
//! use voxelserver::service::ServerContext;
//!
//! let ctx = ServerContext::from_config(&ConfigFile::load()?)?;
//! let params = BoxParams::new((462_000, 101_000, 0), (0, 0, 0), (16, 256, 16));
//! let mut response = Vec::new();
//! ctx.service().handle(&params, &mut response)?;
//! ```

pub mod cache;
pub mod classify;
pub mod codec;
pub mod config;
pub mod coord;
pub mod logging;
pub mod metrics;
pub mod panic;
pub mod point;
pub mod request;
pub mod service;
pub mod tile;

/// Crate version, injected from `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
