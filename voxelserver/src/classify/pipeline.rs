//! Pass orchestration for one box.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use super::classes::{DEFAULT_PALETTE_MAX_DISTANCE, FILTERS};
use super::passes::{
    apply_filters, column_tops, deepen_water, equalize_water, fill_buildings, fill_ground,
    finalize, infer_water, quantize, shrink_window, specialize,
};
use super::{TileSet, VoxelGrid};
use crate::codec::BoxPayload;
use crate::coord::{BoxFrame, TileId, VerticalOrigin};
use crate::metrics::RuntimeCounters;
use crate::point::PointIndex;
use crate::request::BoxRequest;
use crate::tile::TileRegistry;

/// Extra world distance loaded around the box footprint.
pub const DEFAULT_LOAD_MARGIN: f64 = 2.0;

/// Radius within which points follow a reclassified cell.
pub const DEFAULT_RELABEL_RADIUS: f64 = 1.0;

/// Default deepest water carved below a surface, in blocks.
pub const DEFAULT_MAX_WATER_DEPTH: usize = 6;

/// Tunables of the classification passes.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// World elevation of the sea surface.
    pub sea_level: f64,
    pub max_water_depth: usize,
    pub load_margin: f64,
    pub palette_max_distance: f64,
    pub relabel_radius: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sea_level: 0.0,
            max_water_depth: DEFAULT_MAX_WATER_DEPTH,
            load_margin: DEFAULT_LOAD_MARGIN,
            palette_max_distance: DEFAULT_PALETTE_MAX_DISTANCE,
            relabel_radius: DEFAULT_RELABEL_RADIUS,
        }
    }
}

impl PipelineConfig {
    pub fn with_sea_level(mut self, sea_level: f64) -> Self {
        self.sea_level = sea_level;
        self
    }

    pub fn with_max_water_depth(mut self, depth: usize) -> Self {
        self.max_water_depth = depth;
        self
    }

    pub fn with_load_margin(mut self, margin: f64) -> Self {
        self.load_margin = margin;
        self
    }

    pub fn with_palette_max_distance(mut self, distance: f64) -> Self {
        self.palette_max_distance = distance;
        self
    }

    pub fn with_relabel_radius(mut self, radius: f64) -> Self {
        self.relabel_radius = radius;
        self
    }
}

/// Generates box payloads from the tile pool.
pub struct Pipeline {
    registry: Arc<TileRegistry>,
    config: PipelineConfig,
    counters: Arc<RuntimeCounters>,
}

impl Pipeline {
    pub fn new(
        registry: Arc<TileRegistry>,
        config: PipelineConfig,
        counters: Arc<RuntimeCounters>,
    ) -> Self {
        Self {
            registry,
            config,
            counters,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<TileRegistry> {
        &self.registry
    }

    /// Run every pass for `request` and build its payload.
    ///
    /// Tiles are held only for the duration of the call.
    pub fn generate(&self, request: &BoxRequest) -> BoxPayload {
        let started = Instant::now();
        let cfg = &self.config;
        let (sx, sy, sz) = request.size();

        let oz = self.resolve_vertical_origin(request);
        let mut frame = BoxFrame::new(
            (request.origin.x as f64, request.origin.y as f64, oz as f64),
            (request.x, request.y, request.z),
            (sx, sy, sz),
        );

        let load_rect = frame.footprint().expand(cfg.load_margin);
        let tiles = TileSet::acquire(&self.registry, &load_rect);
        let mut all = PointIndex::new();
        let mut ground = PointIndex::new();
        let loaded = tiles.load(&load_rect, &mut all, &mut ground);
        self.counters.points_loaded(loaded as u64);

        let mut grid = VoxelGrid::new(sx, sy, sz);
        let mut range = quantize(all.points(), &frame, &mut grid);
        if range.is_none() {
            range = infer_water(
                &frame,
                &mut grid,
                &tiles,
                cfg.sea_level,
                cfg.max_water_depth,
                cfg.palette_max_distance,
            );
            if range.is_some() {
                debug!(x = request.x, z = request.z, "Inferred water for empty box");
            }
        }

        let mut min_height = 0;
        if let Some((lo, hi)) = range {
            min_height = lo;
            if let Some((offset, height)) = shrink_window((lo, hi), sy, cfg.max_water_depth) {
                grid.truncate_y(offset, height);
                frame.shrink(offset as i64, height);
                min_height = lo - offset;
            }
        }

        let tops = column_tops(&grid);
        if range.is_some() {
            fill_buildings(&mut grid, min_height);
        }

        ground.build();
        let filled = fill_ground(&frame, &mut grid, &tops, &ground, &mut all, cfg.sea_level);
        all.build();

        let specialized = specialize(
            &frame,
            &mut grid,
            &mut all,
            &tiles,
            cfg.palette_max_distance,
            cfg.relabel_radius,
        );
        let filtered = apply_filters(&frame, &mut grid, &mut all, FILTERS, cfg.relabel_radius);
        let water_level = equalize_water(&mut grid);
        let carved = deepen_water(&mut grid, cfg.max_water_depth);

        let payload = finalize(request, &frame, grid);
        drop(tiles);

        debug!(
            x = request.x,
            y = request.y,
            z = request.z,
            points = loaded,
            ground_filled = filled,
            specialized,
            filtered,
            water_level = ?water_level,
            carved,
            max_height = payload.max_height,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Box generated"
        );
        payload
    }

    /// Block-0 elevation of the request, sampling the height raster for an
    /// automatic origin.
    fn resolve_vertical_origin(&self, request: &BoxRequest) -> i32 {
        match request.origin.z {
            VerticalOrigin::Fixed(z) => z,
            VerticalOrigin::Auto => {
                let (wx, wy) = (request.origin.x as f64, request.origin.y as f64);
                let id = TileId::containing(wx, wy, self.registry.config().tile_size);
                let height = if self.registry.is_available(id) {
                    match self.registry.acquire(id) {
                        Ok(tile) => tile.height(wx, wy),
                        Err(e) => {
                            warn!(tile = %id, error = %e, "Failed to acquire origin tile");
                            f64::NAN
                        }
                    }
                } else {
                    f64::NAN
                };
                let height = if height.is_nan() { 0.0 } else { height };
                height.floor() as i32 - (request.sy() / 2) as i32
            }
        }
    }
}
