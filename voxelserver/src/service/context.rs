//! Process-scoped server state.

use std::sync::Arc;

use tracing::info;

use super::{BoxService, ServiceError};
use crate::cache::BoxCache;
use crate::classify::Pipeline;
use crate::config::ConfigFile;
use crate::metrics::{RuntimeCounters, StatsReporter};
use crate::tile::{FileTileSource, TilePoolStats, TileRegistry, TileSource};

/// Everything a running server shares between request threads.
///
/// Owns the counters, tile pool, box cache and the stats reporter thread.
/// Dropping the context stops the reporter.
pub struct ServerContext {
    counters: Arc<RuntimeCounters>,
    registry: Arc<TileRegistry>,
    service: Arc<BoxService>,
    reporter: Option<StatsReporter>,
}

impl ServerContext {
    /// Load `~/.voxelserver/config.ini` and build a file-backed context.
    pub fn load() -> Result<Self, ServiceError> {
        let config = ConfigFile::load()?;
        Self::from_config(&config)
    }

    /// Build a context reading tiles from the filesystem.
    pub fn from_config(config: &ConfigFile) -> Result<Self, ServiceError> {
        let source = Arc::new(FileTileSource::new(config.file_layout()));
        Self::with_source(config, source)
    }

    /// Build a context over any tile source.
    pub fn with_source(
        config: &ConfigFile,
        source: Arc<dyn TileSource>,
    ) -> Result<Self, ServiceError> {
        let counters = Arc::new(RuntimeCounters::new());
        let registry = TileRegistry::new(source, config.tile_pool_config(), Arc::clone(&counters));
        let pipeline = Pipeline::new(
            Arc::clone(&registry),
            config.pipeline_config(),
            Arc::clone(&counters),
        );
        let service = BoxService::new(
            BoxCache::new(config.cache.hash_bits),
            pipeline,
            Arc::clone(&counters),
        )
        .with_compression(config.cache.compress)
        .with_max_box_volume(config.world.max_box_volume);

        let reporter = config
            .report_interval()
            .map(|interval| StatsReporter::start(Arc::clone(&counters), interval))
            .transpose()?;

        crate::panic::set_counters(Arc::clone(&counters));

        info!(
            cache_cells = service.cache().len(),
            compress = config.cache.compress,
            readers = config.tiles.readers,
            raster_budget = config.tiles.raster_budget,
            "Server context ready"
        );

        Ok(Self {
            counters,
            registry,
            service: Arc::new(service),
            reporter,
        })
    }

    pub fn counters(&self) -> &Arc<RuntimeCounters> {
        &self.counters
    }

    pub fn registry(&self) -> &Arc<TileRegistry> {
        &self.registry
    }

    /// Shared handle for request threads.
    pub fn service(&self) -> Arc<BoxService> {
        Arc::clone(&self.service)
    }

    pub fn tile_stats(&self) -> TilePoolStats {
        self.registry.stats()
    }

    pub fn has_reporter(&self) -> bool {
        self.reporter.as_ref().is_some_and(StatsReporter::is_running)
    }
}

impl Drop for ServerContext {
    fn drop(&mut self) {
        if let Some(mut reporter) = self.reporter.take() {
            reporter.shutdown();
            reporter.join();
        }
        crate::panic::clear_counters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TileId;
    use crate::request::BoxParams;
    use crate::tile::{MemoryTile, MemoryTileSource};

    fn config(report_secs: u64) -> ConfigFile {
        let mut config = ConfigFile::default();
        config.cache.hash_bits = 3;
        config.stats.report_interval_secs = report_secs;
        config
    }

    #[test]
    fn test_context_wires_components() {
        let source = MemoryTileSource::new().with_tile(TileId::new(0, 0), MemoryTile::new());
        let ctx = ServerContext::with_source(&config(0), Arc::new(source)).unwrap();
        assert!(!ctx.has_reporter());
        assert_eq!(ctx.service().cache().len(), 8);

        let params = BoxParams::new((0, 1000, 0), (0, 0, 0), (16, 16, 16));
        ctx.service().handle(&params, &mut Vec::new()).unwrap();
        assert_eq!(ctx.counters().snapshot().requests_served, 1);
        assert_eq!(ctx.tile_stats().tiles.len(), 1);
        assert_eq!(ctx.tile_stats().tiles[0].refs, 0);
    }

    #[test]
    fn test_reporter_started_and_stopped() {
        let ctx =
            ServerContext::with_source(&config(3600), Arc::new(MemoryTileSource::new())).unwrap();
        assert!(ctx.has_reporter());
        drop(ctx);
    }

    #[test]
    fn test_file_context_with_missing_data() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut cfg = config(0);
        cfg.tiles.data_dir = dir.path().to_path_buf();
        cfg.tiles.open_retries = 0;
        let ctx = ServerContext::from_config(&cfg).unwrap();

        let params = BoxParams::new((0, 1000, 0), (0, 0, 0), (16, 16, 16));
        let mut out = Vec::new();
        ctx.service().handle(&params, &mut out).unwrap();
        let payload = crate::codec::BoxPayload::decode(&out).unwrap();
        assert!(payload.is_empty());
    }
}
