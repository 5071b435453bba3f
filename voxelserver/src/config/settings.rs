//! Configuration settings structs and their defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::cache::DEFAULT_HASH_BITS;
use crate::classify::{PipelineConfig, DEFAULT_LOAD_MARGIN, DEFAULT_MAX_WATER_DEPTH};
use crate::coord::{TileId, DEFAULT_TILE_SIZE};
use crate::request::DEFAULT_MAX_BOX_VOLUME;
use crate::tile::{
    BucketMap, FileLayout, TilePoolConfig, DEFAULT_COLOR_PATH, DEFAULT_HEIGHT_PATH,
    DEFAULT_POINT_PATH,
};

pub const DEFAULT_BUCKET: &str = "b_35";
pub const DEFAULT_READERS: usize = 6;
pub const DEFAULT_RASTER_BUDGET: usize = 1 << 30;
pub const DEFAULT_OPEN_RETRIES: u32 = 3;
pub const DEFAULT_OPEN_BACKOFF_MS: u64 = 100;
pub const DEFAULT_TRIM_MAX_ATTEMPTS: u32 = 8;
pub const DEFAULT_TRIM_BACKOFF_MS: u64 = 50;
pub const DEFAULT_REPORT_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_LOG_FILE: &str = "voxelserver.log";

/// Everything `config.ini` can set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub cache: CacheSettings,
    pub tiles: TileSettings,
    pub world: WorldSettings,
    pub stats: StatsSettings,
    pub logging: LoggingSettings,
    /// Per-tile bucket overrides from `[buckets]`.
    pub buckets: Vec<(TileId, String)>,
}

/// `[cache]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub hash_bits: u32,
    /// Compress cached payloads after they are first sent.
    pub compress: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            hash_bits: DEFAULT_HASH_BITS,
            compress: true,
        }
    }
}

/// `[tiles]`
#[derive(Debug, Clone, PartialEq)]
pub struct TileSettings {
    pub data_dir: PathBuf,
    pub point_path: String,
    pub color_path: String,
    pub height_path: String,
    /// Bucket for tiles without an entry in `[buckets]`. Empty means such
    /// tiles are unavailable.
    pub bucket: String,
    pub tile_size: f64,
    pub readers: usize,
    pub raster_budget: usize,
    pub open_retries: u32,
    pub open_backoff_ms: u64,
    pub trim_max_attempts: u32,
    pub trim_backoff_ms: u64,
}

impl Default for TileSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            point_path: DEFAULT_POINT_PATH.to_string(),
            color_path: DEFAULT_COLOR_PATH.to_string(),
            height_path: DEFAULT_HEIGHT_PATH.to_string(),
            bucket: DEFAULT_BUCKET.to_string(),
            tile_size: DEFAULT_TILE_SIZE,
            readers: DEFAULT_READERS,
            raster_budget: DEFAULT_RASTER_BUDGET,
            open_retries: DEFAULT_OPEN_RETRIES,
            open_backoff_ms: DEFAULT_OPEN_BACKOFF_MS,
            trim_max_attempts: DEFAULT_TRIM_MAX_ATTEMPTS,
            trim_backoff_ms: DEFAULT_TRIM_BACKOFF_MS,
        }
    }
}

/// `[world]`
#[derive(Debug, Clone, PartialEq)]
pub struct WorldSettings {
    pub sea_level: f64,
    pub max_water_depth: usize,
    pub load_margin: f64,
    pub max_box_volume: u64,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            sea_level: 0.0,
            max_water_depth: DEFAULT_MAX_WATER_DEPTH,
            load_margin: DEFAULT_LOAD_MARGIN,
            max_box_volume: DEFAULT_MAX_BOX_VOLUME,
        }
    }
}

/// `[stats]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSettings {
    /// Zero disables the reporter.
    pub report_interval_secs: u64,
}

impl Default for StatsSettings {
    fn default() -> Self {
        Self {
            report_interval_secs: DEFAULT_REPORT_INTERVAL_SECS,
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub directory: String,
    pub file: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: DEFAULT_LOG_DIR.to_string(),
            file: DEFAULT_LOG_FILE.to_string(),
        }
    }
}

impl ConfigFile {
    pub fn tile_pool_config(&self) -> TilePoolConfig {
        let t = &self.tiles;
        TilePoolConfig::default()
            .with_tile_size(t.tile_size)
            .with_readers(t.readers)
            .with_raster_budget(t.raster_budget)
            .with_open_retries(t.open_retries)
            .with_open_backoff(Duration::from_millis(t.open_backoff_ms))
            .with_trim_max_attempts(t.trim_max_attempts)
            .with_trim_backoff(Duration::from_millis(t.trim_backoff_ms))
    }

    pub fn file_layout(&self) -> FileLayout {
        let t = &self.tiles;
        let default_bucket = (!t.bucket.is_empty()).then(|| t.bucket.clone());
        let mut buckets = BucketMap::new(default_bucket);
        for (tile, bucket) in &self.buckets {
            buckets.insert(*tile, bucket.clone());
        }
        FileLayout {
            data_dir: t.data_dir.clone(),
            point_path: t.point_path.clone(),
            color_path: t.color_path.clone(),
            height_path: t.height_path.clone(),
            buckets,
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_sea_level(self.world.sea_level)
            .with_max_water_depth(self.world.max_water_depth)
            .with_load_margin(self.world.load_margin)
    }

    /// `None` when the reporter is disabled.
    pub fn report_interval(&self) -> Option<Duration> {
        (self.stats.report_interval_secs > 0)
            .then(|| Duration::from_secs(self.stats.report_interval_secs))
    }
}
