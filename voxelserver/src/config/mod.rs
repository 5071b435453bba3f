//! Configuration file loading.
//!
//! Settings live in an INI file, by default `~/.voxelserver/config.ini`.
//! Every key is optional; anything left out keeps its default. Each section
//! maps onto the configuration type of the component it drives.

mod file;
mod parser;
mod settings;
mod size;
mod writer;

pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    CacheSettings, ConfigFile, LoggingSettings, StatsSettings, TileSettings, WorldSettings,
    DEFAULT_BUCKET, DEFAULT_LOG_DIR, DEFAULT_LOG_FILE, DEFAULT_REPORT_INTERVAL_SECS,
};
pub use size::{format_size, parse_size, SizeParseError};
