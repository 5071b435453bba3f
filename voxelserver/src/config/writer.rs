//! INI serialization: `ConfigFile` → commented `config.ini` text.

use std::fmt::Write;
use std::path::Path;

use super::settings::ConfigFile;
use super::size::format_size;

pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let c = &config.cache;
    let t = &config.tiles;
    let w = &config.world;

    let mut out = format!(
        r#"[cache]
; Number of cache cells is 2^hash_bits (1-24)
hash_bits = {}
; LZ4-compress cached boxes after they are first sent
compress = {}

[tiles]
; Root directory the path templates below are relative to
data_dir = {}
; Templates may use {{bucket}}, {{lat}} and {{lon}}
point_path = {}
color_path = {}
height_path = {}
; Bucket for tiles not listed in [buckets]; leave empty to serve only listed tiles
bucket = {}
; Tile edge length in metres
tile_size = {}
; Concurrent point readers per tile
readers = {}
; Raster memory kept before unused tiles are evicted (KB, MB, GB suffixes)
raster_budget = {}
open_retries = {}
open_backoff_ms = {}
trim_max_attempts = {}
trim_backoff_ms = {}

[world]
; Sea surface elevation in metres
sea_level = {}
; Deepest water carved below a surface, in blocks
max_water_depth = {}
; Extra metres of points loaded around each box
load_margin = {}
; Largest accepted box, in cells
max_box_volume = {}

[stats]
; Seconds between counter reports, 0 disables them
report_interval_secs = {}

[logging]
directory = {}
file = {}

[buckets]
; <lat>_<lon> = bucket
"#,
        c.hash_bits,
        c.compress,
        path_to_string(&t.data_dir),
        t.point_path,
        t.color_path,
        t.height_path,
        t.bucket,
        t.tile_size,
        t.readers,
        format_size(t.raster_budget),
        t.open_retries,
        t.open_backoff_ms,
        t.trim_max_attempts,
        t.trim_backoff_ms,
        w.sea_level,
        w.max_water_depth,
        w.load_margin,
        w.max_box_volume,
        config.stats.report_interval_secs,
        config.logging.directory,
        config.logging.file,
    );
    for (tile, bucket) in &config.buckets {
        let _ = writeln!(out, "{} = {}", tile, bucket);
    }
    out
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::super::parser::parse_ini;
    use super::*;
    use crate::coord::TileId;
    use ini::Ini;

    #[test]
    fn test_written_file_reads_back() {
        let mut config = ConfigFile::default();
        config.cache.hash_bits = 14;
        config.tiles.raster_budget = 768 << 20;
        config.world.sea_level = 2.5;
        config.buckets.push((TileId::new(462, 101), "b_21".to_string()));

        let text = to_config_string(&config);
        let parsed = parse_ini(&Ini::load_from_str(&text).unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_defaults_written_with_units() {
        let text = to_config_string(&ConfigFile::default());
        assert!(text.contains("raster_budget = 1GB"));
        assert!(text.contains("point_path = laz/gkot/{bucket}/D96TM/TM_{lat}_{lon}.laz"));
    }
}
