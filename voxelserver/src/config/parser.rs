//! INI parsing: `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use super::size::parse_size;
use crate::coord::TileId;

/// Start from the defaults and overlay every value present in `ini`.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    if let Some(s) = ini.section(Some("cache")) {
        if let Some(v) = s.get("hash_bits") {
            let bits: u32 = parse_value("cache", "hash_bits", v, "must be an integer from 1 to 24")?;
            if !(1..=24).contains(&bits) {
                return Err(invalid("cache", "hash_bits", v, "must be an integer from 1 to 24"));
            }
            config.cache.hash_bits = bits;
        }
        if let Some(v) = s.get("compress") {
            config.cache.compress = parse_bool("cache", "compress", v)?;
        }
    }

    if let Some(s) = ini.section(Some("tiles")) {
        let t = &mut config.tiles;
        if let Some(v) = non_empty(s, "data_dir") {
            t.data_dir = expand_tilde(v);
        }
        if let Some(v) = non_empty(s, "point_path") {
            t.point_path = v.to_string();
        }
        if let Some(v) = non_empty(s, "color_path") {
            t.color_path = v.to_string();
        }
        if let Some(v) = non_empty(s, "height_path") {
            t.height_path = v.to_string();
        }
        if let Some(v) = s.get("bucket") {
            t.bucket = v.trim().to_string();
        }
        if let Some(v) = s.get("tile_size") {
            t.tile_size = parse_value("tiles", "tile_size", v, "must be a positive number")?;
            if t.tile_size.is_nan() || t.tile_size <= 0.0 {
                return Err(invalid("tiles", "tile_size", v, "must be a positive number"));
            }
        }
        if let Some(v) = s.get("readers") {
            t.readers = parse_value("tiles", "readers", v, "must be a positive integer")?;
            if t.readers == 0 {
                return Err(invalid("tiles", "readers", v, "must be a positive integer"));
            }
        }
        if let Some(v) = s.get("raster_budget") {
            t.raster_budget = parse_size(v).map_err(|_| {
                invalid("tiles", "raster_budget", v, "expected a size like '1GB' or '512MB'")
            })?;
        }
        if let Some(v) = s.get("open_retries") {
            t.open_retries = parse_value("tiles", "open_retries", v, "must be a non-negative integer")?;
        }
        if let Some(v) = s.get("open_backoff_ms") {
            t.open_backoff_ms =
                parse_value("tiles", "open_backoff_ms", v, "must be milliseconds")?;
        }
        if let Some(v) = s.get("trim_max_attempts") {
            t.trim_max_attempts =
                parse_value("tiles", "trim_max_attempts", v, "must be a non-negative integer")?;
        }
        if let Some(v) = s.get("trim_backoff_ms") {
            t.trim_backoff_ms =
                parse_value("tiles", "trim_backoff_ms", v, "must be milliseconds")?;
        }
    }

    if let Some(s) = ini.section(Some("world")) {
        let w = &mut config.world;
        if let Some(v) = s.get("sea_level") {
            w.sea_level = parse_value("world", "sea_level", v, "must be a number (metres)")?;
        }
        if let Some(v) = s.get("max_water_depth") {
            w.max_water_depth =
                parse_value("world", "max_water_depth", v, "must be a non-negative integer")?;
        }
        if let Some(v) = s.get("load_margin") {
            w.load_margin = parse_value("world", "load_margin", v, "must be a number (metres)")?;
            if w.load_margin < 0.0 {
                return Err(invalid("world", "load_margin", v, "must not be negative"));
            }
        }
        if let Some(v) = s.get("max_box_volume") {
            w.max_box_volume =
                parse_value("world", "max_box_volume", v, "must be a positive integer")?;
        }
    }

    if let Some(s) = ini.section(Some("stats")) {
        if let Some(v) = s.get("report_interval_secs") {
            config.stats.report_interval_secs =
                parse_value("stats", "report_interval_secs", v, "must be seconds, 0 to disable")?;
        }
    }

    if let Some(s) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(s, "directory") {
            config.logging.directory = v.to_string();
        }
        if let Some(v) = non_empty(s, "file") {
            config.logging.file = v.to_string();
        }
    }

    if let Some(s) = ini.section(Some("buckets")) {
        for (key, value) in s.iter() {
            let tile = parse_tile_id(key)
                .ok_or_else(|| invalid("buckets", key, value, "key must be '<lat>_<lon>'"))?;
            config.buckets.push((tile, value.trim().to_string()));
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_value<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

fn parse_bool(section: &str, key: &str, value: &str) -> Result<bool, ConfigFileError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid(section, key, value, "must be true or false")),
    }
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn parse_tile_id(key: &str) -> Option<TileId> {
    let (lat, lon) = key.trim().split_once('_')?;
    Some(TileId::new(lat.parse().ok()?, lon.parse().ok()?))
}

fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn parse(text: &str) -> Result<ConfigFile, ConfigFileError> {
        parse_ini(&Ini::load_from_str(text).unwrap())
    }

    #[test]
    fn test_empty_is_default() {
        assert_eq!(parse("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_overlays_values() {
        let config = parse(
            "[cache]\nhash_bits = 12\ncompress = false\n\
             [tiles]\ndata_dir = /srv/lidar\nreaders = 2\nraster_budget = 256MB\n\
             open_backoff_ms = 5\n\
             [world]\nsea_level = -1.5\nmax_water_depth = 4\n\
             [stats]\nreport_interval_secs = 0\n",
        )
        .unwrap();

        assert_eq!(config.cache.hash_bits, 12);
        assert!(!config.cache.compress);
        assert_eq!(config.tiles.data_dir, PathBuf::from("/srv/lidar"));
        assert_eq!(config.tiles.readers, 2);
        assert_eq!(config.tiles.raster_budget, 256 << 20);
        assert_eq!(
            config.tile_pool_config().open_backoff,
            Duration::from_millis(5)
        );
        assert_eq!(config.world.sea_level, -1.5);
        assert_eq!(config.pipeline_config().max_water_depth, 4);
        assert_eq!(config.report_interval(), None);
    }

    #[test]
    fn test_buckets_section() {
        let config = parse("[buckets]\n462_101 = b_21\n-3_7 = b_1\n").unwrap();
        assert_eq!(
            config.buckets,
            vec![
                (TileId::new(462, 101), "b_21".to_string()),
                (TileId::new(-3, 7), "b_1".to_string()),
            ]
        );
    }

    #[test]
    fn test_invalid_values() {
        for text in [
            "[cache]\nhash_bits = 0\n",
            "[cache]\ncompress = maybe\n",
            "[tiles]\nreaders = 0\n",
            "[tiles]\nraster_budget = lots\n",
            "[tiles]\ntile_size = -5\n",
            "[world]\nsea_level = high\n",
            "[buckets]\nnowhere = b_1\n",
        ] {
            assert!(
                matches!(parse(text), Err(ConfigFileError::InvalidValue { .. })),
                "{text:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_invalid_value_names_key() {
        let err = parse("[tiles]\nreaders = many\n").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("tiles.readers"));
        assert!(message.contains("many"));
    }
}
