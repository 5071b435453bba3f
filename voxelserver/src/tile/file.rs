//! Tile data read from the local filesystem.
//!
//! Point files are LAS/LAZ, color rasters any format the `image` crate
//! decodes, and height rasters raw little-endian `f32` grids. Paths are built
//! from templates with `{bucket}`, `{lat}` and `{lon}` placeholders, relative
//! to a data directory.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use super::{ColorRaster, HeightRaster, PointReader, TileError, TileSource};
use crate::coord::{TileId, WorldRect};
use crate::point::Point;

/// Default point file template.
pub const DEFAULT_POINT_PATH: &str = "laz/gkot/{bucket}/D96TM/TM_{lat}_{lon}.laz";
/// Default color raster template.
pub const DEFAULT_COLOR_PATH: &str = "dof84/{bucket}/{lat}_{lon}.png";
/// Default height raster template.
pub const DEFAULT_HEIGHT_PATH: &str = "height/{bucket}/{lat}_{lon}.f32";

/// Maps tiles to storage buckets.
///
/// Explicit entries win; otherwise the default bucket applies. Without a
/// default, only listed tiles are available.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketMap {
    default_bucket: Option<String>,
    entries: HashMap<TileId, String>,
}

impl BucketMap {
    pub fn new(default_bucket: Option<String>) -> Self {
        Self {
            default_bucket,
            entries: HashMap::new(),
        }
    }

    pub fn with_entry(mut self, tile: TileId, bucket: impl Into<String>) -> Self {
        self.entries.insert(tile, bucket.into());
        self
    }

    pub fn insert(&mut self, tile: TileId, bucket: impl Into<String>) {
        self.entries.insert(tile, bucket.into());
    }

    pub fn resolve(&self, tile: TileId) -> Option<String> {
        self.entries
            .get(&tile)
            .or(self.default_bucket.as_ref())
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Path templates and bucket lookup for [`FileTileSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLayout {
    pub data_dir: PathBuf,
    pub point_path: String,
    pub color_path: String,
    pub height_path: String,
    pub buckets: BucketMap,
}

impl Default for FileLayout {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            point_path: DEFAULT_POINT_PATH.to_string(),
            color_path: DEFAULT_COLOR_PATH.to_string(),
            height_path: DEFAULT_HEIGHT_PATH.to_string(),
            buckets: BucketMap::new(Some("b_35".to_string())),
        }
    }
}

impl FileLayout {
    fn expand(&self, template: &str, tile: TileId, bucket: &str) -> PathBuf {
        let relative = template
            .replace("{bucket}", bucket)
            .replace("{lat}", &tile.lat.to_string())
            .replace("{lon}", &tile.lon.to_string());
        self.data_dir.join(relative)
    }

    pub fn point_file(&self, tile: TileId, bucket: &str) -> PathBuf {
        self.expand(&self.point_path, tile, bucket)
    }

    pub fn color_file(&self, tile: TileId, bucket: &str) -> PathBuf {
        self.expand(&self.color_path, tile, bucket)
    }

    pub fn height_file(&self, tile: TileId, bucket: &str) -> PathBuf {
        self.expand(&self.height_path, tile, bucket)
    }
}

/// Tile source backed by files on disk.
#[derive(Debug, Clone, Default)]
pub struct FileTileSource {
    layout: FileLayout,
}

impl FileTileSource {
    pub fn new(layout: FileLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &FileLayout {
        &self.layout
    }
}

fn not_found(path: &Path) -> bool {
    !path.exists()
}

impl TileSource for FileTileSource {
    fn resolve(&self, tile: TileId) -> Option<String> {
        self.layout.buckets.resolve(tile)
    }

    fn open_points(&self, tile: TileId, bucket: &str) -> Result<Box<dyn PointReader>, TileError> {
        let path = self.layout.point_file(tile, bucket);
        let reader = LasPointReader::open(&path)?;
        debug!(tile = %tile, path = %path.display(), "Opened point reader");
        Ok(Box::new(reader))
    }

    fn open_color(&self, tile: TileId, bucket: &str) -> Result<Option<ColorRaster>, TileError> {
        let path = self.layout.color_file(tile, bucket);
        if not_found(&path) {
            return Ok(None);
        }
        ColorRaster::open(&path).map(Some)
    }

    fn open_height(&self, tile: TileId, bucket: &str) -> Result<Option<HeightRaster>, TileError> {
        let path = self.layout.height_file(tile, bucket);
        if not_found(&path) {
            return Ok(None);
        }
        HeightRaster::open(&path).map(Some)
    }
}

/// Point reader over a LAS or LAZ file.
pub struct LasPointReader {
    path: PathBuf,
    reader: las::Reader,
    bounds: WorldRect,
}

impl LasPointReader {
    pub fn open(path: &Path) -> Result<Self, TileError> {
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => TileError::PointSourceMissing(path.to_path_buf()),
            _ => TileError::Io(e),
        })?;
        let reader = las::Reader::new(BufReader::new(file)).map_err(|e| TileError::PointFormat {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let b = reader.header().bounds();
        let bounds = WorldRect {
            min_x: b.min.x,
            min_y: b.min.y,
            max_x: b.max.x,
            max_y: b.max.y,
        };
        Ok(Self {
            path: path.to_path_buf(),
            reader,
            bounds,
        })
    }
}

impl PointReader for LasPointReader {
    fn read_rect(
        &mut self,
        rect: &WorldRect,
        sink: &mut dyn FnMut(Point),
    ) -> Result<usize, TileError> {
        if !self.bounds.intersects(rect) {
            trace!(path = %self.path.display(), "Request outside file bounds");
            return Ok(0);
        }

        let format_error = |e: las::Error| TileError::PointFormat {
            path: self.path.clone(),
            reason: e.to_string(),
        };
        self.reader.seek(0).map_err(format_error)?;

        let mut count = 0;
        for point_result in self.reader.points() {
            let point = point_result.map_err(format_error)?;
            if rect.contains(point.x, point.y) {
                sink(Point::new(
                    point.x,
                    point.y,
                    point.z,
                    u8::from(point.classification),
                ));
                count += 1;
            }
        }
        Ok(count)
    }
}
