//! Color and height rasters covering one tile.
//!
//! Both rasters span the full tile extent with row 0 at the northern edge.
//! World positions outside the tile clamp to the nearest edge pixel.

use std::fs::File;
use std::path::Path;

use image::RgbImage;
use memmap2::Mmap;

use super::TileError;
use crate::coord::WorldRect;

/// Height samples at or below this value mean "no data".
pub const HEIGHT_NODATA_THRESHOLD: f32 = -1000.0;

/// Map a world position to a pixel, clamped to the raster bounds.
#[inline]
fn pixel_of(extent: &WorldRect, width: usize, height: usize, wx: f64, wy: f64) -> (usize, usize) {
    let fx = (wx - extent.min_x) / (extent.max_x - extent.min_x);
    let fy = (extent.max_y - wy) / (extent.max_y - extent.min_y);
    let col = (fx * width as f64).floor().clamp(0.0, (width - 1) as f64) as usize;
    let row = (fy * height as f64).floor().clamp(0.0, (height - 1) as f64) as usize;
    (col, row)
}

/// Decoded aerial color image for a tile.
#[derive(Debug, Clone)]
pub struct ColorRaster {
    image: RgbImage,
}

impl ColorRaster {
    /// Wrap an image. Returns `None` for a zero-sized image.
    pub fn new(image: RgbImage) -> Option<Self> {
        if image.width() == 0 || image.height() == 0 {
            None
        } else {
            Some(Self { image })
        }
    }

    /// Decode an image file.
    pub fn open(path: &Path) -> Result<Self, TileError> {
        let image = image::open(path)
            .map_err(|e| TileError::Raster {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
            .to_rgb8();
        Self::new(image).ok_or_else(|| TileError::Raster {
            path: path.to_path_buf(),
            reason: "empty image".to_string(),
        })
    }

    pub fn width(&self) -> usize {
        self.image.width() as usize
    }

    pub fn height(&self) -> usize {
        self.image.height() as usize
    }

    /// Resident size in bytes.
    pub fn bytes(&self) -> usize {
        self.image.as_raw().len()
    }

    /// Color at a world position inside `extent`.
    pub fn sample(&self, extent: &WorldRect, wx: f64, wy: f64) -> [u8; 3] {
        let (col, row) = pixel_of(extent, self.width(), self.height(), wx, wy);
        self.image.get_pixel(col as u32, row as u32).0
    }
}

enum HeightData {
    Mapped(Mmap),
    Owned(Vec<f32>),
}

/// Square grid of little-endian `f32` elevations.
pub struct HeightRaster {
    data: HeightData,
    side: usize,
}

impl std::fmt::Debug for HeightRaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.data {
            HeightData::Mapped(_) => "mapped",
            HeightData::Owned(_) => "owned",
        };
        f.debug_struct("HeightRaster")
            .field("side", &self.side)
            .field("data", &kind)
            .finish()
    }
}

impl HeightRaster {
    /// Memory-map a raw height file. The file length must be `4 * side²`.
    pub fn open(path: &Path) -> Result<Self, TileError> {
        let file = File::open(path)?;
        // SAFETY: height files are written once by the data pipeline and never
        // modified while the server runs.
        let map = unsafe { Mmap::map(&file)? };
        let side = square_side(map.len() / 4).filter(|_| map.len() % 4 == 0);
        match side {
            Some(side) if side > 0 => Ok(Self {
                data: HeightData::Mapped(map),
                side,
            }),
            _ => Err(TileError::Raster {
                path: path.to_path_buf(),
                reason: format!("{} bytes is not a square f32 grid", map.len()),
            }),
        }
    }

    /// Build from in-memory samples in row-major order.
    pub fn from_samples(samples: Vec<f32>) -> Option<Self> {
        let side = square_side(samples.len())?;
        if side == 0 {
            return None;
        }
        Some(Self {
            data: HeightData::Owned(samples),
            side,
        })
    }

    pub fn side(&self) -> usize {
        self.side
    }

    /// Resident size in bytes.
    pub fn bytes(&self) -> usize {
        self.side * self.side * 4
    }

    fn raw(&self, col: usize, row: usize) -> f32 {
        let i = row * self.side + col;
        match &self.data {
            HeightData::Mapped(map) => {
                let b = &map[i * 4..i * 4 + 4];
                f32::from_le_bytes([b[0], b[1], b[2], b[3]])
            }
            HeightData::Owned(samples) => samples[i],
        }
    }

    /// Elevation at a world position inside `extent`, or NaN for no data.
    pub fn sample(&self, extent: &WorldRect, wx: f64, wy: f64) -> f64 {
        let (col, row) = pixel_of(extent, self.side, self.side, wx, wy);
        let value = self.raw(col, row);
        if !value.is_finite() || value <= HEIGHT_NODATA_THRESHOLD {
            f64::NAN
        } else {
            value as f64
        }
    }
}

fn square_side(len: usize) -> Option<usize> {
    let side = (len as f64).sqrt().round() as usize;
    (side * side == len).then_some(side)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn extent() -> WorldRect {
        WorldRect {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 1000.0,
            max_y: 1000.0,
        }
    }

    #[test]
    fn test_color_north_up_and_clamped() {
        let mut image = RgbImage::new(2, 2);
        image.put_pixel(0, 0, image::Rgb([1, 0, 0]));
        image.put_pixel(1, 0, image::Rgb([2, 0, 0]));
        image.put_pixel(0, 1, image::Rgb([3, 0, 0]));
        image.put_pixel(1, 1, image::Rgb([4, 0, 0]));
        let raster = ColorRaster::new(image).unwrap();
        let e = extent();

        assert_eq!(raster.sample(&e, 100.0, 900.0), [1, 0, 0]);
        assert_eq!(raster.sample(&e, 900.0, 900.0), [2, 0, 0]);
        assert_eq!(raster.sample(&e, 100.0, 100.0), [3, 0, 0]);
        assert_eq!(raster.sample(&e, 5000.0, -5000.0), [4, 0, 0]);
        assert_eq!(raster.bytes(), 12);
    }

    #[test]
    fn test_height_nodata() {
        let raster = HeightRaster::from_samples(vec![10.0, -9999.0, f32::NAN, 20.5]).unwrap();
        let e = extent();
        assert_eq!(raster.sample(&e, 100.0, 900.0), 10.0);
        assert!(raster.sample(&e, 900.0, 900.0).is_nan());
        assert!(raster.sample(&e, 100.0, 100.0).is_nan());
        assert_eq!(raster.sample(&e, 900.0, 100.0), 20.5);
    }

    #[test]
    fn test_height_rejects_non_square() {
        assert!(HeightRaster::from_samples(vec![1.0; 3]).is_none());
        assert!(HeightRaster::from_samples(Vec::new()).is_none());
    }

    #[test]
    fn test_height_mmap() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for v in [1.0f32, 2.0, 3.0, 4.0] {
            file.write_all(&v.to_le_bytes()).unwrap();
        }
        file.flush().unwrap();

        let raster = HeightRaster::open(file.path()).unwrap();
        assert_eq!(raster.side(), 2);
        assert_eq!(raster.sample(&extent(), 900.0, 100.0), 4.0);
    }

    #[test]
    fn test_height_mmap_bad_length() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 12]).unwrap();
        file.flush().unwrap();
        assert!(HeightRaster::open(file.path()).is_err());
    }
}
