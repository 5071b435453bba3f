//! Classified points and the spatial index used to query them.

mod index;
mod kdtree;

pub use index::PointIndex;
pub use kdtree::{KdTree, LEAF_SIZE};

/// A single classified scan point in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub classification: u8,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64, classification: u8) -> Self {
        Self {
            x,
            y,
            z,
            classification,
        }
    }

    #[inline]
    pub fn position(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    #[inline]
    pub fn distance_sq(&self, p: [f64; 3]) -> f64 {
        let dx = self.x - p[0];
        let dy = self.y - p[1];
        let dz = self.z - p[2];
        dx * dx + dy * dy + dz * dz
    }
}
