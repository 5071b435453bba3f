//! Validated box requests.
//!
//! A [`BoxRequest`] is built from raw [`BoxParams`] and is the only form the
//! cache and pipeline accept. Construction rejects sizes that are not
//! positive powers of two and volumes above the configured limit, so no
//! downstream component ever sees an invalid box.

use thiserror::Error;

use crate::coord::{Origin, VerticalOrigin};

/// Default upper bound on `sx * sy * sz`.
pub const DEFAULT_MAX_BOX_VOLUME: u64 = 1 << 22;

/// Reasons a box request is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidBoxError {
    #[error("box size {axis}={value} is not a positive power of two")]
    NotPowerOfTwo { axis: &'static str, value: i32 },

    #[error("box volume {volume} exceeds limit {limit}")]
    TooLarge { volume: u64, limit: u64 },
}

/// Unvalidated request parameters as received from a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxParams {
    pub origin_x: i32,
    pub origin_y: i32,
    /// Raw vertical origin; `i32::MAX` requests automatic placement.
    pub origin_z: i32,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub sx: i32,
    pub sy: i32,
    pub sz: i32,
    pub world_hash: u32,
    pub debug: bool,
}

impl BoxParams {
    pub fn new(origin: (i32, i32, i32), position: (i32, i32, i32), size: (i32, i32, i32)) -> Self {
        Self {
            origin_x: origin.0,
            origin_y: origin.1,
            origin_z: origin.2,
            x: position.0,
            y: position.1,
            z: position.2,
            sx: size.0,
            sy: size.1,
            sz: size.2,
            world_hash: 0,
            debug: false,
        }
    }

    pub fn with_world_hash(mut self, hash: u32) -> Self {
        self.world_hash = hash;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// A validated request for one box of blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoxRequest {
    pub origin: Origin,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    sx: u32,
    sy: u32,
    sz: u32,
    pub world_hash: u32,
    pub debug: bool,
}

impl BoxRequest {
    /// Validate raw parameters against a volume limit.
    pub fn validate(params: &BoxParams, max_volume: u64) -> Result<Self, InvalidBoxError> {
        let sx = power_of_two("sx", params.sx)?;
        let sy = power_of_two("sy", params.sy)?;
        let sz = power_of_two("sz", params.sz)?;

        let volume = sx as u64 * sy as u64 * sz as u64;
        if volume > max_volume {
            return Err(InvalidBoxError::TooLarge {
                volume,
                limit: max_volume,
            });
        }

        Ok(Self {
            origin: Origin::new(
                params.origin_x,
                params.origin_y,
                VerticalOrigin::from_raw(params.origin_z),
            ),
            x: params.x,
            y: params.y,
            z: params.z,
            sx,
            sy,
            sz,
            world_hash: params.world_hash,
            debug: params.debug,
        })
    }

    pub fn sx(&self) -> u32 {
        self.sx
    }

    pub fn sy(&self) -> u32 {
        self.sy
    }

    pub fn sz(&self) -> u32 {
        self.sz
    }

    pub fn size(&self) -> (usize, usize, usize) {
        (self.sx as usize, self.sy as usize, self.sz as usize)
    }

    pub fn volume(&self) -> usize {
        self.sx as usize * self.sy as usize * self.sz as usize
    }

    /// Box coordinates in units of the box size, as reported in payloads.
    pub fn block_index(&self) -> (i32, i32, i32) {
        (
            self.x >> self.sx.trailing_zeros(),
            self.y >> self.sy.trailing_zeros(),
            self.z >> self.sz.trailing_zeros(),
        )
    }
}

fn power_of_two(axis: &'static str, value: i32) -> Result<u32, InvalidBoxError> {
    if value > 0 && (value as u32).is_power_of_two() {
        Ok(value as u32)
    } else {
        Err(InvalidBoxError::NotPowerOfTwo { axis, value })
    }
}
