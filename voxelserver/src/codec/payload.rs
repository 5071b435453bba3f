//! Box payload layout.
//!
//! All integers are big-endian:
//!
//! ```text
//! world_hash      u32
//! shrink_offset   i32   (-1 when the box was not shrunk)
//! shrunk_height   i32
//! block_x         i32
//! block_y         i32
//! block_z         i32
//! blocks          AMF3 Vector.<uint>
//! columns         AMF3 Vector.<uint>
//! max_height      i32   (-2 when the box is empty)
//! ```

use super::amf::{read_uint_vector, write_uint_vector};
use super::PayloadError;
use crate::request::BoxRequest;

/// `shrink_offset` value for a box that kept its full height.
pub const NOT_SHRUNK: i32 = -1;

/// `max_height` value for a box with no occupied cell.
pub const EMPTY_MAX_HEIGHT: i32 = -2;

const HEADER_LEN: usize = 6 * 4;

/// Decoded form of a box payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxPayload {
    pub world_hash: u32,
    pub shrink_offset: i32,
    pub shrunk_height: i32,
    pub block_x: i32,
    pub block_y: i32,
    pub block_z: i32,
    /// Block codes indexed `x + z * sx + y * sx * sz` over the shrunk window.
    pub blocks: Vec<u32>,
    /// Topmost occupied `y` per column, indexed `x + z * sx`, relative to the
    /// unshrunk box (0 for an empty column).
    pub columns: Vec<u32>,
    pub max_height: i32,
}

impl BoxPayload {
    /// Payload for a box with nothing in it.
    pub fn empty(request: &BoxRequest) -> Self {
        let (block_x, block_y, block_z) = request.block_index();
        Self {
            world_hash: request.world_hash,
            shrink_offset: NOT_SHRUNK,
            shrunk_height: 0,
            block_x,
            block_y,
            block_z,
            blocks: Vec::new(),
            columns: Vec::new(),
            max_height: EMPTY_MAX_HEIGHT,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.max_height == EMPTY_MAX_HEIGHT
    }

    /// Serialize into a fresh buffer.
    pub fn encode(&self) -> Result<Vec<u8>, PayloadError> {
        let mut out = Vec::with_capacity(HEADER_LEN + 16 + 4 * (self.blocks.len() + self.columns.len()));
        self.encode_into(&mut out)?;
        Ok(out)
    }

    /// Append the serialized payload to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), PayloadError> {
        out.extend_from_slice(&self.world_hash.to_be_bytes());
        for value in [
            self.shrink_offset,
            self.shrunk_height,
            self.block_x,
            self.block_y,
            self.block_z,
        ] {
            out.extend_from_slice(&value.to_be_bytes());
        }
        write_uint_vector(out, &self.blocks)?;
        write_uint_vector(out, &self.columns)?;
        out.extend_from_slice(&self.max_height.to_be_bytes());
        Ok(())
    }

    /// Parse a serialized payload. Trailing bytes are an error.
    pub fn decode(input: &[u8]) -> Result<Self, PayloadError> {
        if input.len() < HEADER_LEN {
            return Err(PayloadError::Truncated);
        }
        let word = |at: usize| [input[at], input[at + 1], input[at + 2], input[at + 3]];

        let world_hash = u32::from_be_bytes(word(0));
        let shrink_offset = i32::from_be_bytes(word(4));
        let shrunk_height = i32::from_be_bytes(word(8));
        let block_x = i32::from_be_bytes(word(12));
        let block_y = i32::from_be_bytes(word(16));
        let block_z = i32::from_be_bytes(word(20));

        let mut at = HEADER_LEN;
        let (blocks, used) = read_uint_vector(&input[at..])?;
        at += used;
        let (columns, used) = read_uint_vector(&input[at..])?;
        at += used;

        if input.len() < at + 4 {
            return Err(PayloadError::Truncated);
        }
        let max_height = i32::from_be_bytes(word(at));
        at += 4;
        if at != input.len() {
            return Err(PayloadError::TrailingBytes(input.len() - at));
        }

        Ok(Self {
            world_hash,
            shrink_offset,
            shrunk_height,
            block_x,
            block_y,
            block_z,
            blocks,
            columns,
            max_height,
        })
    }
}
