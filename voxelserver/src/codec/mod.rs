//! Binary payload format and cache compression.
//!
//! Payloads are what a box request returns on the wire and what the cache
//! stores. Cached payloads are compressed with LZ4 once they have been sent.

mod amf;
mod compress;
mod payload;

pub use amf::{read_u29, read_uint_vector, write_u29, write_uint_vector, U29_MAX, VECTOR_UINT_MARKER};
pub use compress::{compress, decompress, decompress_into};
pub use payload::{BoxPayload, EMPTY_MAX_HEIGHT, NOT_SHRUNK};

use thiserror::Error;

/// Errors from encoding or decoding payloads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("payload truncated")]
    Truncated,

    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),

    #[error("unexpected AMF marker 0x{0:02X}")]
    UnexpectedMarker(u8),

    #[error("AMF object references are not supported")]
    ReferenceNotSupported,

    #[error("value {0} does not fit in a U29")]
    U29Overflow(u32),

    #[error("vector of {0} elements is too long for AMF3")]
    VectorTooLong(usize),

    #[error("LZ4 decompression failed: {0}")]
    Decompress(String),
}
