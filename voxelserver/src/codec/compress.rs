//! LZ4 block compression for cached payloads.
//!
//! Compressed buffers carry the uncompressed length as a little-endian `u32`
//! prefix, as written by [`lz4_flex::block::compress_prepend_size`].

use super::PayloadError;

/// Compress a payload for storage.
pub fn compress(raw: &[u8]) -> Vec<u8> {
    lz4_flex::block::compress_prepend_size(raw)
}

/// Decompress into a new buffer.
pub fn decompress(compressed: &[u8]) -> Result<Vec<u8>, PayloadError> {
    let mut out = Vec::new();
    decompress_into(compressed, &mut out)?;
    Ok(out)
}

/// Decompress into `scratch`, replacing its contents.
///
/// The scratch buffer keeps its allocation across calls, so a serving thread
/// can reuse one buffer for every cache hit.
pub fn decompress_into(compressed: &[u8], scratch: &mut Vec<u8>) -> Result<(), PayloadError> {
    if compressed.len() < 4 {
        return Err(PayloadError::Truncated);
    }
    let size =
        u32::from_le_bytes([compressed[0], compressed[1], compressed[2], compressed[3]]) as usize;

    scratch.clear();
    scratch.resize(size, 0);
    let written = lz4_flex::block::decompress_into(&compressed[4..], scratch)
        .map_err(|e| PayloadError::Decompress(e.to_string()))?;
    if written != size {
        return Err(PayloadError::Decompress(format!(
            "expected {} bytes, got {}",
            size, written
        )));
    }
    Ok(())
}
