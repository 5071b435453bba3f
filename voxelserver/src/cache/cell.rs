//! A single cache cell.

use crate::codec;
use crate::request::BoxRequest;

/// Cached result for whichever box last hashed to this cell.
///
/// A cell holds at most one of `raw` or `compressed` once it has been
/// compressed; before that only `raw` is set.
#[derive(Debug, Default)]
pub struct BoxResult {
    valid: bool,
    echo: Option<BoxRequest>,
    access: u64,
    raw: Option<Vec<u8>>,
    compressed: Option<Vec<u8>>,
}

impl BoxResult {
    /// Whether this cell holds a complete result for exactly `request`.
    pub fn matches(&self, request: &BoxRequest) -> bool {
        self.valid && self.echo.as_ref() == Some(request)
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The request whose result is cached here.
    pub fn echo(&self) -> Option<&BoxRequest> {
        self.echo.as_ref()
    }

    pub fn access(&self) -> u64 {
        self.access
    }

    pub(crate) fn touch(&mut self, stamp: u64) {
        self.access = stamp;
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed.is_some()
    }

    /// Drop any previous result, marking the cell invalid.
    pub fn clear(&mut self) {
        self.valid = false;
        self.echo = None;
        self.raw = None;
        self.compressed = None;
    }

    /// Replace the cell contents with a freshly generated payload.
    pub fn store(&mut self, request: BoxRequest, raw: Vec<u8>) {
        self.echo = Some(request);
        self.raw = Some(raw);
        self.compressed = None;
        self.valid = true;
    }

    /// Compress the raw payload and release it. No-op when already
    /// compressed or empty.
    ///
    /// Returns the compressed size when compression happened.
    pub fn compress(&mut self) -> Option<usize> {
        if self.compressed.is_some() {
            return None;
        }
        let raw = self.raw.take()?;
        let packed = codec::compress(&raw);
        let size = packed.len();
        self.compressed = Some(packed);
        Some(size)
    }

    /// The cached payload bytes, decompressing into `scratch` if needed.
    ///
    /// # Panics
    ///
    /// Panics if the compressed bytes are corrupt. Cells are only written by
    /// [`store`](Self::store) and [`compress`](Self::compress), so a failure
    /// here means memory corruption.
    pub fn payload<'a>(&'a self, scratch: &'a mut Vec<u8>) -> Option<&'a [u8]> {
        if let Some(raw) = &self.raw {
            return Some(raw);
        }
        let compressed = self.compressed.as_ref()?;
        if let Err(e) = codec::decompress_into(compressed, scratch) {
            panic!("cached box payload is corrupt: {}", e);
        }
        Some(scratch.as_slice())
    }

    pub fn raw_len(&self) -> usize {
        self.raw.as_ref().map_or(0, Vec::len)
    }

    pub fn compressed_len(&self) -> usize {
        self.compressed.as_ref().map_or(0, Vec::len)
    }

    /// Bytes currently held, in whichever form.
    pub fn stored_len(&self) -> usize {
        self.raw_len() + self.compressed_len()
    }
}
