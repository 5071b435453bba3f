//! Request handling: validation, cache lookup, generation and response.

use std::io::Write;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::BoxError;
use crate::cache::{BoxCache, CacheStats};
use crate::classify::Pipeline;
use crate::metrics::RuntimeCounters;
use crate::request::{BoxParams, BoxRequest, DEFAULT_MAX_BOX_VOLUME};

/// How a request was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    /// Served from the cache.
    Hit,
    /// Generated and cached. `collision` is set when another box was evicted.
    Miss { collision: bool },
    /// Debug request, generated without touching the cache.
    Bypass,
}

/// Result of a successfully answered request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Served {
    pub outcome: ServeOutcome,
    /// Payload bytes written to the response.
    pub bytes: usize,
}

/// Answers box requests from the cache, generating on a miss.
pub struct BoxService {
    cache: BoxCache,
    pipeline: Pipeline,
    counters: Arc<RuntimeCounters>,
    compress: bool,
    max_box_volume: u64,
}

impl BoxService {
    pub fn new(cache: BoxCache, pipeline: Pipeline, counters: Arc<RuntimeCounters>) -> Self {
        Self {
            cache,
            pipeline,
            counters,
            compress: true,
            max_box_volume: DEFAULT_MAX_BOX_VOLUME,
        }
    }

    /// Whether cached payloads are compressed after their first send.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_max_box_volume(mut self, volume: u64) -> Self {
        self.max_box_volume = volume;
        self
    }

    pub fn cache(&self) -> &BoxCache {
        &self.cache
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Answer one request, writing the payload to `out`.
    ///
    /// The cache cell for the request stays locked from lookup until the
    /// payload has been written, so concurrent requests for the same box
    /// wait and are then served from the cache. An invalid request is
    /// rejected before the cache is touched.
    ///
    /// # Errors
    ///
    /// [`BoxError::InvalidBox`] for a malformed request, [`BoxError::Io`]
    /// when `out` fails. A generated result is cached even if sending it
    /// fails.
    pub fn handle<W: Write + ?Sized>(
        &self,
        params: &BoxParams,
        out: &mut W,
    ) -> Result<Served, BoxError> {
        let request = match BoxRequest::validate(params, self.max_box_volume) {
            Ok(request) => request,
            Err(e) => {
                self.counters.invalid_request();
                debug!(error = %e, "Rejected box request");
                return Err(e.into());
            }
        };
        self.counters.request_served();

        if request.debug {
            return self.serve_uncached(&request, out);
        }

        let mut cell = self.cache.get_or_create(&request);
        let mut scratch = Vec::new();

        if cell.is_hit() {
            self.counters.cache_hit();
            let payload = cell.payload(&mut scratch).unwrap_or_default();
            out.write_all(payload)?;
            self.counters.box_sent();
            trace!(bucket = cell.bucket(), bytes = payload.len(), "Cache hit");
            return Ok(Served {
                outcome: ServeOutcome::Hit,
                bytes: payload.len(),
            });
        }

        let collision = cell.is_collision();
        self.counters.cache_miss(collision);
        if collision {
            debug!(
                bucket = cell.bucket(),
                x = request.x,
                z = request.z,
                "Cache collision, evicting previous box"
            );
        }

        let before = cell.stored_len();
        cell.clear();
        let raw = self.pipeline.generate(&request).encode()?;
        self.counters.box_created();
        let bytes = raw.len();
        cell.store(request, raw);

        let sent = cell
            .payload(&mut scratch)
            .map_or(Ok(()), |payload| out.write_all(payload));
        if sent.is_ok() {
            self.counters.box_sent();
        } else {
            warn!(x = request.x, z = request.z, "Failed to send generated box");
        }

        if self.compress {
            cell.compress();
        }
        self.counters.cache_resized(before, cell.stored_len());

        sent?;
        Ok(Served {
            outcome: ServeOutcome::Miss { collision },
            bytes,
        })
    }

    fn serve_uncached<W: Write + ?Sized>(
        &self,
        request: &BoxRequest,
        out: &mut W,
    ) -> Result<Served, BoxError> {
        let raw = self.pipeline.generate(request).encode()?;
        self.counters.box_created();
        out.write_all(&raw)?;
        self.counters.box_sent();
        Ok(Served {
            outcome: ServeOutcome::Bypass,
            bytes: raw.len(),
        })
    }
}
