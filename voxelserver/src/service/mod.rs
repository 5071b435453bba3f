//! Box serving.
//!
//! [`BoxService`] is the entry point for a request: it validates the
//! parameters, consults the cache, runs the pipeline on a miss and writes
//! the payload. [`ServerContext`] builds one from configuration and owns the
//! shared state around it.

mod context;
mod error;
mod handler;

pub use context::ServerContext;
pub use error::{BoxError, ServiceError};
pub use handler::{BoxService, ServeOutcome, Served};
