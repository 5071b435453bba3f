//! Service error types.

use std::io;

use thiserror::Error;

use crate::codec::PayloadError;
use crate::config::ConfigFileError;
use crate::request::InvalidBoxError;

/// Why a box request could not be answered.
#[derive(Debug, Error)]
pub enum BoxError {
    /// Rejected before any state was touched.
    #[error("Invalid box: {0}")]
    InvalidBox(#[from] InvalidBoxError),

    #[error("Payload encoding failed: {0}")]
    Payload(#[from] PayloadError),

    /// Writing the response failed. The result is still cached.
    #[error("Failed to write response: {0}")]
    Io(#[from] io::Error),
}

impl BoxError {
    /// Whether the client sent a bad request, as opposed to a server fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, BoxError::InvalidBox(_))
    }
}

/// Errors building a [`ServerContext`](super::ServerContext).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigFileError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_box_is_client_error() {
        let err: BoxError = InvalidBoxError::NotPowerOfTwo {
            axis: "sx",
            value: 3,
        }
        .into();
        assert!(err.is_client_error());
        assert!(err.to_string().contains("sx"));
    }

    #[test]
    fn test_io_is_server_error() {
        let err: BoxError = io::Error::new(io::ErrorKind::BrokenPipe, "peer went away").into();
        assert!(!err.is_client_error());
        assert!(err.to_string().contains("peer went away"));
    }
}
