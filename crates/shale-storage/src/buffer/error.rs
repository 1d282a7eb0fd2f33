//! Buffer pool errors.

use thiserror::Error;

use crate::disk::DiskError;

/// Result type for buffer pool operations.
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur during buffer pool operations.
///
/// "All frames pinned" is not an error: `new_page` and `fetch_page`
/// signal it with `Ok(None)` so callers can retry or back off. Caller
/// mistakes such as unpinning an unpinned page come back as `false`
/// returns. Only configuration problems and disk faults surface here.
#[derive(Debug, Error)]
pub enum BufferError {
    /// Configuration error.
    #[error("configuration error: {message}")]
    Config {
        /// What was wrong with the configuration.
        message: String,
    },

    /// I/O fault from the disk manager, propagated unchanged.
    #[error("disk I/O failed: {source}")]
    Disk {
        /// The underlying disk error.
        #[from]
        source: DiskError,
    },
}

impl BufferError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
