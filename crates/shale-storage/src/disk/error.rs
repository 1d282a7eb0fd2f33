//! Disk manager errors.

use std::io;
use std::path::PathBuf;

use shale_common::types::PageId;
use thiserror::Error;

/// Result type for disk operations.
pub type DiskResult<T> = Result<T, DiskError>;

/// Errors that can occur during page I/O.
///
/// Disk errors are fatal to the caller; the buffer pool propagates them
/// unchanged and never retries.
#[derive(Debug, Error)]
pub enum DiskError {
    /// I/O error without path context.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: io::Error,
    },

    /// I/O error on a specific file.
    #[error("I/O error on {path}: {source}")]
    IoPath {
        /// The file the operation failed on.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// The caller passed a buffer whose length differs from the page size.
    #[error("bad buffer length for page {page_id}: expected {expected}, got {actual}")]
    BadBufferLength {
        /// The page being read or written.
        page_id: PageId,
        /// The configured page size.
        expected: usize,
        /// The length of the buffer supplied.
        actual: usize,
    },

    /// The caller addressed the invalid page id sentinel.
    #[error("cannot perform I/O on the invalid page id")]
    InvalidPageId,
}

impl DiskError {
    /// Attaches path context to an I/O error.
    pub fn from_io_with_path(source: io::Error, path: impl Into<PathBuf>) -> Self {
        Self::IoPath {
            path: path.into(),
            source,
        }
    }
}
