//! Write-ahead log interface consumed by the buffer pool.
//!
//! The buffer pool does not own a log; it only honors the write-ahead
//! rule. Before a dirty frame's contents are written back, the pool asks
//! the attached [`LogManager`] to make the log durable up to the frame's
//! last-modification LSN.

use shale_common::types::Lsn;

/// Write-ahead log sink.
pub trait LogManager: Send + Sync {
    /// Blocks until every log record with an LSN at or below `lsn` is
    /// durable.
    fn flush_until(&self, lsn: Lsn);
}

/// A log manager that performs no logging.
///
/// Used when the pool runs without write-ahead logging.
#[derive(Debug, Default)]
pub struct NoopLogManager;

impl LogManager for NoopLogManager {
    fn flush_until(&self, _lsn: Lsn) {}
}
