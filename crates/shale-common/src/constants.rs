//! System-wide constants for ShaleDB.

// =============================================================================
// Page and Memory Constants
// =============================================================================

/// Default page size in bytes (8 KB).
///
/// This balances I/O efficiency with memory usage and matches the typical
/// SSD block size.
pub const DEFAULT_PAGE_SIZE: usize = 8 * 1024;

/// Minimum page size in bytes (4 KB).
pub const MIN_PAGE_SIZE: usize = 4 * 1024;

/// Maximum page size in bytes (64 KB).
pub const MAX_PAGE_SIZE: usize = 64 * 1024;

// =============================================================================
// Buffer Pool Constants
// =============================================================================

/// Default number of frames in the buffer pool.
pub const DEFAULT_POOL_SIZE: usize = 1024;

/// Default K for the LRU-K replacement policy.
///
/// LRU-2 distinguishes pages accessed repeatedly from pages touched once
/// by a scan, at negligible bookkeeping cost.
pub const DEFAULT_REPLACER_K: usize = 2;

/// Default capacity of one page-directory bucket.
pub const DEFAULT_BUCKET_CAPACITY: usize = 8;
