//! Buffer pool for ShaleDB.
//!
//! The buffer pool is a bounded in-memory cache of fixed-size pages
//! that mediates all access to the backing file:
//!
//! - **Frames**: preallocated slots with pin counts and dirty tracking
//! - **Page directory**: an extendible hash table mapping resident page
//!   ids to frames, splitting buckets on overflow instead of rehashing
//! - **Replacement**: LRU-K victim selection among unpinned frames
//! - **Write-back**: dirty frames reach disk before their slot is
//!   reused, after the write-ahead log is forced
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       BufferPool                         │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │    Page directory: ExtendibleHashTable<PageId,     │  │
//! │  │                    FrameId>                        │  │
//! │  └────────────────────────────────────────────────────┘  │
//! │                           │                              │
//! │                           ▼                              │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │  Frame array + free list                           │  │
//! │  │  ┌─────────┐ ┌─────────┐     ┌─────────┐           │  │
//! │  │  │ Frame 0 │ │ Frame 1 │ ... │ Frame N │           │  │
//! │  │  │ page_id │ │ page_id │     │ page_id │           │  │
//! │  │  │ pin_cnt │ │ pin_cnt │     │ pin_cnt │           │  │
//! │  │  │ dirty   │ │ dirty   │     │ dirty   │           │  │
//! │  │  │ data[]  │ │ data[]  │     │ data[]  │           │  │
//! │  │  └─────────┘ └─────────┘     └─────────┘           │  │
//! │  └────────────────────────────────────────────────────┘  │
//! │                           │                              │
//! │                           ▼                              │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │  LruKReplacer (victim selection)                   │  │
//! │  └────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use shale_storage::buffer::{BufferPool, BufferPoolConfig};
//! use shale_storage::disk::MemoryDiskManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let disk = Arc::new(MemoryDiskManager::new(8192));
//! let pool = BufferPool::new(BufferPoolConfig::new(64), disk)?;
//!
//! let (page_id, frame) = pool.new_page()?.expect("a frame is free");
//! frame.write_data()[0] = 42;
//! pool.unpin_page(page_id, true);
//!
//! let frame = pool.fetch_page(page_id)?.expect("a frame is free");
//! assert_eq!(frame.read_data()[0], 42);
//! pool.unpin_page(page_id, false);
//! # Ok(())
//! # }
//! ```

mod config;
mod directory;
mod error;
mod frame;
mod pool;
mod replacer;

pub use config::BufferPoolConfig;
pub use directory::ExtendibleHashTable;
pub use error::{BufferError, BufferResult};
pub use frame::BufferFrame;
pub use pool::BufferPool;
pub use replacer::{LruKReplacer, LruReplacer, Replacer};

/// Statistics for buffer pool monitoring.
#[derive(Debug, Clone, Default)]
pub struct BufferPoolStats {
    /// Total number of page fetches.
    pub fetches: u64,
    /// Number of fetches served from memory.
    pub hits: u64,
    /// Number of fetches that required a disk read.
    pub misses: u64,
    /// Number of frames reassigned through the replacer.
    pub evictions: u64,
    /// Number of frame write-backs.
    pub flushes: u64,
    /// Current number of pinned frames.
    pub pinned_frames: usize,
    /// Current number of dirty frames.
    pub dirty_frames: usize,
}

impl BufferPoolStats {
    /// Returns the cache hit ratio (0.0 to 1.0).
    pub fn hit_ratio(&self) -> f64 {
        if self.fetches == 0 {
            0.0
        } else {
            self.hits as f64 / self.fetches as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_hit_ratio() {
        let mut stats = BufferPoolStats::default();
        assert_eq!(stats.hit_ratio(), 0.0);

        stats.fetches = 100;
        stats.hits = 80;
        assert!((stats.hit_ratio() - 0.8).abs() < f64::EPSILON);
    }
}
