//! In-memory disk manager for tests and benchmarks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use shale_common::types::PageId;

use super::error::{DiskError, DiskResult};
use super::DiskManager;

/// A disk manager backed by a page map in memory.
///
/// Besides standing in for a real file, it counts every read and write
/// so tests can assert exactly how much I/O an operation issued.
pub struct MemoryDiskManager {
    pages: Mutex<HashMap<PageId, Box<[u8]>>>,
    page_size: usize,
    read_count: AtomicU64,
    write_count: AtomicU64,
}

impl MemoryDiskManager {
    /// Creates an empty in-memory store for pages of `page_size` bytes.
    pub fn new(page_size: usize) -> Self {
        Self {
            pages: Mutex::new(HashMap::new()),
            page_size,
            read_count: AtomicU64::new(0),
            write_count: AtomicU64::new(0),
        }
    }

    /// Returns the page size.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns the number of distinct pages ever written.
    pub fn page_count(&self) -> usize {
        self.pages.lock().len()
    }

    /// Returns how many `read_page` calls have been issued.
    pub fn reads(&self) -> u64 {
        self.read_count.load(Ordering::Relaxed)
    }

    /// Returns how many `write_page` calls have been issued.
    pub fn writes(&self) -> u64 {
        self.write_count.load(Ordering::Relaxed)
    }

    fn check_args(&self, page_id: PageId, len: usize) -> DiskResult<()> {
        if !page_id.is_valid() {
            return Err(DiskError::InvalidPageId);
        }
        if len != self.page_size {
            return Err(DiskError::BadBufferLength {
                page_id,
                expected: self.page_size,
                actual: len,
            });
        }
        Ok(())
    }
}

impl DiskManager for MemoryDiskManager {
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> DiskResult<()> {
        self.check_args(page_id, buf.len())?;
        self.read_count.fetch_add(1, Ordering::Relaxed);

        match self.pages.lock().get(&page_id) {
            Some(data) => buf.copy_from_slice(data),
            None => buf.fill(0),
        }
        Ok(())
    }

    fn write_page(&self, page_id: PageId, buf: &[u8]) -> DiskResult<()> {
        self.check_args(page_id, buf.len())?;
        self.write_count.fetch_add(1, Ordering::Relaxed);

        self.pages.lock().insert(page_id, buf.into());
        Ok(())
    }
}

impl std::fmt::Debug for MemoryDiskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDiskManager")
            .field("page_size", &self.page_size)
            .field("page_count", &self.page_count())
            .field("reads", &self.reads())
            .field("writes", &self.writes())
            .finish()
    }
}
