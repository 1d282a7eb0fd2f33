//! File-backed disk manager.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use shale_common::types::PageId;

use super::error::{DiskError, DiskResult};
use super::DiskManager;

/// Synchronous disk manager over a single database file.
///
/// Pages live at offset `page_id * page_size`. The file grows lazily:
/// writing page N extends the file as needed, and reading a page beyond
/// the current end of the file yields zeroes.
pub struct FileDiskManager {
    /// Path to the database file.
    path: PathBuf,
    /// File handle, serialized because positioned I/O seeks.
    file: Mutex<File>,
    /// Page size in bytes.
    page_size: usize,
}

impl FileDiskManager {
    /// Opens or creates a database file.
    pub fn open(path: impl AsRef<Path>, page_size: usize) -> DiskResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| DiskError::from_io_with_path(e, &path))?;

        Ok(Self {
            path,
            file: Mutex::new(file),
            page_size,
        })
    }

    /// Returns the path to the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the page size this manager was opened with.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns the number of whole pages the file currently covers.
    pub fn num_pages(&self) -> DiskResult<u64> {
        let file = self.file.lock();
        let len = file
            .metadata()
            .map_err(|e| DiskError::from_io_with_path(e, &self.path))?
            .len();
        Ok(len.div_ceil(self.page_size as u64))
    }

    fn check_args(&self, page_id: PageId, len: usize) -> DiskResult<u64> {
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
        Ok(page_id.as_u64() * self.page_size as u64)
    }
}

impl DiskManager for FileDiskManager {
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> DiskResult<()> {
        let offset = self.check_args(page_id, buf.len())?;
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| DiskError::from_io_with_path(e, &self.path))?;

        // A short read means the page lies past EOF; the remainder stays zero.
        buf.fill(0);
        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(DiskError::from_io_with_path(e, &self.path)),
            }
        }
        Ok(())
    }

    fn write_page(&self, page_id: PageId, buf: &[u8]) -> DiskResult<()> {
        let offset = self.check_args(page_id, buf.len())?;
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| DiskError::from_io_with_path(e, &self.path))?;
        file.write_all(buf)
            .map_err(|e| DiskError::from_io_with_path(e, &self.path))?;
        Ok(())
    }

    fn sync(&self) -> DiskResult<()> {
        self.file
            .lock()
            .sync_all()
            .map_err(|e| DiskError::from_io_with_path(e, &self.path))
    }
}

impl std::fmt::Debug for FileDiskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDiskManager")
            .field("path", &self.path)
            .field("page_size", &self.page_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PAGE_SIZE: usize = 4096;

    fn create_test_dm() -> (FileDiskManager, TempDir) {
        let dir = TempDir::new().unwrap();
        let dm = FileDiskManager::open(dir.path().join("test.db"), PAGE_SIZE).unwrap();
        (dm, dir)
    }

    #[test]
    fn test_create() {
        let (dm, _dir) = create_test_dm();
        assert_eq!(dm.num_pages().unwrap(), 0);
        assert_eq!(dm.page_size(), PAGE_SIZE);
    }

    #[test]
    fn test_write_then_read() {
        let (dm, _dir) = create_test_dm();

        let mut page = vec![0u8; PAGE_SIZE];
        page[0] = 42;
        page[PAGE_SIZE - 1] = 0xFF;
        dm.write_page(PageId::new(0), &page).unwrap();

        let mut out = vec![1u8; PAGE_SIZE];
        dm.read_page(PageId::new(0), &mut out).unwrap();
        assert_eq!(out, page);
    }

    #[test]
    fn test_read_past_eof_is_zeroed() {
        let (dm, _dir) = create_test_dm();

        let mut out = vec![0xAAu8; PAGE_SIZE];
        dm.read_page(PageId::new(100), &mut out).unwrap();
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_sparse_write_extends_file() {
        let (dm, _dir) = create_test_dm();

        let page = vec![7u8; PAGE_SIZE];
        dm.write_page(PageId::new(3), &page).unwrap();
        assert_eq!(dm.num_pages().unwrap(), 4);

        // Skipped pages read back as zeroes.
        let mut out = vec![1u8; PAGE_SIZE];
        dm.read_page(PageId::new(1), &mut out).unwrap();
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_bad_buffer_length() {
        let (dm, _dir) = create_test_dm();

        let small = vec![0u8; 16];
        let err = dm.write_page(PageId::new(0), &small).unwrap_err();
        assert!(matches!(err, DiskError::BadBufferLength { .. }));
    }

    #[test]
    fn test_invalid_page_id() {
        let (dm, _dir) = create_test_dm();

        let page = vec![0u8; PAGE_SIZE];
        let err = dm.write_page(PageId::INVALID, &page).unwrap_err();
        assert!(matches!(err, DiskError::InvalidPageId));
    }

    #[test]
    fn test_persistence_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");

        {
            let dm = FileDiskManager::open(&path, PAGE_SIZE).unwrap();
            let mut page = vec![0u8; PAGE_SIZE];
            page[0..4].copy_from_slice(&[1, 2, 3, 4]);
            dm.write_page(PageId::new(0), &page).unwrap();
            dm.sync().unwrap();
        }

        {
            let dm = FileDiskManager::open(&path, PAGE_SIZE).unwrap();
            assert_eq!(dm.num_pages().unwrap(), 1);
            let mut out = vec![0u8; PAGE_SIZE];
            dm.read_page(PageId::new(0), &mut out).unwrap();
            assert_eq!(&out[0..4], &[1, 2, 3, 4]);
        }
    }
}
