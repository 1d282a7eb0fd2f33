//! # shale-storage
//!
//! Buffer pool and page I/O for ShaleDB.
//!
//! This crate implements the in-memory page cache that mediates all
//! access to the backing database file:
//!
//! - A fixed array of page frames with pin counts and dirty tracking
//! - An extendible-hash page directory mapping page ids to frames
//! - An LRU-K replacement policy for victim selection
//! - A synchronous disk manager for page-granular file I/O

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Buffer pool manager and its supporting structures
pub mod buffer;

/// Disk manager and page-granular file I/O
pub mod disk;

/// Write-ahead log interface consumed by the buffer pool
pub mod wal;
