//! # shale-common
//!
//! Common types and constants for ShaleDB.
//!
//! This crate provides the foundational types shared across the storage
//! engine:
//!
//! - **Types**: Core identifiers (`PageId`, `FrameId`, `Lsn`)
//! - **Constants**: System-wide page and buffer pool constants
//!
//! ## Example
//!
//! ```rust
//! use shale_common::types::{FrameId, PageId};
//!
//! let page_id = PageId::new(42);
//! let frame_id = FrameId::new(0);
//! assert!(page_id.is_valid());
//! assert!(frame_id.is_valid());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use types::{FrameId, Lsn, PageId};
