//! Core types for ShaleDB.

mod ids;

pub use ids::{FrameId, Lsn, PageId};
