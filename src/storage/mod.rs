//! Storage layer - frames on disk.
//!
//! This module handles spilled data:
//! - [`DiskRecordStore`] - Append/drain/rewind store over a temporary file

mod disk_record_store;

pub use disk_record_store::DiskRecordStore;
