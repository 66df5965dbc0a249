//! Record buffering.
//!
//! The overflow buffer is the layer pipeline stages talk to. It keeps
//! records in memory up to a budget and moves them to disk beyond it.
//!
//! # Components
//! - [`OverflowRecordBuffer`] - Memory/disk record FIFO
//! - [`BufferStats`] - Write/read/spill counters
//! - [`TypedRecordBuffer`] / [`RecordCodec`] - Records instead of payloads

mod overflow_buffer;
mod stats;
mod typed;

pub use overflow_buffer::{BufferMode, OverflowRecordBuffer};
pub use stats::{BufferStats, StatsSnapshot};
pub use typed::{RecordCodec, TypedRecordBuffer};
