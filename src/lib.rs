//! spillqueue - record buffering that spills from memory to disk.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           spillqueue                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Record Buffer (buffer/)                     │   │
//! │  │   OverflowRecordBuffer + TypedRecordBuffer + Stats       │   │
//! │  │        memory ──(budget exceeded)──▶ spilled             │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                 ↓                              ↓                │
//! │  ┌────────────────────────────┐  ┌──────────────────────────┐  │
//! │  │   Frame Queues (queue/)    │  │   Storage (storage/)     │  │
//! │  │  RingQueue | GrowableQueue │  │    DiskRecordStore       │  │
//! │  └────────────────────────────┘  └──────────────────────────┘  │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │       Frame codec (common/frame): [len u32][payload]     │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Data flows one way: producer → buffer → (queue or disk) → consumer, in
//! the order it was written, across the memory/disk switch.
//!
//! # Modules
//! - [`common`] - Shared primitives (config, Error, frame codec)
//! - [`queue`] - Bounded and growable in-memory frame queues
//! - [`storage`] - Disk-backed frame store
//! - [`buffer`] - The overflow record buffer
//!
//! # Quick Start
//! ```
//! use spillqueue::{BufferConfig, OverflowRecordBuffer};
//!
//! let buffer = OverflowRecordBuffer::new(BufferConfig::default().with_memory_budget(64))?;
//!
//! for i in 0u32..100 {
//!     buffer.write_record(&i.to_le_bytes())?;
//! }
//! buffer.set_eof()?;
//! assert!(buffer.has_file());
//!
//! let mut next = 0u32;
//! while let Some(payload) = buffer.read_record()? {
//!     assert_eq!(payload, next.to_le_bytes());
//!     next += 1;
//! }
//! buffer.close()?;
//! # Ok::<(), spillqueue::Error>(())
//! ```

pub mod buffer;
pub mod common;
pub mod queue;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{BufferConfig, MemoryPolicy, FRAME_HEADER_LEN};
pub use common::{Error, Result};

pub use buffer::{
    BufferMode, BufferStats, OverflowRecordBuffer, RecordCodec, StatsSnapshot, TypedRecordBuffer,
};
pub use queue::{FrameQueue, GrowableQueue, RingQueue};
pub use storage::DiskRecordStore;
