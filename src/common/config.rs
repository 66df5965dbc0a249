//! Configuration constants and buffer settings.

use std::path::PathBuf;

use crate::common::{Error, Result};

/// Size of the length prefix in front of every frame.
///
/// Shared by every queue and by the disk store, so a sequence spilled from
/// memory to disk is byte-for-byte continuable.
pub const FRAME_HEADER_LEN: usize = 4;

/// Largest payload a 4-byte length prefix can describe.
pub const MAX_FRAME_PAYLOAD: usize = u32::MAX as usize;

/// Default segment size for [`GrowableQueue`](crate::queue::GrowableQueue) (64KB).
pub const DEFAULT_SEGMENT_SIZE: usize = 64 * 1024;

/// Default in-memory budget of an overflow buffer (1MB).
pub const DEFAULT_MEMORY_BUDGET: usize = 1024 * 1024;

/// Default size of the disk store's write-behind buffer (64KB).
pub const DEFAULT_WRITE_BUFFER: usize = 64 * 1024;

/// Which in-memory queue an overflow buffer fills before spilling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryPolicy {
    /// One [`RingQueue`](crate::queue::RingQueue) sized to the memory budget.
    Ring,
    /// A [`GrowableQueue`](crate::queue::GrowableQueue) capped by the memory budget.
    Segmented { segment_size: usize },
}

impl Default for MemoryPolicy {
    fn default() -> Self {
        MemoryPolicy::Ring
    }
}

/// Settings for an [`OverflowRecordBuffer`](crate::buffer::OverflowRecordBuffer).
///
/// # Example
/// ```
/// use spillqueue::common::config::{BufferConfig, MemoryPolicy};
///
/// let config = BufferConfig::default()
///     .with_memory_budget(50_000)
///     .with_memory_policy(MemoryPolicy::Segmented { segment_size: 4096 });
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct BufferConfig {
    /// Bytes (frame headers included) held in memory before spilling.
    pub memory_budget: usize,
    pub memory_policy: MemoryPolicy,
    /// Directory for spill files. `None` means the OS temp directory.
    pub spill_dir: Option<PathBuf>,
    /// Bytes the disk store batches before writing to the file.
    pub write_buffer_size: usize,
}

impl BufferConfig {
    pub fn with_memory_budget(mut self, bytes: usize) -> Self {
        self.memory_budget = bytes;
        self
    }

    pub fn with_memory_policy(mut self, policy: MemoryPolicy) -> Self {
        self.memory_policy = policy;
        self
    }

    pub fn with_spill_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spill_dir = Some(dir.into());
        self
    }

    pub fn with_write_buffer_size(mut self, bytes: usize) -> Self {
        self.write_buffer_size = bytes;
        self
    }

    /// Check the settings for values no buffer could work with.
    ///
    /// # Errors
    /// Returns `Error::InvalidConfig` if the budget cannot hold a single
    /// frame or the segment size is zero.
    pub fn validate(&self) -> Result<()> {
        if self.memory_budget <= FRAME_HEADER_LEN {
            return Err(Error::InvalidConfig(format!(
                "memory budget {} cannot hold a frame header of {} bytes",
                self.memory_budget, FRAME_HEADER_LEN
            )));
        }
        if let MemoryPolicy::Segmented { segment_size } = self.memory_policy {
            if segment_size == 0 {
                return Err(Error::InvalidConfig("segment size must be > 0".into()));
            }
        }
        Ok(())
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            memory_budget: DEFAULT_MEMORY_BUDGET,
            memory_policy: MemoryPolicy::default(),
            spill_dir: None,
            write_buffer_size: DEFAULT_WRITE_BUFFER,
        }
    }
}
