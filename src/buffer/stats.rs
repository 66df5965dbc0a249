//! Overflow buffer statistics tracking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics tracked by an overflow buffer.
///
/// All fields are atomic so the consumer thread and monitoring code can read
/// them without taking the buffer lock.
///
/// # Memory Ordering
/// We use `Ordering::Relaxed` for all operations because:
/// - We only need atomicity (no partial updates)
/// - Counters are not used to synchronize anything else
///
/// # Example
/// ```
/// use spillqueue::BufferStats;
/// use std::sync::atomic::Ordering;
///
/// let stats = BufferStats::new();
/// stats.frames_written.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(stats.snapshot().frames_written, 1);
/// ```
#[derive(Debug)]
pub struct BufferStats {
    /// Frames accepted by `write_record`.
    pub frames_written: AtomicU64,

    /// Frames returned by `read_record`.
    pub frames_read: AtomicU64,

    /// Payload bytes accepted by `write_record`.
    pub bytes_written: AtomicU64,

    /// Number of memory-to-disk transitions.
    pub spills: AtomicU64,

    /// Frames moved from memory to disk during transitions.
    pub frames_spilled: AtomicU64,
}

impl BufferStats {
    /// Create a new stats tracker with all counters at zero.
    pub fn new() -> Self {
        Self {
            frames_written: AtomicU64::new(0),
            frames_read: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            spills: AtomicU64::new(0),
            frames_spilled: AtomicU64::new(0),
        }
    }

    /// Get a snapshot of current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_written: self.frames_written.load(Ordering::Relaxed),
            frames_read: self.frames_read.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            spills: self.spills.load(Ordering::Relaxed),
            frames_spilled: self.frames_spilled.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.frames_written.store(0, Ordering::Relaxed);
        self.frames_read.store(0, Ordering::Relaxed);
        self.bytes_written.store(0, Ordering::Relaxed);
        self.spills.store(0, Ordering::Relaxed);
        self.frames_spilled.store(0, Ordering::Relaxed);
    }
}

impl Default for BufferStats {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time copy of [`BufferStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub frames_written: u64,
    pub frames_read: u64,
    pub bytes_written: u64,
    pub spills: u64,
    pub frames_spilled: u64,
}

impl StatsSnapshot {
    /// Frames written but not yet read.
    pub fn pending(&self) -> u64 {
        self.frames_written - self.frames_read
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ written: {}, read: {}, bytes: {}, spills: {}, spilled: {} }}",
            self.frames_written,
            self.frames_read,
            self.bytes_written,
            self.spills,
            self.frames_spilled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = BufferStats::new();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.frames_written, 0);
        assert_eq!(snapshot.spills, 0);
        assert_eq!(snapshot.pending(), 0);
    }

    #[test]
    fn test_stats_snapshot() {
        let stats = BufferStats::new();
        stats.frames_written.fetch_add(7, Ordering::Relaxed);
        stats.frames_read.fetch_add(3, Ordering::Relaxed);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.frames_written, 7);
        assert_eq!(snapshot.frames_read, 3);
        assert_eq!(snapshot.pending(), 4);
    }

    #[test]
    fn test_stats_reset() {
        let stats = BufferStats::new();
        stats.spills.fetch_add(1, Ordering::Relaxed);
        stats.bytes_written.fetch_add(100, Ordering::Relaxed);

        stats.reset();

        assert_eq!(stats.snapshot(), BufferStats::new().snapshot());
    }

    #[test]
    fn test_stats_display() {
        let stats = BufferStats::new();
        stats.frames_written.fetch_add(80, Ordering::Relaxed);
        stats.frames_read.fetch_add(20, Ordering::Relaxed);
        stats.spills.fetch_add(1, Ordering::Relaxed);

        let display = format!("{}", stats.snapshot());

        assert!(display.contains("written: 80"));
        assert!(display.contains("read: 20"));
        assert!(display.contains("spills: 1"));
    }
}
