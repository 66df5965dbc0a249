//! Overflow Record Buffer - the record-level buffer pipeline stages use.
//!
//! The [`OverflowRecordBuffer`] provides:
//! - FIFO buffering of opaque record payloads
//! - In-memory storage up to a byte budget
//! - Transparent spill to a [`DiskRecordStore`] past the budget
//! - An EOF flag for end-of-stream detection

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::buffer::BufferStats;
use crate::common::config::{BufferConfig, MemoryPolicy, MAX_FRAME_PAYLOAD};
use crate::common::frame::frame_len;
use crate::common::{Error, Result};
use crate::queue::{FrameQueue, GrowableQueue, RingQueue};
use crate::storage::DiskRecordStore;

/// Which store currently backs the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferMode {
    /// Frames live in the in-memory queue.
    Memory,
    /// Frames live in a disk store. Sticks until `reset()`.
    Spilled,
}

enum Store {
    Memory(Box<dyn FrameQueue + Send>),
    Spilled(DiskRecordStore),
}

struct Inner {
    store: Store,
    /// Reused while moving frames from memory to disk.
    scratch: Vec<u8>,
}

/// A FIFO of record payloads that spills from memory to disk.
///
/// # Architecture
/// ```text
/// ┌──────────────────────────────────────────────────────────┐
/// │                   OverflowRecordBuffer                   │
/// │                                                          │
/// │  write_record ──▶ ┌──────────────────────┐ ──▶ read_record
/// │                   │ Memory: FrameQueue   │               │
/// │                   │   (budget bytes)     │               │
/// │                   └──────────┬───────────┘               │
/// │                              │ full: drain in order      │
/// │                              ▼                           │
/// │                   ┌──────────────────────┐               │
/// │                   │ Spilled: DiskRecord- │               │
/// │                   │   Store (temp file)  │               │
/// │                   └──────────────────────┘               │
/// │  buffered_records: AtomicU64   eof: AtomicBool           │
/// └──────────────────────────────────────────────────────────┘
/// ```
///
/// # State Machine
/// `Memory → Spilled → (reset) → Memory`. `close()` is reachable from any
/// state and terminal. EOF is an independent flag cleared only by `reset()`.
///
/// An I/O error from the spill store fails the buffer: the error is returned
/// once, and every later read, write, EOF or reset call returns
/// `Error::Poisoned`. Only queries and `close()` still work.
///
/// # Thread Safety
/// Every method takes `&self`, so one producer thread and one consumer
/// thread may share the buffer through an `Arc`. A mutex serializes access
/// to the active store; the mode switch happens under it, which keeps the
/// frame order intact across the transition. More than one producer or one
/// consumer is outside the contract.
///
/// # Usage
/// ```
/// use spillqueue::OverflowRecordBuffer;
///
/// let buffer = OverflowRecordBuffer::with_memory_budget(1024)?;
/// buffer.write_record(b"first")?;
/// buffer.write_record(b"second")?;
/// buffer.set_eof()?;
///
/// while let Some(payload) = buffer.read_record()? {
///     println!("{} bytes", payload.len());
/// }
/// assert!(buffer.is_exhausted());
/// # Ok::<(), spillqueue::Error>(())
/// ```
pub struct OverflowRecordBuffer {
    config: BufferConfig,

    /// Active store, plus the scratch buffer used when spilling.
    inner: Mutex<Inner>,

    /// Frames written minus frames read.
    buffered_records: AtomicU64,

    /// Producer promised no more frames.
    eof: AtomicBool,

    /// Mirrors the mode so it can be read without the lock.
    spilled: AtomicBool,

    closed: AtomicBool,

    /// Set on the first spill store I/O error.
    failed: AtomicBool,

    stats: BufferStats,
}

impl OverflowRecordBuffer {
    /// Create a buffer from `config`.
    ///
    /// # Errors
    /// Returns `Error::InvalidConfig` if `config` does not validate.
    pub fn new(config: BufferConfig) -> Result<Self> {
        config.validate()?;
        let queue = memory_queue(&config);

        Ok(Self {
            config,
            inner: Mutex::new(Inner {
                store: Store::Memory(queue),
                scratch: Vec::new(),
            }),
            buffered_records: AtomicU64::new(0),
            eof: AtomicBool::new(false),
            spilled: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            failed: AtomicBool::new(false),
            stats: BufferStats::new(),
        })
    }

    /// Create a ring-backed buffer holding up to `bytes` in memory.
    pub fn with_memory_budget(bytes: usize) -> Result<Self> {
        Self::new(BufferConfig::default().with_memory_budget(bytes))
    }

    // ========================================================================
    // Public API: Write and read
    // ========================================================================

    /// Append one record payload.
    ///
    /// In memory mode the payload goes to the in-memory queue if it fits the
    /// budget. Otherwise every buffered frame is moved, in order, to a new
    /// disk store and this and all later payloads are appended there.
    ///
    /// # Errors
    /// - `Error::Closed` after `close()`
    /// - `Error::Poisoned` after an earlier I/O error
    /// - `Error::FrameTooLarge` if the payload exceeds a 4-byte prefix
    /// - I/O errors from the disk store (fatal for this buffer)
    pub fn write_record(&self, payload: &[u8]) -> Result<()> {
        if payload.len() > MAX_FRAME_PAYLOAD {
            return Err(Error::FrameTooLarge {
                len: payload.len(),
                max: MAX_FRAME_PAYLOAD,
            });
        }

        // close() may have run while we waited for the lock
        let mut inner = self.inner.lock();
        self.ensure_usable()?;

        let needs_spill = match &mut inner.store {
            Store::Memory(queue) => {
                let fits =
                    queue.used_bytes() + frame_len(payload.len()) <= self.config.memory_budget;
                !(fits && queue.offer(payload))
            }
            Store::Spilled(disk) => {
                self.check_io(disk.push(payload))?;
                false
            }
        };

        if needs_spill {
            self.check_io(self.spill(&mut inner))?;
            if let Store::Spilled(disk) = &mut inner.store {
                self.check_io(disk.push(payload))?;
            }
        }

        self.buffered_records.fetch_add(1, Ordering::Release);
        self.stats.frames_written.fetch_add(1, Ordering::Relaxed);
        self.stats
            .bytes_written
            .fetch_add(payload.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    /// Remove the oldest record and return its payload.
    ///
    /// `Ok(None)` means nothing is buffered right now. It is the end of the
    /// stream only once [`is_eof`](Self::is_eof) is also true.
    pub fn read_record(&self) -> Result<Option<Vec<u8>>> {
        let mut out = Vec::new();
        if self.read_record_into(&mut out)? {
            Ok(Some(out))
        } else {
            Ok(None)
        }
    }

    /// Like [`read_record`](Self::read_record), reusing `out` for the payload.
    ///
    /// Returns `Ok(false)` if nothing is buffered.
    pub fn read_record_into(&self, out: &mut Vec<u8>) -> Result<bool> {
        let mut inner = self.inner.lock();
        self.ensure_usable()?;

        let found = match &mut inner.store {
            Store::Memory(queue) => queue.poll(out),
            Store::Spilled(disk) => {
                let found = self.check_io(disk.shift(out))?;
                if found && !disk.has_remaining() {
                    // Drained: give the file space back, stay spilled.
                    // A failed truncate leaves the offsets untouched, so the
                    // store is still consistent and the frame is delivered.
                    if let Err(e) = disk.clear() {
                        tracing::warn!(error = %e, "failed to truncate drained spill file");
                    }
                }
                found
            }
        };

        if found {
            self.buffered_records.fetch_sub(1, Ordering::Release);
            self.stats.frames_read.fetch_add(1, Ordering::Relaxed);
        }
        Ok(found)
    }

    // ========================================================================
    // Public API: Lifecycle
    // ========================================================================

    /// Mark that the producer will write no more records.
    ///
    /// Already buffered records stay readable.
    pub fn set_eof(&self) -> Result<()> {
        self.ensure_usable()?;
        self.eof.store(true, Ordering::Release);
        Ok(())
    }

    /// Discard all content, clear EOF and return to memory mode.
    ///
    /// Any disk store is closed and its file deleted. The buffer is ready for
    /// a new write/read cycle; nothing from the previous one is replayed.
    pub fn reset(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        self.ensure_usable()?;

        match &mut inner.store {
            Store::Memory(queue) => queue.clear(),
            Store::Spilled(disk) => {
                self.check_io(disk.close())?;
                inner.store = Store::Memory(memory_queue(&self.config));
            }
        }
        tracing::debug!(
            discarded = self.buffered_records.load(Ordering::Acquire),
            "reset overflow buffer"
        );

        self.buffered_records.store(0, Ordering::Release);
        self.spilled.store(false, Ordering::Release);
        self.eof.store(false, Ordering::Release);
        self.stats.reset();
        Ok(())
    }

    /// Release memory and delete any spill file. Idempotent.
    ///
    /// All other operations fail with `Error::Closed` afterwards.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let mut inner = self.inner.lock();

        // An empty GrowableQueue holds no segments
        let released = std::mem::replace(
            &mut inner.store,
            Store::Memory(Box::new(GrowableQueue::new())),
        );
        inner.scratch = Vec::new();
        self.buffered_records.store(0, Ordering::Release);

        if let Store::Spilled(mut disk) = released {
            disk.close()?;
        }
        Ok(())
    }

    // ========================================================================
    // Public API: State queries
    // ========================================================================

    /// Records written and not yet read.
    #[inline]
    pub fn buffered_records(&self) -> u64 {
        self.buffered_records.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.eof.load(Ordering::Acquire)
    }

    /// EOF is set and every record has been read: the stream is over.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.is_eof() && self.buffered_records() == 0
    }

    /// Whether this cycle has spilled to disk.
    #[inline]
    pub fn has_file(&self) -> bool {
        self.spilled.load(Ordering::Acquire)
    }

    pub fn mode(&self) -> BufferMode {
        if self.has_file() {
            BufferMode::Spilled
        } else {
            BufferMode::Memory
        }
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Whether a spill store I/O error has made the buffer unusable.
    #[inline]
    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    /// Bytes held by the in-memory queue (0 once spilled).
    pub fn memory_used(&self) -> usize {
        match &self.inner.lock().store {
            Store::Memory(queue) => queue.used_bytes(),
            Store::Spilled(_) => 0,
        }
    }

    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    pub fn stats(&self) -> &BufferStats {
        &self.stats
    }

    // ========================================================================
    // Internal
    // ========================================================================

    fn ensure_usable(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::Closed)
        } else if self.is_failed() {
            Err(Error::Poisoned)
        } else {
            Ok(())
        }
    }

    /// Fail the buffer if a spill store operation returned an error.
    fn check_io<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            tracing::error!(error = %e, "spill store failed, buffer is unusable");
            self.failed.store(true, Ordering::Release);
        }
        result
    }

    /// Move every buffered frame to a new disk store and switch to it.
    fn spill(&self, inner: &mut Inner) -> Result<()> {
        let Inner { store, scratch } = inner;
        let Store::Memory(queue) = store else {
            return Ok(());
        };

        // Nothing leaves memory until the spill file exists
        let mut disk = DiskRecordStore::with_config(&self.config);
        disk.create_file()?;

        let bytes = queue.used_bytes();
        let mut moved = 0u64;
        while queue.poll(scratch) {
            disk.push(scratch)?;
            moved += 1;
        }

        tracing::debug!(
            frames = moved,
            bytes,
            budget = self.config.memory_budget,
            "memory budget exceeded, spilling to disk"
        );

        *store = Store::Spilled(disk);
        self.spilled.store(true, Ordering::Release);
        self.stats.spills.fetch_add(1, Ordering::Relaxed);
        self.stats.frames_spilled.fetch_add(moved, Ordering::Relaxed);
        Ok(())
    }
}

/// Build the in-memory queue `config` asks for.
fn memory_queue(config: &BufferConfig) -> Box<dyn FrameQueue + Send> {
    match config.memory_policy {
        MemoryPolicy::Ring => Box::new(RingQueue::new(config.memory_budget)),
        MemoryPolicy::Segmented { segment_size } => {
            Box::new(GrowableQueue::with_segment_size(segment_size))
        }
    }
}
