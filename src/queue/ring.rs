//! RingQueue - bounded circular byte store of frames.
//!
//! Frames are written back to back and wrap around the end of the buffer,
//! so a frame may be split physically but is always read whole.

use std::cell::UnsafeCell;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::common::config::FRAME_HEADER_LEN;
use crate::common::frame::{decode_header, encode_header, frame_len};
use crate::queue::FrameQueue;

/// Storage shared by the producer and consumer sides.
///
/// # Memory Ordering
/// The write cursor belongs to the producer and the read cursor to the
/// consumer; neither is shared. The only shared state is `occupied`:
/// - the producer copies a whole frame, then `fetch_add` with `Release`
/// - the consumer loads with `Acquire` before reading, and `fetch_sub` with
///   `Release` once the bytes are copied out
///
/// so a frame is visible only once complete, and its bytes are reused only
/// once the consumer is done with them.
struct RingShared {
    buf: Box<[UnsafeCell<u8>]>,
    /// Bytes in use. Distinguishes full from empty when the cursors meet.
    occupied: AtomicUsize,
    frames: AtomicUsize,
    /// Set by the producer after its last offer.
    eof: AtomicBool,
}

// SAFETY: bytes in `buf` are only written by the single producer in the free
// region and only read by the single consumer in the occupied region; the
// two regions are separated by `occupied` with Acquire/Release ordering.
unsafe impl Sync for RingShared {}

impl RingShared {
    fn new(capacity: usize) -> Self {
        let mut buf = Vec::with_capacity(capacity);
        buf.resize_with(capacity, || UnsafeCell::new(0u8));
        Self {
            buf: buf.into_boxed_slice(),
            occupied: AtomicUsize::new(0),
            frames: AtomicUsize::new(0),
            eof: AtomicBool::new(false),
        }
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    fn base_ptr(&self) -> *mut u8 {
        // UnsafeCell<u8> has the same layout as u8
        UnsafeCell::raw_get(self.buf.as_ptr())
    }

    /// Copy `data` in at `pos`, wrapping at the end. Returns the new cursor.
    ///
    /// # Safety
    /// Caller must be the only producer and `data.len()` must not exceed
    /// the free bytes starting at `pos`.
    unsafe fn copy_in(&self, pos: usize, data: &[u8]) -> usize {
        let cap = self.capacity();
        let first = data.len().min(cap - pos);
        let base = self.base_ptr();
        ptr::copy_nonoverlapping(data.as_ptr(), base.add(pos), first);
        ptr::copy_nonoverlapping(data.as_ptr().add(first), base, data.len() - first);
        (pos + data.len()) % cap
    }

    /// Copy `out.len()` bytes out from `pos`, wrapping at the end.
    ///
    /// # Safety
    /// Caller must be the only consumer and `out.len()` must not exceed the
    /// occupied bytes starting at `pos`.
    unsafe fn copy_out(&self, pos: usize, out: &mut [u8]) -> usize {
        let cap = self.capacity();
        let first = out.len().min(cap - pos);
        let base = self.base_ptr() as *const u8;
        ptr::copy_nonoverlapping(base.add(pos), out.as_mut_ptr(), first);
        ptr::copy_nonoverlapping(base, out.as_mut_ptr().add(first), out.len() - first);
        (pos + out.len()) % cap
    }

    fn offer(&self, write_pos: &mut usize, payload: &[u8]) -> bool {
        let needed = frame_len(payload.len());
        let occupied = self.occupied.load(Ordering::Acquire);
        if needed > self.capacity() - occupied {
            return false;
        }
        // Anything that fits in the ring fits in a u32 prefix on the
        // platforms we target, but do not write a truncated length.
        let Ok(header) = encode_header(payload.len()) else {
            return false;
        };

        // SAFETY: single producer (enforced by &mut on the owning handle),
        // and `needed` bytes from `write_pos` are free per the check above.
        unsafe {
            let pos = self.copy_in(*write_pos, &header);
            *write_pos = self.copy_in(pos, payload);
        }

        self.frames.fetch_add(1, Ordering::Relaxed);
        self.occupied.fetch_add(needed, Ordering::Release);
        true
    }

    fn poll(&self, read_pos: &mut usize, out: &mut Vec<u8>) -> bool {
        if self.occupied.load(Ordering::Acquire) == 0 {
            return false;
        }

        let mut header = [0u8; FRAME_HEADER_LEN];
        // SAFETY: single consumer, and a non-zero occupancy means at least
        // one complete frame starts at `read_pos`.
        let len = unsafe {
            let pos = self.copy_out(*read_pos, &mut header);
            let len = decode_header(header);
            out.clear();
            out.resize(len, 0);
            *read_pos = self.copy_out(pos, out);
            len
        };

        self.frames.fetch_sub(1, Ordering::Relaxed);
        self.occupied.fetch_sub(frame_len(len), Ordering::Release);
        true
    }
}

/// A bounded FIFO of frames in a fixed circular buffer.
///
/// `offer` fails (returns `false`) without a partial write when the frame and
/// its 4-byte prefix do not fit; `poll` returns `false` when empty. Neither
/// blocks. A caller that must wait loops on the call.
///
/// # Example
/// ```
/// use spillqueue::queue::{FrameQueue, RingQueue};
///
/// let mut queue = RingQueue::new(16);
/// assert!(queue.offer(b"abcd"));      // 8 bytes
/// assert!(queue.offer(b"efgh"));      // 16 bytes, full
/// assert!(!queue.offer(b""));
///
/// let mut out = Vec::new();
/// assert!(queue.poll(&mut out));
/// assert_eq!(out, b"abcd");
/// ```
pub struct RingQueue {
    shared: Arc<RingShared>,
    write_pos: usize,
    read_pos: usize,
}

impl RingQueue {
    /// Create a ring of `capacity` bytes.
    ///
    /// # Panics
    /// Panics if `capacity` cannot hold one frame header.
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity > FRAME_HEADER_LEN,
            "ring capacity must exceed the frame header size"
        );
        Self {
            shared: Arc::new(RingShared::new(capacity)),
            write_pos: 0,
            read_pos: 0,
        }
    }

    /// Total capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// Bytes still available for frames (headers included).
    #[inline]
    pub fn free_bytes(&self) -> usize {
        self.capacity() - self.used_bytes()
    }

    /// Split into a producer and a consumer that may live on different threads.
    pub fn split(self) -> (RingProducer, RingConsumer) {
        let producer = RingProducer {
            shared: Arc::clone(&self.shared),
            write_pos: self.write_pos,
        };
        let consumer = RingConsumer {
            shared: self.shared,
            read_pos: self.read_pos,
        };
        (producer, consumer)
    }
}

impl FrameQueue for RingQueue {
    fn offer(&mut self, payload: &[u8]) -> bool {
        self.shared.offer(&mut self.write_pos, payload)
    }

    fn poll(&mut self, out: &mut Vec<u8>) -> bool {
        self.shared.poll(&mut self.read_pos, out)
    }

    fn used_bytes(&self) -> usize {
        self.shared.occupied.load(Ordering::Acquire)
    }

    fn frame_count(&self) -> usize {
        self.shared.frames.load(Ordering::Relaxed)
    }

    fn clear(&mut self) {
        // &mut self: no split handles exist, nobody else touches the ring
        self.write_pos = 0;
        self.read_pos = 0;
        self.shared.frames.store(0, Ordering::Relaxed);
        self.shared.occupied.store(0, Ordering::Release);
    }
}

/// Writing half of a split [`RingQueue`].
pub struct RingProducer {
    shared: Arc<RingShared>,
    write_pos: usize,
}

impl RingProducer {
    /// See [`FrameQueue::offer`].
    pub fn offer(&mut self, payload: &[u8]) -> bool {
        self.shared.offer(&mut self.write_pos, payload)
    }

    /// Bytes still available for frames (headers included).
    pub fn free_bytes(&self) -> usize {
        self.shared.capacity() - self.shared.occupied.load(Ordering::Acquire)
    }

    /// Signal that no more frames follow.
    ///
    /// Frames already offered stay readable; the consumer sees
    /// [`RingConsumer::is_exhausted`] once it has polled them all.
    pub fn set_eof(&self) {
        self.shared.eof.store(true, Ordering::Release);
    }
}

/// Reading half of a split [`RingQueue`].
pub struct RingConsumer {
    shared: Arc<RingShared>,
    read_pos: usize,
}

impl RingConsumer {
    /// See [`FrameQueue::poll`].
    pub fn poll(&mut self, out: &mut Vec<u8>) -> bool {
        self.shared.poll(&mut self.read_pos, out)
    }

    /// No complete frame is waiting right now.
    pub fn is_empty(&self) -> bool {
        self.shared.occupied.load(Ordering::Acquire) == 0
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.shared.eof.load(Ordering::Acquire)
    }

    /// The producer set EOF and every frame has been polled.
    ///
    /// EOF is loaded first: its `Acquire` makes every offer made before
    /// `set_eof` visible, so an empty ring afterwards is really drained.
    pub fn is_exhausted(&self) -> bool {
        self.is_eof() && self.is_empty()
    }
}
