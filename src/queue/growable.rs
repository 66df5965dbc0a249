//! GrowableQueue - unbounded frame queue over chained memory segments.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::config::{DEFAULT_SEGMENT_SIZE, FRAME_HEADER_LEN};
use crate::common::frame::{decode_header, encode_header, frame_len};
use crate::queue::FrameQueue;

/// A FIFO of frames that grows by whole segments instead of failing.
///
/// # Layout
/// ```text
///   front                                         back
/// ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
/// │░░░░░░[frames │ → │   frames     │ → │ frames]      │
/// └──────────────┘   └──────────────┘   └──────────────┘
///        ↑ read_pos                            ↑ write_pos
/// ```
///
/// Frames (header included) may span segment boundaries. A segment is
/// retired as soon as reading moves past its end; one retired segment is kept
/// as spare so a steady producer/consumer pair does not reallocate.
///
/// Memory is purely resident. Nothing here ever touches disk.
pub struct GrowableQueue {
    segments: VecDeque<Box<[u8]>>,
    spare: Option<Box<[u8]>>,
    segment_size: usize,
    /// Offset into the front segment.
    read_pos: usize,
    /// Offset into the back segment.
    write_pos: usize,
    used: usize,
    frames: usize,
}

impl GrowableQueue {
    /// Create an empty queue with the default segment size.
    pub fn new() -> Self {
        Self::with_segment_size(DEFAULT_SEGMENT_SIZE)
    }

    /// Create an empty queue with `segment_size`-byte segments.
    ///
    /// # Panics
    /// Panics if `segment_size` is 0.
    pub fn with_segment_size(segment_size: usize) -> Self {
        assert!(segment_size > 0, "segment_size must be > 0");
        Self {
            segments: VecDeque::new(),
            spare: None,
            segment_size,
            read_pos: 0,
            write_pos: 0,
            used: 0,
            frames: 0,
        }
    }

    #[inline]
    pub fn segment_size(&self) -> usize {
        self.segment_size
    }

    /// Number of allocated, live segments (the spare is not counted).
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Split into a producer and a consumer that may live on different threads.
    ///
    /// Both halves share the queue behind a mutex held only for the copy.
    pub fn split(self) -> (GrowableProducer, GrowableConsumer) {
        let shared = Arc::new(GrowableShared {
            queue: Mutex::new(self),
            eof: AtomicBool::new(false),
        });
        (
            GrowableProducer {
                shared: Arc::clone(&shared),
            },
            GrowableConsumer { shared },
        )
    }

    fn write_bytes(&mut self, mut data: &[u8]) {
        while !data.is_empty() {
            if self.segments.is_empty() || self.write_pos == self.segment_size {
                let segment = self
                    .spare
                    .take()
                    .unwrap_or_else(|| vec![0u8; self.segment_size].into_boxed_slice());
                self.segments.push_back(segment);
                self.write_pos = 0;
            }

            let n = data.len().min(self.segment_size - self.write_pos);
            if let Some(segment) = self.segments.back_mut() {
                segment[self.write_pos..self.write_pos + n].copy_from_slice(&data[..n]);
            }
            self.write_pos += n;
            data = &data[n..];
        }
    }

    fn read_bytes(&mut self, out: &mut [u8]) {
        let mut done = 0;
        while done < out.len() {
            if self.read_pos == self.segment_size {
                self.retire_front();
            }

            let n = (out.len() - done).min(self.segment_size - self.read_pos);
            if let Some(segment) = self.segments.front() {
                out[done..done + n].copy_from_slice(&segment[self.read_pos..self.read_pos + n]);
            }
            self.read_pos += n;
            done += n;
        }
    }

    fn retire_front(&mut self) {
        if let Some(segment) = self.segments.pop_front() {
            if self.spare.is_none() {
                self.spare = Some(segment);
            }
        }
        self.read_pos = 0;
    }
}

impl Default for GrowableQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameQueue for GrowableQueue {
    /// Always succeeds unless the payload cannot be described by a 4-byte
    /// length prefix.
    fn offer(&mut self, payload: &[u8]) -> bool {
        let Ok(header) = encode_header(payload.len()) else {
            return false;
        };
        self.write_bytes(&header);
        self.write_bytes(payload);
        self.used += frame_len(payload.len());
        self.frames += 1;
        true
    }

    fn poll(&mut self, out: &mut Vec<u8>) -> bool {
        if self.frames == 0 {
            return false;
        }

        let mut header = [0u8; FRAME_HEADER_LEN];
        self.read_bytes(&mut header);
        let len = decode_header(header);
        out.clear();
        out.resize(len, 0);
        self.read_bytes(out);

        self.used -= frame_len(len);
        self.frames -= 1;

        if self.frames == 0 {
            // Cursors met: at most one segment is live, restart it from 0
            self.read_pos = 0;
            self.write_pos = 0;
        }
        true
    }

    fn used_bytes(&self) -> usize {
        self.used
    }

    fn frame_count(&self) -> usize {
        self.frames
    }

    fn clear(&mut self) {
        if let Some(segment) = self.segments.pop_front() {
            self.spare.get_or_insert(segment);
        }
        self.segments.clear();
        self.read_pos = 0;
        self.write_pos = 0;
        self.used = 0;
        self.frames = 0;
    }
}

struct GrowableShared {
    queue: Mutex<GrowableQueue>,
    eof: AtomicBool,
}

/// Writing half of a split [`GrowableQueue`].
pub struct GrowableProducer {
    shared: Arc<GrowableShared>,
}

impl GrowableProducer {
    /// See [`FrameQueue::offer`].
    pub fn offer(&mut self, payload: &[u8]) -> bool {
        self.shared.queue.lock().offer(payload)
    }

    /// Signal that no more frames follow.
    pub fn set_eof(&self) {
        self.shared.eof.store(true, Ordering::Release);
    }
}

/// Reading half of a split [`GrowableQueue`].
pub struct GrowableConsumer {
    shared: Arc<GrowableShared>,
}

impl GrowableConsumer {
    /// See [`FrameQueue::poll`].
    pub fn poll(&mut self, out: &mut Vec<u8>) -> bool {
        self.shared.queue.lock().poll(out)
    }

    pub fn is_empty(&self) -> bool {
        self.shared.queue.lock().is_empty()
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.shared.eof.load(Ordering::Acquire)
    }

    /// The producer set EOF and every frame has been polled.
    pub fn is_exhausted(&self) -> bool {
        self.is_eof() && self.is_empty()
    }
}
