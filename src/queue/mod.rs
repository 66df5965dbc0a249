//! In-memory frame queues.
//!
//! Both queues store length-prefixed frames and hand them back in FIFO order.
//! They differ only in what happens when room runs out:
//! - [`RingQueue`] - fixed capacity, `offer` returns `false` when full
//! - [`GrowableQueue`] - chained segments, `offer` always succeeds
//!
//! Each can be split into a producer handle and a consumer handle for use
//! from two threads. Neither handle is `Clone`, so the single-producer /
//! single-consumer contract holds by construction.

mod growable;
mod ring;

pub use growable::{GrowableConsumer, GrowableProducer, GrowableQueue};
pub use ring::{RingConsumer, RingProducer, RingQueue};

/// A FIFO queue of opaque frames.
pub trait FrameQueue {
    /// Append one frame. Returns `false`, writing nothing, if it does not fit.
    fn offer(&mut self, payload: &[u8]) -> bool;

    /// Remove the oldest frame and copy its payload into `out`.
    ///
    /// `out` is cleared first. Returns `false` if the queue is empty.
    fn poll(&mut self, out: &mut Vec<u8>) -> bool;

    /// Bytes held, frame headers included.
    fn used_bytes(&self) -> usize;

    /// Number of frames held.
    fn frame_count(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }

    /// Drop every frame.
    fn clear(&mut self);
}
