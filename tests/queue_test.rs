//! Frame queue tests.
//!
//! Single-threaded capacity checks plus the producer/consumer workloads the
//! queues are built for: fixed-size integer frames and frames that grow and
//! shrink between 2 bytes and 16KB. Consumers stop on the producer's EOF,
//! not on a known frame count.

use spillqueue::queue::{FrameQueue, GrowableQueue, RingQueue};
use std::thread;

const NUM_REC: u32 = 50_000;

fn int_frame(v: u32) -> [u8; 4] {
    v.to_be_bytes()
}

/// Sizes 2, 4, 8, ... up past 10000, then back down, repeating.
fn size_sequence(count: usize) -> Vec<usize> {
    let mut sizes = Vec::with_capacity(count);
    let mut size = 1usize;
    let mut grow = true;
    for _ in 0..count {
        if size > 10_000 {
            grow = false;
        }
        if size < 1 {
            size = 1;
            grow = true;
        }
        if grow {
            size *= 2;
        } else {
            size /= 2;
        }
        sizes.push(size);
    }
    sizes
}

fn patterned(size: usize) -> Vec<u8> {
    (0..size).map(|j| (j % 127) as u8).collect()
}

// ============================================================================
// RingQueue: capacity
// ============================================================================

/// Eleven 4-byte frames exactly fill an 88-byte ring; one poll frees room.
#[test]
fn test_eleven_frames_fill_ring() {
    let mut queue = RingQueue::new(88);
    for i in 0..11 {
        assert!(queue.offer(&int_frame(i)));
    }
    assert!(!queue.offer(&int_frame(11)));

    let mut out = Vec::new();
    assert!(queue.poll(&mut out));
    assert_eq!(out, int_frame(0));
    assert!(queue.offer(&int_frame(11)));
}

/// A 100-byte ring takes twelve 8-byte frames; the thirteenth is refused.
#[test]
fn test_offer_full_queue() {
    let mut queue = RingQueue::new(100);
    for i in 0..12 {
        assert!(queue.offer(&int_frame(i)));
    }
    assert!(!queue.offer(&int_frame(20)));
    assert_eq!(queue.frame_count(), 12);

    let mut out = Vec::new();
    assert!(queue.poll(&mut out));
    assert!(queue.offer(&int_frame(20)));
}

/// Fill and drain eleven frames per round, many rounds, one thread.
#[test]
fn test_single_thread_rounds() {
    let mut queue = RingQueue::new(100);
    let mut out = Vec::new();

    for j in 0..NUM_REC {
        for i in 0..11u32 {
            assert!(queue.offer(&int_frame(i.wrapping_mul(j))));
        }
        for i in 0..11u32 {
            assert!(queue.poll(&mut out));
            assert_eq!(out.len(), 4);
            assert_eq!(out, int_frame(i.wrapping_mul(j)));
        }
    }
    assert!(!queue.poll(&mut out));
    assert!(!queue.poll(&mut out));
}

// ============================================================================
// RingQueue: producer/consumer threads
// ============================================================================

#[test]
fn test_multi_thread_int_frames() {
    let (mut producer, mut consumer) = RingQueue::new(100).split();

    let writer = thread::spawn(move || {
        for i in 0..NUM_REC {
            while !producer.offer(&int_frame(i)) {
                std::hint::spin_loop();
            }
        }
        producer.set_eof();
    });

    let reader = thread::spawn(move || {
        let mut out = Vec::new();
        let mut count = 0;
        loop {
            if consumer.poll(&mut out) {
                assert_eq!(out, int_frame(count));
                count += 1;
            } else if consumer.is_exhausted() {
                break;
            } else {
                std::hint::spin_loop();
            }
        }
        count
    });

    writer.join().unwrap();
    assert_eq!(reader.join().unwrap(), NUM_REC);
}

#[test]
fn test_multi_thread_growing_frames() {
    let sizes = size_sequence(NUM_REC as usize);
    let expected = sizes.clone();
    let (mut producer, mut consumer) = RingQueue::new(100_000).split();

    let writer = thread::spawn(move || {
        for size in sizes {
            let payload = patterned(size);
            while !producer.offer(&payload) {
                thread::yield_now();
            }
        }
        producer.set_eof();
    });

    let reader = thread::spawn(move || {
        let mut out = Vec::new();
        let mut sizes = Vec::new();
        loop {
            if consumer.poll(&mut out) {
                assert_eq!(out, patterned(out.len()));
                sizes.push(out.len());
            } else if consumer.is_exhausted() {
                break;
            } else {
                thread::yield_now();
            }
        }
        sizes
    });

    writer.join().unwrap();
    assert_eq!(reader.join().unwrap(), expected);
}

// ============================================================================
// GrowableQueue
// ============================================================================

#[test]
fn test_growable_takes_what_ring_refuses() {
    let mut ring = RingQueue::new(100);
    let mut growable = GrowableQueue::with_segment_size(100);

    let mut ring_accepted = 0;
    for i in 0..1_000 {
        if ring.offer(&int_frame(i)) {
            ring_accepted += 1;
        }
        assert!(growable.offer(&int_frame(i)));
    }
    assert_eq!(ring_accepted, 12);
    assert_eq!(growable.frame_count(), 1_000);

    let mut out = Vec::new();
    for i in 0..1_000 {
        assert!(growable.poll(&mut out));
        assert_eq!(out, int_frame(i));
    }
    assert!(growable.segment_count() <= 1);
}

#[test]
fn test_growable_multi_thread_growing_frames() {
    let sizes = size_sequence(5_000);
    let expected = sizes.clone();
    let (mut producer, mut consumer) = GrowableQueue::with_segment_size(4_096).split();

    let writer = thread::spawn(move || {
        for size in sizes {
            assert!(producer.offer(&patterned(size)));
        }
        producer.set_eof();
    });

    let reader = thread::spawn(move || {
        let mut out = Vec::new();
        let mut sizes = Vec::new();
        loop {
            if consumer.poll(&mut out) {
                assert_eq!(out, patterned(out.len()));
                sizes.push(out.len());
            } else if consumer.is_exhausted() {
                break;
            } else {
                thread::yield_now();
            }
        }
        sizes
    });

    writer.join().unwrap();
    assert_eq!(reader.join().unwrap(), expected);
}

/// Both queues behave the same through the trait.
#[test]
fn test_queues_through_trait_object() {
    let mut queues: Vec<Box<dyn FrameQueue>> = vec![
        Box::new(RingQueue::new(256)),
        Box::new(GrowableQueue::with_segment_size(16)),
    ];

    for queue in queues.iter_mut() {
        for i in 0..10 {
            assert!(queue.offer(&patterned(i * 2)));
        }
        assert_eq!(queue.frame_count(), 10);
        assert_eq!(queue.used_bytes(), (0..10).map(|i| 4 + i * 2).sum::<usize>());

        let mut out = Vec::new();
        for i in 0..10 {
            assert!(queue.poll(&mut out));
            assert_eq!(out, patterned(i * 2));
        }
        assert!(queue.is_empty());

        queue.offer(b"leftover");
        queue.clear();
        assert!(!queue.poll(&mut out));
    }
}
