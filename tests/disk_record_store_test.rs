//! Spill store tests against a real temp directory.

use proptest::prelude::*;
use spillqueue::{BufferConfig, DiskRecordStore, Error};
use tempfile::tempdir;

fn store_in(dir: &std::path::Path, write_buffer: usize) -> DiskRecordStore {
    let config = BufferConfig::default()
        .with_spill_dir(dir)
        .with_write_buffer_size(write_buffer);
    DiskRecordStore::with_config(&config)
}

fn drain(store: &mut DiskRecordStore) -> Vec<Vec<u8>> {
    let mut frames = Vec::new();
    let mut out = Vec::new();
    while store.shift(&mut out).unwrap() {
        frames.push(out.clone());
    }
    frames
}

#[test]
fn test_large_frames_cross_the_read_window() {
    let dir = tempdir().unwrap();
    let mut store = store_in(dir.path(), 128);

    let frames: Vec<Vec<u8>> = (0..50u32)
        .map(|i| vec![(i % 251) as u8; (i as usize * 97) % 3_000])
        .collect();
    for frame in &frames {
        store.push(frame).unwrap();
    }

    assert_eq!(drain(&mut store), frames);
    assert_eq!(store.read_offset(), store.write_offset());
}

#[test]
fn test_clear_truncates_file_and_restarts_offsets() {
    let dir = tempdir().unwrap();
    let mut store = store_in(dir.path(), 16);

    for i in 0..100u32 {
        store.push(&i.to_le_bytes()).unwrap();
    }
    let path = store.path().unwrap().to_path_buf();
    assert!(std::fs::metadata(&path).unwrap().len() > 0);

    store.clear().unwrap();
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    assert_eq!(store.write_offset(), 0);
    assert_eq!(store.read_offset(), 0);

    store.push(b"after").unwrap();
    store.flush().unwrap();
    assert_eq!(store.path(), Some(path.as_path()));
    assert_eq!(drain(&mut store), vec![b"after".to_vec()]);
}

#[test]
fn test_close_deletes_file_and_rejects_use() {
    let dir = tempdir().unwrap();
    let mut store = store_in(dir.path(), 16);
    for i in 0..10u32 {
        store.push(&i.to_le_bytes()).unwrap();
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

    store.close().unwrap();
    store.close().unwrap();
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

    let mut out = Vec::new();
    assert!(matches!(store.push(b"x"), Err(Error::Closed)));
    assert!(matches!(store.shift(&mut out), Err(Error::Closed)));
    assert!(matches!(store.rewind(), Err(Error::Closed)));
    assert!(matches!(store.clear(), Err(Error::Closed)));
}

#[test]
fn test_drop_deletes_file() {
    let dir = tempdir().unwrap();
    {
        let mut store = store_in(dir.path(), 8);
        store.push(b"temporary").unwrap();
        assert!(store.path().is_some());
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

/// Pushes that cannot reach the file are refused whole; frames accepted
/// before them stay readable and the counts match what was accepted.
#[test]
fn test_unwritable_dir_refuses_frames_whole() {
    let dir = tempdir().unwrap();
    let mut store = store_in(&dir.path().join("gone"), 24);

    let mut accepted = Vec::new();
    for i in 0..6u32 {
        let frame = i.to_le_bytes();
        match store.push(&frame) {
            Ok(()) => accepted.push(frame.to_vec()),
            Err(e) => assert!(matches!(e, Error::Io(_))),
        }
        assert_eq!(store.len_frames(), accepted.len() as u64);
        assert_eq!(store.write_offset(), 8 * accepted.len() as u64);
    }
    assert_eq!(accepted.len(), 2);
    assert!(store.path().is_none());
    assert!(store.create_file().is_err());

    assert_eq!(drain(&mut store), accepted);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Rewinding at any point replays every frame from the start, whatever
    /// mix of file and write buffer they live in.
    #[test]
    fn prop_rewind_replays_everything(
        frames in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..300), 0..80),
        write_buffer in 1usize..512,
        read_before_rewind in 0usize..80,
    ) {
        let dir = tempdir().unwrap();
        let mut store = store_in(dir.path(), write_buffer);
        for frame in &frames {
            store.push(frame).unwrap();
        }

        let mut out = Vec::new();
        for expected in frames.iter().take(read_before_rewind) {
            prop_assert!(store.shift(&mut out).unwrap());
            prop_assert_eq!(&out, expected);
        }

        store.rewind().unwrap();
        prop_assert_eq!(store.remaining_frames(), frames.len() as u64);
        prop_assert_eq!(drain(&mut store), frames.clone());

        store.rewind().unwrap();
        prop_assert_eq!(drain(&mut store), frames);
    }
}
