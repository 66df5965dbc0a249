//! DiskRecordStore - file-backed sequence of frames.
//!
//! The [`DiskRecordStore`] handles all spill file operations:
//! - Appending frames (`push`)
//! - Draining frames in order (`shift`)
//! - Re-reading from the start (`rewind`)
//! - Discarding everything while keeping the file (`clear`)

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::common::config::{BufferConfig, DEFAULT_WRITE_BUFFER, FRAME_HEADER_LEN};
use crate::common::frame::{decode_header, frame_len, write_frame};
use crate::common::{Error, Result};

/// An append-only store of frames in a temporary file.
///
/// # File Layout
/// Frames are laid out back to back, exactly as in the in-memory queues:
/// ```text
/// ┌─────┬──────────┬─────┬──────────┬─────┬───
/// │ len │ payload  │ len │ payload  │ len │ ...
/// └─────┴──────────┴─────┴──────────┴─────┴───
/// 0                ↑ read_offset              ↑ write_offset
/// ```
///
/// Appended frames are batched in a write buffer and reach the file once the
/// buffer fills. The buffer only ever holds whole frames, so a frame is
/// either entirely on disk or entirely buffered; `shift` reads buffered
/// frames straight from memory. Sequential reads from the file go through a
/// read-ahead window of the same size.
///
/// The file is created on the first flush and deleted on `close()` (or
/// drop). Its path is not stable across runs.
///
/// # Invariants
/// - `read_offset <= write_offset`
/// - `rewind` moves only `read_offset`; `clear` resets both to 0
///
/// # Thread Safety
/// `DiskRecordStore` is **single-threaded**. The overflow buffer serializes
/// access to it.
pub struct DiskRecordStore {
    /// Directory for the spill file. `None` means the OS temp directory.
    dir: Option<PathBuf>,
    file: Option<NamedTempFile>,
    /// Bytes of `file` holding frames.
    flushed_offset: u64,
    /// Frames appended after `flushed_offset`, not yet written.
    write_buf: Vec<u8>,
    write_buffer_size: usize,
    /// File bytes cached for sequential reads, starting at `window_start`.
    read_window: Vec<u8>,
    window_start: u64,
    read_offset: u64,
    /// Frames appended since the last clear.
    frames: u64,
    /// Frames shifted since the last rewind or clear.
    frames_read: u64,
    closed: bool,
}

impl DiskRecordStore {
    /// Create an empty store spilling into the OS temp directory.
    pub fn new() -> Self {
        Self::build(None, DEFAULT_WRITE_BUFFER)
    }

    /// Create an empty store spilling into `dir`.
    pub fn create_in<P: AsRef<Path>>(dir: P) -> Self {
        Self::build(Some(dir.as_ref().to_path_buf()), DEFAULT_WRITE_BUFFER)
    }

    /// Create an empty store using the spill settings of `config`.
    pub fn with_config(config: &BufferConfig) -> Self {
        Self::build(config.spill_dir.clone(), config.write_buffer_size)
    }

    fn build(dir: Option<PathBuf>, write_buffer_size: usize) -> Self {
        Self {
            dir,
            file: None,
            flushed_offset: 0,
            write_buf: Vec::new(),
            write_buffer_size,
            read_window: Vec::new(),
            window_start: 0,
            read_offset: 0,
            frames: 0,
            frames_read: 0,
            closed: false,
        }
    }

    // ========================================================================
    // Public API: Append and drain
    // ========================================================================

    /// Append one frame at the write offset.
    ///
    /// Either the frame is stored and `Ok` returned, or nothing changes: a
    /// failed flush takes the frame back out of the write buffer.
    ///
    /// # Errors
    /// - `Error::Closed` after `close()`
    /// - `Error::FrameTooLarge` if the payload exceeds a 4-byte prefix
    /// - I/O errors when the write buffer is flushed to the file
    pub fn push(&mut self, payload: &[u8]) -> Result<()> {
        self.ensure_open()?;
        let mark = self.write_buf.len();
        if let Err(e) = write_frame(&mut self.write_buf, payload) {
            self.write_buf.truncate(mark);
            return Err(e);
        }

        if self.write_buf.len() >= self.write_buffer_size {
            if let Err(e) = self.flush() {
                self.write_buf.truncate(mark);
                return Err(e);
            }
        }
        self.frames += 1;
        Ok(())
    }

    /// Read the frame at the read offset into `out` and advance past it.
    ///
    /// Returns `Ok(false)`, without moving, when every frame has been read.
    ///
    /// # Errors
    /// - `Error::Closed` after `close()`
    /// - `Error::CorruptFrame` if a length prefix runs past the stored data
    /// - I/O errors from reading the file
    pub fn shift(&mut self, out: &mut Vec<u8>) -> Result<bool> {
        self.ensure_open()?;

        let start = self.read_offset;
        if start == self.write_offset() {
            return Ok(false);
        }

        let len = if start >= self.flushed_offset {
            self.shift_buffered(start, out)?
        } else {
            self.shift_from_file(start, out)?
        };

        self.read_offset += frame_len(len) as u64;
        self.frames_read += 1;
        Ok(true)
    }

    /// Move the read offset back to the first frame.
    ///
    /// Subsequent `shift` calls deliver the same frames in the same order.
    pub fn rewind(&mut self) -> Result<()> {
        self.ensure_open()?;
        tracing::trace!(frames = self.frames, "rewinding spill store");
        self.read_offset = 0;
        self.frames_read = 0;
        Ok(())
    }

    /// Discard every frame and reset both offsets, keeping the file.
    pub fn clear(&mut self) -> Result<()> {
        self.ensure_open()?;
        if let Some(file) = self.file.as_mut() {
            file.as_file_mut().set_len(0)?;
        }
        tracing::debug!(frames = self.frames, "cleared spill store");

        self.write_buf.clear();
        self.read_window.clear();
        self.window_start = 0;
        self.flushed_offset = 0;
        self.read_offset = 0;
        self.frames = 0;
        self.frames_read = 0;
        Ok(())
    }

    /// Create the spill file now instead of on the first flush.
    ///
    /// Lets a caller find out that the spill directory is unusable before
    /// it hands over any frames. A no-op once the file exists.
    pub fn create_file(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.file_mut().map(|_| ())
    }

    /// Write buffered frames to the file, creating it on first use.
    pub fn flush(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.write_buf.is_empty() {
            return Ok(());
        }

        let offset = self.flushed_offset;
        let pending = std::mem::take(&mut self.write_buf);
        let written = self.write_at(offset, &pending);
        self.write_buf = pending;
        written?;

        self.flushed_offset += self.write_buf.len() as u64;
        self.write_buf.clear();
        Ok(())
    }

    /// Release the file and delete it. Idempotent.
    ///
    /// Every other operation fails with `Error::Closed` afterwards.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.write_buf = Vec::new();
        self.read_window = Vec::new();

        if let Some(file) = self.file.take() {
            file.close()?;
        }
        Ok(())
    }

    // ========================================================================
    // Public API: Accessors
    // ========================================================================

    /// Byte offset one past the last appended frame.
    #[inline]
    pub fn write_offset(&self) -> u64 {
        self.flushed_offset + self.write_buf.len() as u64
    }

    /// Byte offset of the next frame `shift` returns.
    #[inline]
    pub fn read_offset(&self) -> u64 {
        self.read_offset
    }

    /// Frames appended since the last clear.
    #[inline]
    pub fn len_frames(&self) -> u64 {
        self.frames
    }

    /// Frames not yet shifted since the last rewind.
    #[inline]
    pub fn remaining_frames(&self) -> u64 {
        self.frames - self.frames_read
    }

    #[inline]
    pub fn has_remaining(&self) -> bool {
        self.read_offset < self.write_offset()
    }

    /// Path of the spill file, if one has been created.
    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(NamedTempFile::path)
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    // ========================================================================
    // Internal
    // ========================================================================

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }

    fn file_mut(&mut self) -> Result<&mut File> {
        if self.file.is_none() {
            let mut builder = tempfile::Builder::new();
            builder.prefix("spill-").suffix(".frames");
            let file = match &self.dir {
                Some(dir) => builder.tempfile_in(dir)?,
                None => builder.tempfile()?,
            };
            tracing::debug!(path = %file.path().display(), "created spill file");
            self.file = Some(file);
        }
        match self.file.as_mut() {
            Some(file) => Ok(file.as_file_mut()),
            None => Err(Error::Closed),
        }
    }

    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        let file = self.file_mut()?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(bytes)?;
        Ok(())
    }

    /// Copy the frame at `start` out of the write buffer.
    fn shift_buffered(&self, start: u64, out: &mut Vec<u8>) -> Result<usize> {
        let at = (start - self.flushed_offset) as usize;
        let (len, payload) = split_frame(&self.write_buf[at..], start)?;
        out.clear();
        out.extend_from_slice(payload);
        Ok(len)
    }

    /// Copy the frame at `start` out of the file, through the read window.
    fn shift_from_file(&mut self, start: u64, out: &mut Vec<u8>) -> Result<usize> {
        if !self.window_covers(start, FRAME_HEADER_LEN) {
            self.fill_window(start, self.write_buffer_size.max(FRAME_HEADER_LEN))?;
        }
        if !self.window_covers(start, FRAME_HEADER_LEN) {
            return Err(Error::CorruptFrame {
                offset: start,
                declared: FRAME_HEADER_LEN as u64,
                available: self.flushed_offset - start,
            });
        }
        let at = (start - self.window_start) as usize;
        let mut header = [0u8; FRAME_HEADER_LEN];
        header.copy_from_slice(&self.read_window[at..at + FRAME_HEADER_LEN]);
        let needed = frame_len(decode_header(header));

        if !self.window_covers(start, needed) {
            self.fill_window(start, needed)?;
        }
        let at = (start - self.window_start) as usize;
        let (len, payload) = split_frame(&self.read_window[at..], start)?;
        out.clear();
        out.extend_from_slice(payload);
        Ok(len)
    }

    fn window_covers(&self, start: u64, len: usize) -> bool {
        start >= self.window_start
            && start + len as u64 <= self.window_start + self.read_window.len() as u64
    }

    /// Load up to `len` file bytes from `start` into the read window.
    ///
    /// Never reads past `flushed_offset`; a short window is caught as a
    /// corrupt frame by the caller.
    fn fill_window(&mut self, start: u64, len: usize) -> Result<()> {
        let len = len.min((self.flushed_offset - start) as usize);
        let mut window = std::mem::take(&mut self.read_window);
        window.resize(len, 0);

        let file = self.file_mut()?;
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(&mut window)?;

        self.read_window = window;
        self.window_start = start;
        Ok(())
    }
}

impl Default for DiskRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DiskRecordStore {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let path = file.path().to_path_buf();
            if let Err(e) = file.close() {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove spill file");
            }
        }
    }
}

/// Split a frame off the front of `bytes`, which starts at file offset `offset`.
fn split_frame(bytes: &[u8], offset: u64) -> Result<(usize, &[u8])> {
    if bytes.len() < FRAME_HEADER_LEN {
        return Err(Error::CorruptFrame {
            offset,
            declared: FRAME_HEADER_LEN as u64,
            available: bytes.len() as u64,
        });
    }
    let mut header = [0u8; FRAME_HEADER_LEN];
    header.copy_from_slice(&bytes[..FRAME_HEADER_LEN]);
    let len = decode_header(header);

    let body = &bytes[FRAME_HEADER_LEN..];
    if body.len() < len {
        return Err(Error::CorruptFrame {
            offset,
            declared: len as u64,
            available: body.len() as u64,
        });
    }
    Ok((len, &body[..len]))
}
