//! Frame codec - the length-prefix convention shared by all stores.
//!
//! ```text
//! ┌──────────────────────┬──────────────────────────┐
//! │ len: u32 (LE, 4 B)   │ payload (len bytes)      │
//! └──────────────────────┴──────────────────────────┘
//! ```

use std::io::{self, Read, Write};

use crate::common::config::{FRAME_HEADER_LEN, MAX_FRAME_PAYLOAD};
use crate::common::{Error, Result};

/// Encode the length prefix for a payload of `len` bytes.
///
/// # Errors
/// Returns `Error::FrameTooLarge` if `len` does not fit in a `u32`.
#[inline]
pub fn encode_header(len: usize) -> Result<[u8; FRAME_HEADER_LEN]> {
    let len = u32::try_from(len).map_err(|_| Error::FrameTooLarge {
        len,
        max: MAX_FRAME_PAYLOAD,
    })?;
    Ok(len.to_le_bytes())
}

/// Decode a length prefix.
#[inline]
pub fn decode_header(header: [u8; FRAME_HEADER_LEN]) -> usize {
    u32::from_le_bytes(header) as usize
}

/// Total bytes a payload occupies once framed.
#[inline]
pub fn frame_len(payload_len: usize) -> usize {
    FRAME_HEADER_LEN + payload_len
}

/// Write one frame to `writer`.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<()> {
    let header = encode_header(payload.len())?;
    writer.write_all(&header)?;
    writer.write_all(payload)?;
    Ok(())
}

/// Read one frame from `reader` into `out`, replacing its contents.
///
/// Returns `Ok(false)` on a clean end of stream (no header bytes at all).
///
/// # Errors
/// A stream that ends inside a header or payload is reported as
/// `Error::CorruptFrame`, with `offset` relative to the start of the frame.
pub fn read_frame<R: Read>(reader: &mut R, out: &mut Vec<u8>) -> Result<bool> {
    let mut header = [0u8; FRAME_HEADER_LEN];
    let mut filled = 0;
    while filled < FRAME_HEADER_LEN {
        match reader.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(Error::CorruptFrame {
                    offset: 0,
                    declared: FRAME_HEADER_LEN as u64,
                    available: filled as u64,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }

    let len = decode_header(header);
    out.clear();
    let read = reader.take(len as u64).read_to_end(out)?;
    if read < len {
        return Err(Error::CorruptFrame {
            offset: 0,
            declared: len as u64,
            available: read as u64,
        });
    }
    Ok(true)
}
