//! Typed records over an overflow buffer.
//!
//! The buffer itself only moves opaque payloads. A [`RecordCodec`] turns a
//! record into a payload and back, and [`TypedRecordBuffer`] pairs the two:
//! - [`RecordCodec`] - Caller-supplied serialization
//! - [`TypedRecordBuffer`] - `write`/`read` in terms of records

use crate::buffer::OverflowRecordBuffer;
use crate::common::Result;

/// Converts records to and from self-contained byte payloads.
///
/// # Example
/// ```
/// use spillqueue::{Error, RecordCodec, Result};
///
/// struct U64Codec;
///
/// impl RecordCodec for U64Codec {
///     type Record = u64;
///
///     fn encode(&self, record: &u64, buf: &mut Vec<u8>) -> Result<()> {
///         buf.extend_from_slice(&record.to_le_bytes());
///         Ok(())
///     }
///
///     fn decode(&self, payload: &[u8]) -> Result<u64> {
///         let bytes: [u8; 8] = payload
///             .try_into()
///             .map_err(|_| Error::Codec(format!("expected 8 bytes, got {}", payload.len())))?;
///         Ok(u64::from_le_bytes(bytes))
///     }
/// }
/// ```
pub trait RecordCodec {
    type Record;

    /// Append the encoding of `record` to `buf`.
    fn encode(&self, record: &Self::Record, buf: &mut Vec<u8>) -> Result<()>;

    /// Decode one record from a payload produced by `encode`.
    fn decode(&self, payload: &[u8]) -> Result<Self::Record>;
}

/// An [`OverflowRecordBuffer`] that reads and writes records through a codec.
pub struct TypedRecordBuffer<C: RecordCodec> {
    buffer: OverflowRecordBuffer,
    codec: C,
}

impl<C: RecordCodec> TypedRecordBuffer<C> {
    pub fn new(buffer: OverflowRecordBuffer, codec: C) -> Self {
        Self { buffer, codec }
    }

    /// Encode `record` and append it.
    pub fn write(&self, record: &C::Record) -> Result<()> {
        let mut payload = Vec::new();
        self.codec.encode(record, &mut payload)?;
        self.buffer.write_record(&payload)
    }

    /// Remove and decode the oldest record.
    ///
    /// `Ok(None)` has the same meaning as in
    /// [`OverflowRecordBuffer::read_record`].
    pub fn read(&self) -> Result<Option<C::Record>> {
        match self.buffer.read_record()? {
            Some(payload) => self.codec.decode(&payload).map(Some),
            None => Ok(None),
        }
    }

    /// The underlying buffer, for EOF, reset, close and state queries.
    #[inline]
    pub fn buffer(&self) -> &OverflowRecordBuffer {
        &self.buffer
    }

    pub fn into_inner(self) -> OverflowRecordBuffer {
        self.buffer
    }
}
