//! Error types for spillqueue.

use thiserror::Error;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All faults a buffer or store can report.
///
/// A full queue and an empty queue are not errors. They are reported as
/// `false` / `None` so the caller can retry or spill.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the spill file.
    ///
    /// Fatal for the buffer instance: frames may not have been persisted.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation on a buffer or store after `close()`.
    #[error("buffer is closed")]
    Closed,

    /// Operation on a buffer after an earlier I/O error left it unusable.
    ///
    /// Frames may be missing from the stream, so the buffer refuses further
    /// reads and writes until it is closed.
    #[error("buffer failed on an earlier I/O error")]
    Poisoned,

    /// A length prefix points past the end of the stored data.
    #[error("corrupt frame at offset {offset}: declares {declared} bytes, {available} available")]
    CorruptFrame {
        offset: u64,
        declared: u64,
        available: u64,
    },

    /// Payload is longer than a 4-byte length prefix can describe.
    #[error("frame of {len} bytes exceeds maximum of {max}")]
    FrameTooLarge { len: usize, max: usize },

    /// Rejected buffer configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A record codec could not decode a payload.
    #[error("codec error: {0}")]
    Codec(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::CorruptFrame {
            offset: 16,
            declared: 100,
            available: 8,
        };
        assert_eq!(
            format!("{}", err),
            "corrupt frame at offset 16: declares 100 bytes, 8 available"
        );

        assert_eq!(format!("{}", Error::Closed), "buffer is closed");
        assert_eq!(
            format!("{}", Error::Poisoned),
            "buffer failed on an earlier I/O error"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => {} // Success
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_io_error_has_source() {
        use std::error::Error as _;

        let err: Error = std::io::Error::other("disk gone").into();
        assert!(err.source().is_some());
        assert!(Error::Closed.source().is_none());
    }
}
