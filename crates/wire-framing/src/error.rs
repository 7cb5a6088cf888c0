//! Errors raised while framing or de-framing wire bytes.

use thiserror::Error;

/// Errors common to every byte-framing helper in this crate.
#[derive(Debug, Error)]
pub enum FramingError {
    /// The buffer ended before a length-prefixed value could be read in full.
    #[error("unexpected end of buffer: needed {needed} bytes, had {available}")]
    UnexpectedEof {
        /// Bytes the read required.
        needed: usize,
        /// Bytes actually remaining.
        available: usize,
    },

    /// Bytes claiming to be UTF-16LE did not decode to valid UTF-16.
    #[error("invalid UTF-16LE string data")]
    InvalidUtf16,

    /// Bytes claiming to be UTF-8 did not decode to valid UTF-8.
    #[error("invalid UTF-8 string data: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// A length-encoded integer carried a reserved sentinel value in a
    /// context where one isn't meaningful.
    #[error("invalid length-encoded integer prefix: {0:#x}")]
    InvalidLengthPrefix(u8),

    /// A value's declared length exceeds what the target field can hold.
    #[error("value length {len} exceeds maximum {max}")]
    ValueTooLarge {
        /// Declared length.
        len: usize,
        /// Maximum allowed length.
        max: usize,
    },

    /// A chunk sequence ended with a sentinel the reassembler doesn't
    /// understand, or chunks arrived out of the expected order.
    #[error("malformed chunk sequence: {0}")]
    MalformedChunks(String),
}
