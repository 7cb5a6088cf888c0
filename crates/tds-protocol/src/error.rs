//! Error type for TDS packet, token, and value decoding failures.

use crate::prelude::String;

/// Errors that can occur while parsing or building TDS wire structures.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A packet or token was shorter than its declared/required length.
    #[error("incomplete packet: expected {expected} bytes, got {actual}")]
    IncompletePacket {
        /// Bytes required to finish decoding.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },
    /// Ran out of bytes mid-field with no more specific context available.
    #[error("unexpected end of buffer")]
    UnexpectedEof,
    /// A value was truncated relative to its declared width.
    #[error("value truncated")]
    Truncated,
    /// An enum-like byte field held a value with no matching variant.
    #[error("invalid field {field}: {value}")]
    InvalidField {
        /// Name of the field that failed to parse.
        field: &'static str,
        /// The raw value that did not match any known variant.
        value: u32,
    },
    /// An unrecognized TDS packet type byte.
    #[error("invalid packet type: 0x{0:02x}")]
    InvalidPacketType(u8),
    /// An unrecognized packet status byte.
    #[error("invalid packet status: 0x{0:02x}")]
    InvalidPacketStatus(u8),
    /// An unrecognized PRELOGIN option token.
    #[error("invalid prelogin option: 0x{0:02x}")]
    InvalidPreloginOption(u8),
    /// An unrecognized result-stream token type byte.
    #[error("invalid token type: 0x{0:02x}")]
    InvalidTokenType(u8),
    /// A TDS column type byte this crate does not recognize at all.
    #[error("unknown column type: 0x{0:02x}")]
    UnknownType(u8),
    /// A recognized but unimplemented wire representation (unusual length,
    /// CLR/variant/TVP types, etc).
    #[error("unsupported type representation: {0}")]
    UnsupportedType(String),
    /// A string field's bytes were not valid UTF-16 or UTF-8.
    #[error("string encoding error: {0}")]
    StringEncoding(String),
    /// A generic decode failure bubbled up from a lower-level helper
    /// (`wire-framing` chunk reassembly, collation lookup, etc).
    #[error("decoding error: {0}")]
    Decoding(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_stable() {
        assert_eq!(
            ProtocolError::InvalidPacketType(0x09).to_string(),
            "invalid packet type: 0x09"
        );
        assert_eq!(
            ProtocolError::IncompletePacket {
                expected: 8,
                actual: 3
            }
            .to_string(),
            "incomplete packet: expected 8 bytes, got 3"
        );
    }
}
