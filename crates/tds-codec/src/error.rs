//! Error type for the packet framing and message reassembly layer.

use tds_protocol::error::ProtocolError;

/// Errors that can occur while framing TDS packets over a byte stream.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// A packet header failed its own internal sanity checks (bad length field).
    #[error("invalid packet header")]
    InvalidHeader,
    /// A packet declared a length outside what this codec will accept.
    #[error("packet too large: {size} bytes exceeds max {max}")]
    PacketTooLarge {
        /// Declared packet size.
        size: usize,
        /// Configured maximum.
        max: usize,
    },
    /// The connection closed mid-message, with a partial message buffered.
    #[error("connection closed with a partial message in flight")]
    ConnectionClosed,
    /// A lower-level packet or token decode failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// The underlying transport returned an I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_stable() {
        assert_eq!(
            CodecError::PacketTooLarge { size: 100, max: 50 }.to_string(),
            "packet too large: 100 bytes exceeds max 50"
        );
        assert_eq!(
            CodecError::ConnectionClosed.to_string(),
            "connection closed with a partial message in flight"
        );
    }
}
