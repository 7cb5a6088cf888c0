//! Errors raised by the PostgreSQL wire engine.

use thiserror::Error;

/// Errors the PostgreSQL engine can raise.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The connection closed before a complete message arrived.
    #[error("connection closed mid-message")]
    ConnectionClosed,

    /// A length-prefixed message announced a size too large to be real.
    #[error("message too large: {0} bytes")]
    MessageTooLarge(usize),

    /// An unrecognized backend message type byte.
    #[error("unknown backend message type: {0:#x} ({0:?})")]
    UnknownMessageType(u8),

    /// An unrecognized `Authentication` sub-code.
    #[error("unsupported authentication method: {0}")]
    UnsupportedAuth(i32),

    /// The server rejected the SCRAM exchange or sent it out of order.
    #[error("SCRAM exchange failed: {0}")]
    Scram(String),

    /// The server's `ErrorResponse` surfaced as a query failure.
    #[error("server error [{code}]: {message}")]
    Server {
        /// SQLSTATE error code.
        code: String,
        /// Human-readable message.
        message: String,
    },

    /// A value's wire bytes didn't match its declared OID's text format.
    #[error("failed to decode OID {oid} value: {reason}")]
    Decoding {
        /// PostgreSQL type OID.
        oid: u32,
        /// What went wrong.
        reason: String,
    },

    /// A query string carried a placeholder with no matching parameter.
    #[error("parameter {0} referenced but not bound")]
    MissingParameter(String),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS negotiation failed.
    #[error("TLS error: {0}")]
    Tls(#[from] sql_tls::TlsError),

    /// Frame decoding failed.
    #[error("framing error: {0}")]
    Framing(#[from] wire_framing::FramingError),
}
