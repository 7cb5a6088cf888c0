//! Errors raised by the MySQL/MariaDB wire engine.

use thiserror::Error;

/// Errors the MySQL engine can raise.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The connection closed before a complete packet arrived.
    #[error("connection closed mid-packet")]
    ConnectionClosed,

    /// A length-prefixed packet announced a size too large to be real.
    #[error("packet too large: {0} bytes")]
    PacketTooLarge(usize),

    /// Packet sequence numbers arrived out of order.
    #[error("sequence mismatch: expected {expected}, got {actual}")]
    SequenceMismatch {
        /// Sequence number this side expected.
        expected: u8,
        /// Sequence number actually received.
        actual: u8,
    },

    /// The server's `ERR_Packet` surfaced as a query failure.
    #[error("server error {code}: {message}")]
    Server {
        /// MySQL error code.
        code: u16,
        /// SQLSTATE, when the server sent one.
        sql_state: Option<String>,
        /// Human-readable message.
        message: String,
    },

    /// The server requested an authentication plugin this engine doesn't
    /// implement (e.g. `sha256_password`'s RSA full-auth path).
    #[error("unsupported authentication plugin: {0}")]
    UnsupportedAuthPlugin(String),

    /// `caching_sha2_password` requested full authentication but the
    /// connection isn't encrypted and RSA exchange isn't implemented.
    #[error("caching_sha2_password full authentication requires TLS")]
    FullAuthRequiresTls,

    /// A value's wire bytes didn't match its declared column type's text
    /// format.
    #[error("failed to decode column type {column_type:#x}: {reason}")]
    Decoding {
        /// MySQL column type byte.
        column_type: u8,
        /// What went wrong.
        reason: String,
    },

    /// A query string carried a `?` placeholder with no matching parameter.
    #[error("parameter index {0} out of range")]
    MissingParameter(usize),

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
