//! The closed error taxonomy shared by every engine.

use std::sync::Arc;

use thiserror::Error;

use crate::config::Engine;

/// Errors a [`crate::SqlConnection`] or [`crate::pool`] operation can raise.
#[derive(Debug, Error)]
pub enum Error {
    /// A server-reported failure. Never fatal to the connection by itself —
    /// the engine drains the response stream to its terminal token before
    /// surfacing this, so the connection remains reusable.
    #[error("server error {code}: {message}")]
    ServerError {
        /// Native error code (TDS error number, MySQL error code). `0` when
        /// the engine reports none with this error.
        code: i64,
        /// SQLSTATE, when the server sent one (PostgreSQL always does;
        /// TDS and MySQL usually don't for arbitrary errors).
        sqlstate: Option<String>,
        /// Human-readable message text.
        message: String,
    },

    /// TCP, DNS, or unexpected EOF. The connection is poisoned and closed.
    #[error("connection error: {0}")]
    ConnectionError(String),

    /// TLS handshake failure or policy violation (`require` but unavailable).
    #[error("TLS error: {0}")]
    TlsError(String),

    /// Credentials rejected, or the negotiated mechanism is unsupported.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The server sent a frame the engine couldn't parse, or an
    /// out-of-order message. Fatal to the connection.
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// A decoded value didn't match the caller's requested type. Local
    /// only — never surfaces a server round-trip.
    #[error("type mismatch: {0}")]
    TypeMismatch(#[from] sql_core::error::TypeError),

    /// A strict column lookup found no match. Non-strict lookups return
    /// null instead of this error.
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// The operation was attempted on a closed connection or pool.
    #[error("connection closed")]
    ConnectionClosed,

    /// A feature path this core deliberately doesn't implement (e.g.
    /// `caching_sha2_password`'s full RSA handshake without TLS).
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// A deadline elapsed waiting for a connection phase or a response.
    #[error("timed out")]
    Timeout,

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Underlying I/O failure (wrapped in `Arc` so `Error` stays `Clone`-able
    /// where callers need to fan the same failure out to several waiters).
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(Arc::new(e))
    }
}

impl From<sql_tls::TlsError> for Error {
    fn from(e: sql_tls::TlsError) -> Self {
        Error::TlsError(e.to_string())
    }
}

impl From<sql_auth::AuthError> for Error {
    fn from(e: sql_auth::AuthError) -> Self {
        Error::AuthenticationFailed(e.to_string())
    }
}

impl From<tds_protocol::ProtocolError> for Error {
    fn from(e: tds_protocol::ProtocolError) -> Self {
        Error::ProtocolError(e.to_string())
    }
}

impl From<tds_codec::CodecError> for Error {
    fn from(e: tds_codec::CodecError) -> Self {
        Error::ProtocolError(e.to_string())
    }
}

impl From<pg_protocol::ProtocolError> for Error {
    fn from(e: pg_protocol::ProtocolError) -> Self {
        match e {
            pg_protocol::ProtocolError::Server { code, message } => Error::ServerError {
                code: 0,
                sqlstate: Some(code),
                message,
            },
            pg_protocol::ProtocolError::Tls(inner) => Error::TlsError(inner.to_string()),
            pg_protocol::ProtocolError::Io(inner) => Error::Io(Arc::new(inner)),
            other => Error::ProtocolError(other.to_string()),
        }
    }
}

impl From<mysql_protocol::ProtocolError> for Error {
    fn from(e: mysql_protocol::ProtocolError) -> Self {
        match e {
            mysql_protocol::ProtocolError::Server {
                code,
                sql_state,
                message,
            } => Error::ServerError {
                code: i64::from(code),
                sqlstate: sql_state,
                message,
            },
            mysql_protocol::ProtocolError::Tls(inner) => Error::TlsError(inner.to_string()),
            mysql_protocol::ProtocolError::Io(inner) => Error::Io(Arc::new(inner)),
            mysql_protocol::ProtocolError::FullAuthRequiresTls => {
                Error::Unsupported("caching_sha2_password full authentication without TLS".into())
            }
            other => Error::ProtocolError(other.to_string()),
        }
    }
}

/// SQL Server error numbers that are safe to retry (MS-TDS / sys.messages).
const TDS_TRANSIENT_CODES: &[i64] = &[
    1205,  // deadlock victim
    1222,  // lock request timeout
    -2,    // client-side command timeout
    49918, 49919, 49920, // resource governor throttling
];

/// SQL Server error numbers that indicate a caller mistake or data
/// conflict and will never succeed on retry.
const TDS_TERMINAL_CODES: &[i64] = &[102, 207, 208, 547, 2601, 2627];

/// MySQL error codes (`mysqld_error.h`) that are safe to retry.
const MYSQL_TRANSIENT_CODES: &[i64] = &[
    1205, // ER_LOCK_WAIT_TIMEOUT
    1213, // ER_LOCK_DEADLOCK
    1040, // ER_CON_COUNT_ERROR
];

/// PostgreSQL SQLSTATE classes (first two characters) that are safe to retry.
const PG_TRANSIENT_SQLSTATE_CLASSES: &[&str] = &[
    "40", // transaction_rollback (includes serialization_failure, deadlock_detected)
    "53", // insufficient_resources
];

impl Error {
    /// True if retrying the same operation might succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::ConnectionClosed | Self::Io(_) => true,
            Self::ServerError { code, sqlstate, .. } => {
                TDS_TRANSIENT_CODES.contains(code)
                    || MYSQL_TRANSIENT_CODES.contains(code)
                    || sqlstate
                        .as_deref()
                        .is_some_and(|s| PG_TRANSIENT_SQLSTATE_CLASSES.contains(&&s[..2.min(s.len())]))
            }
            _ => false,
        }
    }

    /// True if this error will never succeed on retry (a caller mistake or
    /// a data conflict, not an infrastructure blip).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Config(_) | Self::Unsupported(_) => true,
            Self::ServerError { code, .. } => TDS_TERMINAL_CODES.contains(code),
            _ => false,
        }
    }

    /// True if this error poisons the connection (per the propagation
    /// policy: connection-fatal errors mark the connection closed before
    /// returning; server errors do not).
    #[must_use]
    pub fn is_connection_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConnectionError(_)
                | Self::TlsError(_)
                | Self::ProtocolError(_)
                | Self::AuthenticationFailed(_)
        )
    }

    /// Build a [`Error::ServerError`] tagged with which engine raised it,
    /// for callers that want the distinction in logs.
    #[must_use]
    pub fn server_error(_engine: Engine, code: i64, sqlstate: Option<String>, message: String) -> Self {
        Self::ServerError {
            code,
            sqlstate,
            message,
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn server_error(code: i64) -> Error {
        Error::ServerError {
            code,
            sqlstate: None,
            message: "boom".into(),
        }
    }

    #[test]
    fn tds_deadlock_is_transient() {
        assert!(server_error(1205).is_transient());
    }

    #[test]
    fn tds_syntax_error_is_terminal() {
        assert!(server_error(102).is_terminal());
        assert!(!server_error(102).is_transient());
    }

    #[test]
    fn mysql_lock_wait_timeout_is_transient() {
        assert!(server_error(1205).is_transient());
    }

    #[test]
    fn pg_serialization_failure_is_transient() {
        let err = Error::ServerError {
            code: 0,
            sqlstate: Some("40001".into()),
            message: "could not serialize".into(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn connection_protocol_and_tls_errors_are_fatal() {
        assert!(Error::ConnectionError("reset".into()).is_connection_fatal());
        assert!(Error::TlsError("handshake".into()).is_connection_fatal());
        assert!(Error::ProtocolError("bad token".into()).is_connection_fatal());
        assert!(!Error::ConnectionClosed.is_connection_fatal());
    }

    #[test]
    fn io_and_timeout_are_transient() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(Error::Io(Arc::new(io_err)).is_transient());
        assert!(Error::Timeout.is_transient());
    }
}
