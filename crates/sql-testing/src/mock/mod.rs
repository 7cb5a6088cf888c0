//! Scriptable mock servers for the TDS, PostgreSQL, and MySQL wire
//! protocols.
//!
//! Each engine gets its own listener and handshake/query loop
//! ([`tds::MockTdsServer`], [`pg::MockPgServer`], [`mysql::MockMySqlServer`])
//! but they share one response vocabulary: [`ScalarValue`], [`MockColumn`],
//! and [`MockResponse`] describe what to send back without tying the
//! caller to any one engine's wire types, and [`MockServer`] gives test
//! code one shape to hold whichever of the three it started.
//!
//! ```rust,ignore
//! use sql_testing::mock::{MockResponse, MockServer};
//! use sql_testing::mock::pg::MockPgServer;
//!
//! #[tokio::test]
//! async fn test_query() {
//!     let server = MockPgServer::builder()
//!         .with_response("SELECT 1", MockResponse::scalar_int(1))
//!         .build()
//!         .await
//!         .unwrap();
//!
//!     let addr = server.addr();
//!     // Connect your client to addr...
//! }
//! ```

pub mod mysql;
pub mod pg;
pub mod tds;

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;

/// Error type for mock server operations.
#[derive(Debug, Error)]
pub enum MockServerError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol error.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Server already stopped.
    #[error("Server already stopped")]
    Stopped,
}

/// Result type for mock server operations.
pub type Result<T> = std::result::Result<T, MockServerError>;

/// A scriptable server listening for one engine's wire protocol.
///
/// Implemented identically in shape by [`tds::MockTdsServer`],
/// [`pg::MockPgServer`], and [`mysql::MockMySqlServer`]; which one a test
/// starts depends only on which client it's exercising.
pub trait MockServer {
    /// The server's listening address.
    fn addr(&self) -> SocketAddr;

    /// Host string suitable for connection configuration.
    fn host(&self) -> String {
        self.addr().ip().to_string()
    }

    /// Listening port.
    fn port(&self) -> u16 {
        self.addr().port()
    }

    /// Number of connections accepted so far that haven't disconnected.
    fn connection_count(&self) -> usize;

    /// Stop accepting connections and close the listener.
    fn stop(&self);
}

/// The logical shape of a value, independent of any one wire format.
///
/// Each engine module maps this onto its own real type id when encoding a
/// response (TDS `TypeId`, a PostgreSQL OID, a MySQL column-type byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    /// Boolean.
    Bool,
    /// 32-bit integer.
    Int,
    /// 64-bit integer.
    BigInt,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// Text.
    Text,
    /// Binary data.
    Binary,
}

/// A scalar value used in a mock response.
#[derive(Debug, Clone)]
pub enum ScalarValue {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 32-bit integer.
    Int(i32),
    /// 64-bit integer.
    BigInt(i64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// String value.
    String(String),
    /// Binary data.
    Binary(Vec<u8>),
}

impl ScalarValue {
    /// The logical kind of this value, `Text` for `Null` since a NULL
    /// carries no type information of its own and every engine's wire
    /// format needs *some* column type to describe the slot it sits in.
    #[must_use]
    pub fn kind(&self) -> ScalarKind {
        match self {
            Self::Null | Self::String(_) => ScalarKind::Text,
            Self::Bool(_) => ScalarKind::Bool,
            Self::Int(_) => ScalarKind::Int,
            Self::BigInt(_) => ScalarKind::BigInt,
            Self::Float(_) => ScalarKind::Float,
            Self::Double(_) => ScalarKind::Double,
            Self::Binary(_) => ScalarKind::Binary,
        }
    }

    /// Render this value as the text most engines use for NULL-able
    /// scalar display: used by engines whose row protocol is text-based.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(v) => Some(if *v { "t".to_owned() } else { "f".to_owned() }),
            Self::Int(v) => Some(v.to_string()),
            Self::BigInt(v) => Some(v.to_string()),
            Self::Float(v) => Some(v.to_string()),
            Self::Double(v) => Some(v.to_string()),
            Self::String(v) => Some(v.clone()),
            Self::Binary(v) => Some(String::from_utf8_lossy(v).into_owned()),
        }
    }
}

/// A mock column definition.
#[derive(Debug, Clone)]
pub struct MockColumn {
    /// Column name.
    pub name: String,
    /// Logical value kind.
    pub kind: ScalarKind,
    /// Maximum length (for variable-length kinds).
    pub max_length: Option<u32>,
    /// Whether the column is nullable.
    pub nullable: bool,
}

impl MockColumn {
    /// Create a new column definition.
    pub fn new(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            name: name.into(),
            kind,
            max_length: None,
            nullable: true,
        }
    }

    /// Create an INT column.
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ScalarKind::Int).with_max_length(4)
    }

    /// Create a BIGINT column.
    pub fn bigint(name: impl Into<String>) -> Self {
        Self::new(name, ScalarKind::BigInt).with_max_length(8)
    }

    /// Create a text column (`NVARCHAR`/`varchar`/`VARCHAR` depending on
    /// the engine).
    pub fn text(name: impl Into<String>, max_len: u32) -> Self {
        Self::new(name, ScalarKind::Text).with_max_length(max_len)
    }

    /// Set the maximum length.
    #[must_use]
    pub fn with_max_length(mut self, len: u32) -> Self {
        self.max_length = Some(len);
        self
    }

    /// Set the nullable flag.
    #[must_use]
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
}

/// A scripted response to a query.
#[derive(Clone)]
pub enum MockResponse {
    /// Return a single scalar value.
    Scalar(ScalarValue),

    /// Return multiple rows with columns.
    Rows {
        /// Column definitions.
        columns: Vec<MockColumn>,
        /// Row data.
        rows: Vec<Vec<ScalarValue>>,
    },

    /// Return an engine-level error instead of a result set.
    Error {
        /// Error number/code.
        number: i32,
        /// Error message.
        message: String,
        /// Severity class (only meaningful to TDS; ignored elsewhere).
        severity: u8,
    },

    /// Return a rows-affected count (for INSERT/UPDATE/DELETE).
    RowsAffected(u64),

    /// Compute the response from the query text at request time.
    Custom(Arc<dyn Fn(&str) -> MockResponse + Send + Sync>),
}

impl fmt::Debug for MockResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(v) => f.debug_tuple("Scalar").field(v).finish(),
            Self::Rows { columns, rows } => f
                .debug_struct("Rows")
                .field("columns", columns)
                .field("rows", rows)
                .finish(),
            Self::Error {
                number,
                message,
                severity,
            } => f
                .debug_struct("Error")
                .field("number", number)
                .field("message", message)
                .field("severity", severity)
                .finish(),
            Self::RowsAffected(n) => f.debug_tuple("RowsAffected").field(n).finish(),
            Self::Custom(_) => f.debug_tuple("Custom").field(&"<fn>").finish(),
        }
    }
}

impl MockResponse {
    /// Create a scalar integer response.
    pub fn scalar_int(value: i32) -> Self {
        Self::Scalar(ScalarValue::Int(value))
    }

    /// Create a scalar string response.
    pub fn scalar_string(value: impl Into<String>) -> Self {
        Self::Scalar(ScalarValue::String(value.into()))
    }

    /// Create an empty result response (zero rows affected).
    pub fn empty() -> Self {
        Self::RowsAffected(0)
    }

    /// Create a rows-affected response.
    pub fn affected(count: u64) -> Self {
        Self::RowsAffected(count)
    }

    /// Create an error response.
    pub fn error(number: i32, message: impl Into<String>) -> Self {
        Self::Error {
            number,
            message: message.into(),
            severity: 16,
        }
    }

    /// Create a multi-row response.
    pub fn rows(columns: Vec<MockColumn>, rows: Vec<Vec<ScalarValue>>) -> Self {
        Self::Rows { columns, rows }
    }

    /// Resolve a `Custom` response against the query text that triggered
    /// it, passing everything else through unchanged.
    fn resolve(self, sql: &str) -> Self {
        match self {
            Self::Custom(handler) => handler(sql).resolve(sql),
            other => other,
        }
    }
}

/// Shared configuration for a mock server: the lookup table every engine
/// module scripts its query responses from.
#[derive(Default)]
pub struct MockServerConfig {
    /// Pre-configured responses for specific SQL queries.
    pub(crate) responses: HashMap<String, MockResponse>,
    /// Default response for unmatched queries.
    pub(crate) default_response: Option<MockResponse>,
    /// Server name/version string reported during the handshake.
    pub(crate) server_name: String,
    /// Default database name.
    pub(crate) database: String,
}

/// Find the scripted response for a SQL query, falling back to the
/// configured default and resolving `Custom` handlers against `sql`.
pub(crate) fn find_response(sql: &str, config: &MockServerConfig) -> MockResponse {
    let normalized = sql.trim().to_uppercase();

    let found = config
        .responses
        .get(&normalized)
        .cloned()
        .or_else(|| {
            config
                .responses
                .iter()
                .find(|(key, _)| key.trim().to_uppercase() == normalized)
                .map(|(_, response)| response.clone())
        })
        .or_else(|| config.default_response.clone())
        .unwrap_or_else(MockResponse::empty);

    found.resolve(sql)
}
