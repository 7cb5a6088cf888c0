//! # sql-client
//!
//! A single async client surface for TDS 7.4 (SQL Server), PostgreSQL wire
//! protocol v3, and MySQL/MariaDB protocol v10. One [`Config`] picks the
//! [`Engine`]; everything past that — connecting, querying, binding
//! parameters, transactions, cancellation — reads the same across all
//! three.
//!
//! ```no_run
//! use sql_client::{Config, Engine, SqlConnection, Params};
//!
//! # async fn run() -> Result<(), sql_client::Error> {
//! let config = Config::new(Engine::Postgres)
//!     .host("localhost")
//!     .credentials("app", "secret");
//! let mut conn = SqlConnection::connect(config).await?;
//! let params = Params::new().bind(42i32)?;
//! let batch = conn
//!     .query("SELECT * FROM widgets WHERE id = @p1", params.as_slice())
//!     .await?;
//! for row in batch.rows() {
//!     let name: String = row.try_get_by_name("name")?;
//!     println!("{name}");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod cancel;
pub mod config;
pub mod connection;
pub mod error;
pub mod instrumentation;
pub mod query;
pub mod state;
pub mod stream;
pub mod transaction;

pub use cancel::CancelHandle;
pub use config::{Config, Engine, RetryPolicy, TimeoutConfig, TlsPolicy};
pub use connection::SqlConnection;
pub use error::{Error, Result};
pub use instrumentation::{InstrumentationContext, SanitizationConfig, attributes, span_names};
pub use query::Params;
pub use sql_core::{
    FromSql, ResultBatch, ResultSet, SqlColumn, SqlParameter, SqlRow, SqlValue, ToSql,
};
pub use state::ConnectionState;
pub use stream::{ExecuteResult, MultiResultStream, OutputParam, QueryStream};
pub use transaction::{IsolationLevel, begin_statement};
