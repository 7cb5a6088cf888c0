//! # sql-testing
//!
//! Scriptable mock servers for the TDS, PostgreSQL, and MySQL wire
//! protocols, used by the engine crates' own integration tests and
//! available to test consumers of `sql-client` directly.
//!
//! No Docker, no real database instance: each mock server binds a local
//! TCP port, speaks just enough of its protocol's handshake to satisfy a
//! real client, and answers queries from a table of scripted responses.
//!
//! ```rust,ignore
//! use sql_testing::mock::{MockColumn, MockResponse, MockServer, ScalarValue};
//! use sql_testing::mock::pg::MockPgServer;
//!
//! #[tokio::test]
//! async fn test_with_mock_server() {
//!     let server = MockPgServer::builder()
//!         .with_response(
//!             "SELECT * FROM users WHERE id = 1",
//!             MockResponse::rows(
//!                 vec![MockColumn::int("id"), MockColumn::text("name", 50)],
//!                 vec![vec![ScalarValue::Int(1), ScalarValue::String("Alice".into())]],
//!             ),
//!         )
//!         .build()
//!         .await
//!         .unwrap();
//!
//!     let addr = server.addr();
//!     // Connect your client to addr...
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod mock;

pub use mock::{
    MockColumn, MockResponse, MockServer, MockServerConfig, MockServerError, ScalarKind,
    ScalarValue,
};
