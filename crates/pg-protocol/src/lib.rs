//! # pg-protocol
//!
//! A pure-Rust implementation of the PostgreSQL frontend/backend protocol
//! version 3: the `SSLRequest` gate, `StartupMessage`, MD5 and
//! SCRAM-SHA-256 authentication, and the simple-query (`Q`) text protocol.
//!
//! Unlike `tds-protocol`, this crate owns both the wire codec and the
//! network I/O: PostgreSQL's simple-query protocol is a strict
//! request/response loop with no independent packet-framing layer worth
//! separating out, so [`connection::PgConnection`] reads and writes
//! directly against its socket.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod auth;
pub mod connection;
pub mod decode;
pub mod error;
pub mod message;
pub mod query;

pub use connection::{PgConfig, PgConnection, TlsMode};
pub use error::ProtocolError;
