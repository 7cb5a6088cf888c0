//! # mysql-protocol
//!
//! A pure-Rust implementation of the MySQL/MariaDB client/server protocol
//! version 10: packet framing, `HandshakeV10`/`HandshakeResponse41`,
//! `mysql_native_password`/`caching_sha2_password` authentication, and the
//! `COM_QUERY` text protocol.
//!
//! Like `pg-protocol`, this crate owns both wire codec and network I/O —
//! MySQL's request/response shape doesn't benefit from a separate framing
//! layer the way TDS's multi-packet message reassembly does.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod auth;
pub mod connection;
pub mod decode;
pub mod error;
pub mod handshake;
pub mod packet;
pub mod query;

pub use connection::{MysqlConfig, MysqlConnection, TlsMode};
pub use error::ProtocolError;
