//! # sql-tls
//!
//! A `rustls`/`tokio-rustls` connector shared by every wire engine, plus the
//! TDS-specific intra-protocol wrapping that upgrades an already-connected
//! socket to TLS mid-stream.
//!
//! [`TlsConnector`] itself is protocol-agnostic: it takes any
//! `AsyncRead + AsyncWrite` stream and returns a TLS-wrapped one. Each
//! engine decides *when* to call it:
//!
//! - **TDS 7.x**: `TCP connect → PreLogin (cleartext) → TlsConnector::connect → Login7 (encrypted)`
//! - **TDS 8.0 strict mode**: `TCP connect → TlsConnector::connect → PreLogin (encrypted) → Login7 (encrypted)`
//! - **PostgreSQL**: `TCP connect → SSLRequest byte → (if 'S') TlsConnector::connect → StartupMessage`
//! - **MySQL**: `TCP connect → read HandshakeV10 → SSLRequest packet → TlsConnector::connect → HandshakeResponse41`
//!
//! ## Features
//!
//! - TLS 1.2 and TLS 1.3 support via rustls
//! - Server certificate validation
//! - Hostname verification
//! - Custom certificate authority support
//! - An explicit "trust any certificate" escape hatch for `TrustServerCertificate`-
//!   style opt-outs, off by default and loud when enabled

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod connector;
pub mod error;
pub mod prelogin_wrapper;

pub use config::TlsConfig;
pub use connector::TlsConnector;
pub use error::TlsError;
pub use prelogin_wrapper::TlsPreloginWrapper;

/// The TLS stream type [`TlsConnector::connect`] returns.
pub type TlsStream<S> = tokio_rustls::client::TlsStream<S>;
