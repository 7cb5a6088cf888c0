//! # sql-auth
//!
//! Credential types and mechanism selection shared across every wire
//! engine, plus a from-scratch NTLM implementation for TDS integrated
//! security.
//!
//! ## Supported authentication
//!
//! | Method | Engines | Module |
//! |--------|---------|--------|
//! | Username/password | TDS, PostgreSQL, MySQL | [`credentials`] |
//! | NTLM (domain) | TDS only | [`ntlm`] |
//!
//! Wire-level packet encoding (Login7, StartupMessage,
//! HandshakeResponse41) stays in each protocol crate; this crate only
//! decides which mechanism a set of credentials calls for and computes the
//! NTLM response bytes that go inside TDS's SSPI auth packet.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod credentials;
pub mod error;
pub mod ntlm;
pub mod sql_auth;

pub use credentials::Credentials;
pub use error::AuthError;
pub use sql_auth::AuthMechanism;
