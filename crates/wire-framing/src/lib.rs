//! # wire-framing
//!
//! Byte-framing primitives shared by `tds-protocol`, `pg-protocol` and
//! `mysql-protocol`: fixed/variable-length string encodings, MySQL's
//! length-encoded integers, and a chunk reassembler for sentinel-delimited
//! streaming values (TDS PLP, JSON/LOB chunk sequences).
//!
//! None of these helpers know what protocol they're framing for; each
//! wire crate picks the subset it needs.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod chunked;
pub mod error;
pub mod lenenc;
pub mod text;

pub use chunked::ChunkReassembler;
pub use error::FramingError;
