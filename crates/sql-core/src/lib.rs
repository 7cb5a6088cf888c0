//! # sql-core
//!
//! The shared value model, row/column shapes, and type-conversion traits
//! used by every wire engine (`tds-protocol`, `pg-protocol`,
//! `mysql-protocol`) and by `sql-client`.
//!
//! This crate knows nothing about any wire format. Engines decode their own
//! bytes into [`SqlValue`] and describe their own columns as [`SqlColumn`];
//! this crate only fixes the shape those results take once decoded.
//!
//! ## Features
//!
//! - `chrono` (default): enable [`SqlValue::Instant`] via chrono
//! - `uuid` (default): enable [`SqlValue::Uuid`]
//! - `decimal` (default): enable [`SqlValue::Decimal`] via rust_decimal
//!
//! ## Value mapping
//!
//! | `SqlValue` case | Rust type |
//! |------------------|-----------|
//! | `Bool` | `bool` |
//! | `Int8`/`Int16`/`Int32`/`Int64` | `i8`/`i16`/`i32`/`i64` |
//! | `Float32`/`Float64` | `f32`/`f64` |
//! | `Decimal` | `rust_decimal::Decimal` |
//! | `Text` | `String` |
//! | `Bytes` | `Vec<u8>` |
//! | `Uuid` | `uuid::Uuid` |
//! | `Instant` | `chrono::DateTime<Utc>` |

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod column;
pub mod error;
pub mod from_sql;
pub mod parameter;
pub mod result;
pub mod row;
pub mod to_sql;
pub mod value;

pub use column::SqlColumn;
pub use error::TypeError;
pub use from_sql::FromSql;
pub use parameter::SqlParameter;
pub use result::{ResultBatch, ResultSet};
pub use row::SqlRow;
pub use to_sql::ToSql;
pub use value::SqlValue;
