//! The closed `SqlValue` sum type shared by every wire engine.

use bytes::Bytes;

/// A database value in one of a fixed set of cases.
///
/// Every engine (TDS, PostgreSQL, MySQL) maps every server type it
/// understands into exactly one of these cases, preserving the widest
/// width the wire format gave it. Unknown server types degrade to
/// [`SqlValue::Text`].
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed 8-bit integer.
    Int8(i8),
    /// Signed 16-bit integer.
    Int16(i16),
    /// Signed 32-bit integer.
    Int32(i32),
    /// Signed 64-bit integer.
    Int64(i64),
    /// IEEE-754 single precision float.
    Float32(f32),
    /// IEEE-754 double precision float.
    Float64(f64),
    /// Exact decimal, arbitrary precision within the backing type's limits.
    #[cfg(feature = "decimal")]
    Decimal(rust_decimal::Decimal),
    /// UTF-8 text.
    Text(String),
    /// Octet sequence.
    Bytes(Bytes),
    /// 128-bit UUID.
    #[cfg(feature = "uuid")]
    Uuid(uuid::Uuid),
    /// Wall-clock date-time, UTC interpretation.
    #[cfg(feature = "chrono")]
    Instant(chrono::DateTime<chrono::Utc>),
}

impl SqlValue {
    /// True if this value is [`SqlValue::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the value as a bool, if it is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as an i64, widening any narrower signed integer case.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int8(v) => Some(*v as i64),
            Self::Int16(v) => Some(*v as i64),
            Self::Int32(v) => Some(*v as i64),
            Self::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as an f64, widening a narrower float case.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float32(v) => Some(*v as f64),
            Self::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as a string slice, if it is text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Get the value as bytes, if it is a byte sequence.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(v) => Some(v),
            _ => None,
        }
    }

    /// A short, stable name for the active case, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int8(_) => "int8",
            Self::Int16(_) => "int16",
            Self::Int32(_) => "int32",
            Self::Int64(_) => "int64",
            Self::Float32(_) => "float32",
            Self::Float64(_) => "float64",
            #[cfg(feature = "decimal")]
            Self::Decimal(_) => "decimal",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            #[cfg(feature = "uuid")]
            Self::Uuid(_) => "uuid",
            #[cfg(feature = "chrono")]
            Self::Instant(_) => "instant",
        }
    }
}

impl Default for SqlValue {
    fn default() -> Self {
        Self::Null
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i8> for SqlValue {
    fn from(v: i8) -> Self {
        Self::Int8(v)
    }
}

impl From<i16> for SqlValue {
    fn from(v: i16) -> Self {
        Self::Int16(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f32> for SqlValue {
    fn from(v: f32) -> Self {
        Self::Float32(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Float64(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(v))
    }
}

impl<T> From<Option<T>> for SqlValue
where
    T: Into<SqlValue>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

#[cfg(feature = "uuid")]
impl From<uuid::Uuid> for SqlValue {
    fn from(v: uuid::Uuid) -> Self {
        Self::Uuid(v)
    }
}

#[cfg(feature = "decimal")]
impl From<rust_decimal::Decimal> for SqlValue {
    fn from(v: rust_decimal::Decimal) -> Self {
        Self::Decimal(v)
    }
}

#[cfg(feature = "chrono")]
impl From<chrono::DateTime<chrono::Utc>> for SqlValue {
    fn from(v: chrono::DateTime<chrono::Utc>) -> Self {
        Self::Instant(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_null() {
        assert!(SqlValue::Null.is_null());
        assert!(!SqlValue::Int32(0).is_null());
    }

    #[test]
    fn default_is_null() {
        assert_eq!(SqlValue::default(), SqlValue::Null);
    }

    #[test]
    fn widening_accessors() {
        assert_eq!(SqlValue::Int8(5).as_i64(), Some(5));
        assert_eq!(SqlValue::Int16(-5).as_i64(), Some(-5));
        assert_eq!(SqlValue::Float32(1.5).as_f64(), Some(1.5));
        assert_eq!(SqlValue::Bool(true).as_i64(), None);
    }

    #[test]
    fn type_names_are_stable() {
        assert_eq!(SqlValue::Int32(1).type_name(), "int32");
        assert_eq!(SqlValue::Text("x".into()).type_name(), "text");
    }

    #[test]
    fn option_conversion() {
        let some: SqlValue = Some(5i32).into();
        assert_eq!(some, SqlValue::Int32(5));
        let none: SqlValue = Option::<i32>::None.into();
        assert_eq!(none, SqlValue::Null);
    }
}
