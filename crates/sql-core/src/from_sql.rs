//! Trait for converting from SQL values to Rust types.

use crate::error::TypeError;
use crate::value::SqlValue;

/// Trait for types that can be converted from SQL values.
///
/// This trait is implemented for common Rust types to enable
/// type-safe extraction of values from query results.
pub trait FromSql: Sized {
    /// Convert from a SQL value to this type.
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError>;

    /// Convert from an optional SQL value.
    ///
    /// Returns `None` if the value is NULL.
    fn from_sql_nullable(value: &SqlValue) -> Result<Option<Self>, TypeError> {
        if value.is_null() {
            Ok(None)
        } else {
            Self::from_sql(value).map(Some)
        }
    }
}

macro_rules! mismatch {
    ($expected:literal, $value:expr) => {
        Err(TypeError::TypeMismatch {
            expected: $expected,
            actual: $value.type_name().to_string(),
        })
    };
}

impl FromSql for bool {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Bool(v) => Ok(*v),
            SqlValue::Int8(v) => Ok(*v != 0),
            SqlValue::Int16(v) => Ok(*v != 0),
            SqlValue::Int32(v) => Ok(*v != 0),
            SqlValue::Null => Err(TypeError::UnexpectedNull),
            _ => mismatch!("bool", value),
        }
    }
}

impl FromSql for i8 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Int8(v) => Ok(*v),
            SqlValue::Null => Err(TypeError::UnexpectedNull),
            _ => mismatch!("i8", value),
        }
    }
}

impl FromSql for i16 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Int16(v) => Ok(*v),
            SqlValue::Int8(v) => Ok(*v as i16),
            SqlValue::Null => Err(TypeError::UnexpectedNull),
            _ => mismatch!("i16", value),
        }
    }
}

impl FromSql for i32 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Int32(v) => Ok(*v),
            SqlValue::Int16(v) => Ok(*v as i32),
            SqlValue::Int8(v) => Ok(*v as i32),
            SqlValue::Null => Err(TypeError::UnexpectedNull),
            _ => mismatch!("i32", value),
        }
    }
}

impl FromSql for i64 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Int64(v) => Ok(*v),
            SqlValue::Int32(v) => Ok(*v as i64),
            SqlValue::Int16(v) => Ok(*v as i64),
            SqlValue::Int8(v) => Ok(*v as i64),
            SqlValue::Null => Err(TypeError::UnexpectedNull),
            _ => mismatch!("i64", value),
        }
    }
}

impl FromSql for f32 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Float32(v) => Ok(*v),
            SqlValue::Null => Err(TypeError::UnexpectedNull),
            _ => mismatch!("f32", value),
        }
    }
}

impl FromSql for f64 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Float64(v) => Ok(*v),
            SqlValue::Float32(v) => Ok(*v as f64),
            SqlValue::Null => Err(TypeError::UnexpectedNull),
            _ => mismatch!("f64", value),
        }
    }
}

impl FromSql for String {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Text(v) => Ok(v.clone()),
            SqlValue::Null => Err(TypeError::UnexpectedNull),
            _ => mismatch!("String", value),
        }
    }
}

impl FromSql for Vec<u8> {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Bytes(v) => Ok(v.to_vec()),
            SqlValue::Null => Err(TypeError::UnexpectedNull),
            _ => mismatch!("Vec<u8>", value),
        }
    }
}

impl<T: FromSql> FromSql for Option<T> {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        T::from_sql_nullable(value)
    }
}

#[cfg(feature = "uuid")]
impl FromSql for uuid::Uuid {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Uuid(v) => Ok(*v),
            SqlValue::Bytes(b) if b.len() == 16 => {
                let bytes: [u8; 16] = b[..]
                    .try_into()
                    .map_err(|_| TypeError::InvalidUuid("invalid UUID length".to_string()))?;
                Ok(uuid::Uuid::from_bytes(bytes))
            }
            SqlValue::Text(s) => s
                .parse()
                .map_err(|e| TypeError::InvalidUuid(format!("{e}"))),
            SqlValue::Null => Err(TypeError::UnexpectedNull),
            _ => mismatch!("Uuid", value),
        }
    }
}

#[cfg(feature = "decimal")]
impl FromSql for rust_decimal::Decimal {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Decimal(v) => Ok(*v),
            SqlValue::Int32(v) => Ok(rust_decimal::Decimal::from(*v)),
            SqlValue::Int64(v) => Ok(rust_decimal::Decimal::from(*v)),
            SqlValue::Text(s) => s
                .parse()
                .map_err(|e| TypeError::InvalidDecimal(format!("{e}"))),
            SqlValue::Null => Err(TypeError::UnexpectedNull),
            _ => mismatch!("Decimal", value),
        }
    }
}

#[cfg(feature = "chrono")]
impl FromSql for chrono::DateTime<chrono::Utc> {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Instant(v) => Ok(*v),
            SqlValue::Text(s) => chrono::DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.to_utc())
                .map_err(|e| TypeError::InvalidDateTime(format!("{e}"))),
            SqlValue::Null => Err(TypeError::UnexpectedNull),
            _ => mismatch!("DateTime<Utc>", value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_sql_i32() {
        let value = SqlValue::Int32(42);
        assert_eq!(i32::from_sql(&value).unwrap(), 42);
    }

    #[test]
    fn from_sql_string() {
        let value = SqlValue::Text("hello".to_string());
        assert_eq!(String::from_sql(&value).unwrap(), "hello");
    }

    #[test]
    fn from_sql_null() {
        let value = SqlValue::Null;
        assert!(i32::from_sql(&value).is_err());
    }

    #[test]
    fn from_sql_option() {
        let value = SqlValue::Int32(42);
        assert_eq!(Option::<i32>::from_sql(&value).unwrap(), Some(42));

        let null = SqlValue::Null;
        assert_eq!(Option::<i32>::from_sql(&null).unwrap(), None);
    }

    #[test]
    fn widening_preserves_value() {
        assert_eq!(i64::from_sql(&SqlValue::Int8(-5)).unwrap(), -5);
        assert_eq!(i32::from_sql(&SqlValue::Int16(300)).unwrap(), 300);
    }
}
