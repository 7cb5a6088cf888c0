//! Decode a column's text-format wire bytes into [`SqlValue`], driven by its
//! reported OID.
//!
//! The simple-query protocol always returns results in text format, so
//! every case here parses a UTF-8 string rather than a fixed-width binary
//! layout (contrast with TDS, which is whole-encoding fixed/PLP binary).

use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
use sql_core::SqlValue;

use crate::error::ProtocolError;

/// `bool`
pub const OID_BOOL: u32 = 16;
/// `bytea`
pub const OID_BYTEA: u32 = 17;
/// `int8`
pub const OID_INT8: u32 = 20;
/// `int2`
pub const OID_INT2: u32 = 21;
/// `int4`
pub const OID_INT4: u32 = 23;
/// `float4`
pub const OID_FLOAT4: u32 = 700;
/// `float8`
pub const OID_FLOAT8: u32 = 701;
/// `numeric`
pub const OID_NUMERIC: u32 = 1700;
/// `uuid`
pub const OID_UUID: u32 = 2950;
/// `date`
pub const OID_DATE: u32 = 1082;
/// `timestamp`
pub const OID_TIMESTAMP: u32 = 1114;
/// `timestamptz`
pub const OID_TIMESTAMPTZ: u32 = 1184;

/// Decode one column value. `None` means the field was SQL NULL.
pub fn decode_text_value(oid: u32, text: Option<&[u8]>) -> Result<SqlValue, ProtocolError> {
    let Some(text) = text else {
        return Ok(SqlValue::Null);
    };
    let s = std::str::from_utf8(text).map_err(|e| ProtocolError::Decoding {
        oid,
        reason: format!("not valid UTF-8: {e}"),
    })?;

    let fail = |reason: String| ProtocolError::Decoding { oid, reason };

    match oid {
        OID_BOOL => match s {
            "t" => Ok(SqlValue::Bool(true)),
            "f" => Ok(SqlValue::Bool(false)),
            other => Err(fail(format!("unrecognized bool literal {other:?}"))),
        },
        OID_INT2 => s
            .parse::<i16>()
            .map(SqlValue::Int16)
            .map_err(|e| fail(e.to_string())),
        OID_INT4 => s
            .parse::<i32>()
            .map(SqlValue::Int32)
            .map_err(|e| fail(e.to_string())),
        OID_INT8 => s
            .parse::<i64>()
            .map(SqlValue::Int64)
            .map_err(|e| fail(e.to_string())),
        OID_FLOAT4 => s
            .parse::<f32>()
            .map(SqlValue::Float32)
            .map_err(|e| fail(e.to_string())),
        OID_FLOAT8 => s
            .parse::<f64>()
            .map(SqlValue::Float64)
            .map_err(|e| fail(e.to_string())),
        OID_NUMERIC => s
            .parse::<rust_decimal::Decimal>()
            .map(SqlValue::Decimal)
            .map_err(|e| fail(e.to_string())),
        OID_UUID => uuid::Uuid::parse_str(s)
            .map(SqlValue::Uuid)
            .map_err(|e| fail(e.to_string())),
        OID_BYTEA => decode_bytea(s).map(SqlValue::Bytes).map_err(fail),
        OID_DATE => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(|d| SqlValue::Instant(Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0).unwrap())))
            .map_err(|e| fail(e.to_string())),
        OID_TIMESTAMP => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
            .map(|dt| SqlValue::Instant(Utc.from_utc_datetime(&dt)))
            .map_err(|e| fail(e.to_string())),
        OID_TIMESTAMPTZ => chrono::DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z")
            .or_else(|_| chrono::DateTime::parse_from_rfc3339(s))
            .map(|dt| SqlValue::Instant(dt.with_timezone(&Utc)))
            .map_err(|e| fail(e.to_string())),
        _ => Ok(SqlValue::Text(s.to_owned())),
    }
}

fn decode_bytea(s: &str) -> Result<bytes::Bytes, String> {
    let hex = s
        .strip_prefix("\\x")
        .ok_or_else(|| format!("expected \\x-prefixed bytea, got {s:?}"))?;
    if hex.len() % 2 != 0 {
        return Err("odd-length bytea hex payload".into());
    }
    let mut out = Vec::with_capacity(hex.len() / 2);
    let bytes_hex = hex.as_bytes();
    for chunk in bytes_hex.chunks(2) {
        let byte_str = std::str::from_utf8(chunk).map_err(|e| e.to_string())?;
        out.push(u8::from_str_radix(byte_str, 16).map_err(|e| e.to_string())?);
    }
    Ok(bytes::Bytes::from(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_ints_and_bools() {
        assert_eq!(
            decode_text_value(OID_INT4, Some(b"42")).unwrap(),
            SqlValue::Int32(42)
        );
        assert_eq!(
            decode_text_value(OID_BOOL, Some(b"t")).unwrap(),
            SqlValue::Bool(true)
        );
    }

    #[test]
    fn null_is_null_regardless_of_oid() {
        assert_eq!(decode_text_value(OID_INT4, None).unwrap(), SqlValue::Null);
    }

    #[test]
    fn decodes_bytea_hex() {
        let value = decode_text_value(OID_BYTEA, Some(b"\\x68656c6c6f")).unwrap();
        assert_eq!(value, SqlValue::Bytes(bytes::Bytes::from_static(b"hello")));
    }

    #[test]
    fn unknown_oid_falls_back_to_text() {
        let value = decode_text_value(999_999, Some(b"raw")).unwrap();
        assert_eq!(value, SqlValue::Text("raw".into()));
    }

    #[test]
    fn decodes_uuid() {
        let text = b"a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11";
        let value = decode_text_value(OID_UUID, Some(text)).unwrap();
        assert!(matches!(value, SqlValue::Uuid(_)));
    }
}
