//! Decode a column's text-protocol wire bytes into [`SqlValue`], driven by
//! its column-definition type byte.

use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
use sql_core::SqlValue;

use crate::error::ProtocolError;

/// `DECIMAL`
pub const TYPE_DECIMAL: u8 = 0x00;
/// `TINY`
pub const TYPE_TINY: u8 = 0x01;
/// `SHORT`
pub const TYPE_SHORT: u8 = 0x02;
/// `LONG`
pub const TYPE_LONG: u8 = 0x03;
/// `FLOAT`
pub const TYPE_FLOAT: u8 = 0x04;
/// `DOUBLE`
pub const TYPE_DOUBLE: u8 = 0x05;
/// `NULL` (column type, not a per-row null marker)
pub const TYPE_NULL: u8 = 0x06;
/// `TIMESTAMP`
pub const TYPE_TIMESTAMP: u8 = 0x07;
/// `LONGLONG`
pub const TYPE_LONGLONG: u8 = 0x08;
/// `INT24`
pub const TYPE_INT24: u8 = 0x09;
/// `DATE`
pub const TYPE_DATE: u8 = 0x0A;
/// `TIME`
pub const TYPE_TIME: u8 = 0x0B;
/// `DATETIME`
pub const TYPE_DATETIME: u8 = 0x0C;
/// `YEAR`
pub const TYPE_YEAR: u8 = 0x0D;
/// `BIT`
pub const TYPE_BIT: u8 = 0x10;
/// `JSON`
pub const TYPE_JSON: u8 = 0xF5;
/// `NEWDECIMAL`
pub const TYPE_NEWDECIMAL: u8 = 0xF6;
/// `VAR_STRING`
pub const TYPE_VAR_STRING: u8 = 0xFD;
/// `STRING`
pub const TYPE_STRING: u8 = 0xFE;
/// `BLOB`
pub const TYPE_BLOB: u8 = 0xFC;

/// Whether a column definition's flags bit marks binary (vs. text) charset;
/// MySQL reuses `VAR_STRING`/`BLOB` types for both `VARBINARY`/`BLOB` and
/// `VARCHAR`/`TEXT`, distinguished only by charset id `63` (binary).
pub const BINARY_CHARSET: u16 = 63;

/// Decode one column value. `None` means the field was SQL NULL.
pub fn decode_text_value(
    column_type: u8,
    charset: u16,
    text: Option<&[u8]>,
) -> Result<SqlValue, ProtocolError> {
    let Some(text) = text else {
        return Ok(SqlValue::Null);
    };

    let fail = |reason: String| ProtocolError::Decoding {
        column_type,
        reason,
    };

    if matches!(column_type, TYPE_BLOB | TYPE_VAR_STRING | TYPE_STRING) && charset == BINARY_CHARSET
    {
        return Ok(SqlValue::Bytes(bytes::Bytes::copy_from_slice(text)));
    }

    let s = std::str::from_utf8(text).map_err(|e| fail(format!("not valid UTF-8: {e}")))?;

    match column_type {
        TYPE_TINY | TYPE_SHORT | TYPE_INT24 | TYPE_LONG => s
            .parse::<i32>()
            .map(SqlValue::Int32)
            .map_err(|e| fail(e.to_string())),
        TYPE_LONGLONG => s
            .parse::<i64>()
            .map(SqlValue::Int64)
            .map_err(|e| fail(e.to_string())),
        TYPE_FLOAT => s
            .parse::<f32>()
            .map(SqlValue::Float32)
            .map_err(|e| fail(e.to_string())),
        TYPE_DOUBLE => s
            .parse::<f64>()
            .map(SqlValue::Float64)
            .map_err(|e| fail(e.to_string())),
        TYPE_DECIMAL | TYPE_NEWDECIMAL => s
            .parse::<rust_decimal::Decimal>()
            .map(SqlValue::Decimal)
            .map_err(|e| fail(e.to_string())),
        TYPE_BIT => Ok(SqlValue::Bool(text.iter().any(|&b| b != 0))),
        TYPE_DATE => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(|d| SqlValue::Instant(Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0).unwrap())))
            .map_err(|e| fail(e.to_string())),
        TYPE_DATETIME | TYPE_TIMESTAMP => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
            .map(|dt| SqlValue::Instant(Utc.from_utc_datetime(&dt)))
            .map_err(|e| fail(e.to_string())),
        TYPE_TIME | TYPE_YEAR | TYPE_JSON => Ok(SqlValue::Text(s.to_owned())),
        TYPE_NULL => Ok(SqlValue::Null),
        _ if looks_like_uuid(text) => uuid::Uuid::parse_str(s)
            .map(SqlValue::Uuid)
            .or_else(|_| Ok(SqlValue::Text(s.to_owned()))),
        _ => Ok(SqlValue::Text(s.to_owned())),
    }
}

/// MySQL has no native UUID type; drivers conventionally store one as a
/// 36-character `CHAR`/`VARCHAR`. Heuristically detect that shape so it
/// round-trips as [`SqlValue::Uuid`] rather than opaque text.
fn looks_like_uuid(text: &[u8]) -> bool {
    text.len() == 36 && text.iter().filter(|&&b| b == b'-').count() == 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_integers() {
        assert_eq!(
            decode_text_value(TYPE_LONG, 33, Some(b"42")).unwrap(),
            SqlValue::Int32(42)
        );
        assert_eq!(
            decode_text_value(TYPE_LONGLONG, 33, Some(b"9999999999")).unwrap(),
            SqlValue::Int64(9_999_999_999)
        );
    }

    #[test]
    fn null_is_null() {
        assert_eq!(
            decode_text_value(TYPE_LONG, 33, None).unwrap(),
            SqlValue::Null
        );
    }

    #[test]
    fn binary_charset_blob_decodes_as_bytes() {
        let value = decode_text_value(TYPE_BLOB, BINARY_CHARSET, Some(b"\x01\x02\x03")).unwrap();
        assert_eq!(value, SqlValue::Bytes(bytes::Bytes::from_static(b"\x01\x02\x03")));
    }

    #[test]
    fn uuid_shaped_varchar_decodes_as_uuid() {
        let text = b"a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11";
        let value = decode_text_value(TYPE_VAR_STRING, 33, Some(text)).unwrap();
        assert!(matches!(value, SqlValue::Uuid(_)));
    }
}
