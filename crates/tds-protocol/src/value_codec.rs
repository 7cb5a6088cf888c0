//! Bridges TDS wire values to and from [`sql_core::SqlValue`].
//!
//! Decoding walks a row's bytes column by column, driven by the column's
//! [`TypeId`] and [`TypeInfo`] from the preceding `COLMETADATA`.
//! Encoding picks the wire type this crate uses to bind an outbound
//! parameter, per the type table the RPC layer follows.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use sql_core::{SqlParameter, SqlValue};
use wire_framing::chunked::{read_plp_length, ChunkReassembler, PlpLength};

#[cfg(feature = "encoding")]
use crate::collation::encoding_for_lcid;
use crate::error::ProtocolError;
use crate::rpc::{RpcParam, TypeInfo as RpcTypeInfo};
use crate::token::{ColumnData, TypeInfo};
use crate::types::TypeId;

/// Days between 1900-01-01 (the TDS `DATETIME`/`SMALLDATETIME` epoch) and
/// 1970-01-01 (the Unix epoch).
const DAYS_1900_TO_UNIX_EPOCH: i64 = 25_567;

fn eof() -> ProtocolError {
    ProtocolError::Truncated
}

fn need(data: &Bytes, n: usize) -> Result<(), ProtocolError> {
    if data.remaining() < n {
        Err(eof())
    } else {
        Ok(())
    }
}

/// Decode one row's values, given the column metadata that precedes it.
///
/// `is_null` is consulted per column index first (for `NBCROW`'s null
/// bitmap); when it returns `true` the column's bytes are NOT present on
/// the wire and nothing is read for it.
pub fn decode_row(
    columns: &[ColumnData],
    data: &mut Bytes,
    mut is_null: impl FnMut(usize) -> bool,
) -> Result<Vec<SqlValue>, ProtocolError> {
    let mut values = Vec::with_capacity(columns.len());
    for (index, column) in columns.iter().enumerate() {
        if is_null(index) {
            values.push(SqlValue::Null);
            continue;
        }
        values.push(decode_value(column, data)?);
    }
    Ok(values)
}

pub(crate) fn decode_value(column: &ColumnData, data: &mut Bytes) -> Result<SqlValue, ProtocolError> {
    let type_id = TypeId::from_u8(column.col_type)
        .ok_or(ProtocolError::UnknownType(column.col_type))?;

    match type_id {
        TypeId::Null => Ok(SqlValue::Null),
        TypeId::Int1 => {
            need(data, 1)?;
            Ok(SqlValue::Int16(data.get_u8() as i16))
        }
        TypeId::Bit => {
            need(data, 1)?;
            Ok(SqlValue::Bool(data.get_u8() != 0))
        }
        TypeId::Int2 => {
            need(data, 2)?;
            Ok(SqlValue::Int16(data.get_i16_le()))
        }
        TypeId::Int4 => {
            need(data, 4)?;
            Ok(SqlValue::Int32(data.get_i32_le()))
        }
        TypeId::Int8 => {
            need(data, 8)?;
            Ok(SqlValue::Int64(data.get_i64_le()))
        }
        TypeId::Float4 => {
            need(data, 4)?;
            Ok(SqlValue::Float32(data.get_f32_le()))
        }
        TypeId::Float8 => {
            need(data, 8)?;
            Ok(SqlValue::Float64(data.get_f64_le()))
        }
        TypeId::IntN => decode_int_n(data),
        TypeId::FloatN => decode_float_n(data),
        TypeId::BitN => decode_len_prefixed_fixed(data, |b| Ok(SqlValue::Bool(b[0] != 0))),
        TypeId::MoneyN | TypeId::Money | TypeId::Money4 => decode_money(type_id, data),
        TypeId::Guid => decode_guid(data),
        TypeId::DateTime | TypeId::DateTime4 => decode_fixed_datetime(type_id, data),
        TypeId::DateTimeN => decode_datetime_n(data),
        TypeId::Date => decode_date(data),
        TypeId::Time => decode_time(data, column.type_info.scale.unwrap_or(7)),
        TypeId::DateTime2 => decode_datetime2(data, column.type_info.scale.unwrap_or(7)),
        TypeId::DateTimeOffset => decode_datetime_offset(data, column.type_info.scale.unwrap_or(7)),
        TypeId::Decimal | TypeId::Numeric | TypeId::DecimalN | TypeId::NumericN => {
            decode_decimal(data, &column.type_info)
        }
        TypeId::Char | TypeId::VarChar | TypeId::BigVarChar | TypeId::BigChar => {
            decode_byte_counted_text(data, &column.type_info)
        }
        TypeId::NChar | TypeId::NVarChar => decode_unicode_text(data, &column.type_info),
        TypeId::Binary | TypeId::VarBinary | TypeId::BigVarBinary | TypeId::BigBinary => {
            decode_byte_counted_binary(data)
        }
        TypeId::Text | TypeId::NText | TypeId::Image | TypeId::Xml => {
            decode_plp_text_or_binary(data, matches!(type_id, TypeId::Image))
        }
        TypeId::Variant | TypeId::Udt | TypeId::Tvp => Err(ProtocolError::UnsupportedType(
            format!("{type_id:?}"),
        )),
    }
}

fn decode_len_prefixed_fixed(
    data: &mut Bytes,
    decode: impl FnOnce(&[u8]) -> Result<SqlValue, ProtocolError>,
) -> Result<SqlValue, ProtocolError> {
    need(data, 1)?;
    let len = data.get_u8() as usize;
    if len == 0 {
        return Ok(SqlValue::Null);
    }
    need(data, len)?;
    let mut buf = vec![0u8; len];
    data.copy_to_slice(&mut buf);
    decode(&buf)
}

fn decode_int_n(data: &mut Bytes) -> Result<SqlValue, ProtocolError> {
    need(data, 1)?;
    let len = data.get_u8() as usize;
    need(data, len)?;
    Ok(match len {
        0 => SqlValue::Null,
        1 => SqlValue::Int16(data.get_u8() as i16),
        2 => SqlValue::Int16(data.get_i16_le()),
        4 => SqlValue::Int32(data.get_i32_le()),
        8 => SqlValue::Int64(data.get_i64_le()),
        other => return Err(ProtocolError::UnsupportedType(format!("INTN({other})"))),
    })
}

fn decode_float_n(data: &mut Bytes) -> Result<SqlValue, ProtocolError> {
    need(data, 1)?;
    let len = data.get_u8() as usize;
    need(data, len)?;
    Ok(match len {
        0 => SqlValue::Null,
        4 => SqlValue::Float32(data.get_f32_le()),
        8 => SqlValue::Float64(data.get_f64_le()),
        other => return Err(ProtocolError::UnsupportedType(format!("FLOATN({other})"))),
    })
}

fn decode_money(type_id: TypeId, data: &mut Bytes) -> Result<SqlValue, ProtocolError> {
    let ticks: i64 = match type_id {
        TypeId::Money4 => {
            need(data, 4)?;
            data.get_i32_le() as i64
        }
        TypeId::Money => {
            need(data, 8)?;
            let high = data.get_i32_le() as i64;
            let low = data.get_u32_le() as i64;
            (high << 32) | low
        }
        TypeId::MoneyN => {
            need(data, 1)?;
            let len = data.get_u8() as usize;
            need(data, len)?;
            match len {
                0 => return Ok(SqlValue::Null),
                4 => data.get_i32_le() as i64,
                8 => {
                    let high = data.get_i32_le() as i64;
                    let low = data.get_u32_le() as i64;
                    (high << 32) | low
                }
                other => return Err(ProtocolError::UnsupportedType(format!("MONEYN({other})"))),
            }
        }
        _ => unreachable!(),
    };
    // MONEY is a scaled integer: 4 implied decimal places.
    Ok(SqlValue::Decimal(rust_decimal::Decimal::from_i128_with_scale(
        ticks as i128,
        4,
    )))
}

fn decode_guid(data: &mut Bytes) -> Result<SqlValue, ProtocolError> {
    need(data, 1)?;
    let len = data.get_u8() as usize;
    if len == 0 {
        return Ok(SqlValue::Null);
    }
    need(data, len)?;
    let mut wire = [0u8; 16];
    data.copy_to_slice(&mut wire[..len.min(16)]);
    let reordered = [
        wire[3], wire[2], wire[1], wire[0], wire[5], wire[4], wire[7], wire[6], wire[8], wire[9],
        wire[10], wire[11], wire[12], wire[13], wire[14], wire[15],
    ];
    Ok(SqlValue::Uuid(uuid::Uuid::from_bytes(reordered)))
}

fn days_and_ticks_to_instant(days: i32, ticks_300th: u32) -> chrono::DateTime<chrono::Utc> {
    let seconds = ticks_300th as f64 / 300.0;
    let base = chrono::DateTime::UNIX_EPOCH - chrono::Duration::days(DAYS_1900_TO_UNIX_EPOCH);
    base + chrono::Duration::days(days as i64) + chrono::Duration::milliseconds((seconds * 1000.0) as i64)
}

fn decode_fixed_datetime(type_id: TypeId, data: &mut Bytes) -> Result<SqlValue, ProtocolError> {
    match type_id {
        TypeId::DateTime => {
            need(data, 8)?;
            let days = data.get_i32_le();
            let ticks = data.get_u32_le();
            Ok(instant_value(days_and_ticks_to_instant(days, ticks)))
        }
        TypeId::DateTime4 => {
            need(data, 4)?;
            let days = data.get_u16_le() as i32;
            let minutes = data.get_u16_le();
            Ok(instant_value(days_and_ticks_to_instant(
                days,
                minutes as u32 * 300 * 60,
            )))
        }
        _ => unreachable!(),
    }
}

fn decode_datetime_n(data: &mut Bytes) -> Result<SqlValue, ProtocolError> {
    need(data, 1)?;
    let len = data.get_u8() as usize;
    need(data, len)?;
    match len {
        0 => Ok(SqlValue::Null),
        4 => {
            let days = data.get_u16_le() as i32;
            let minutes = data.get_u16_le();
            Ok(instant_value(days_and_ticks_to_instant(
                days,
                minutes as u32 * 300 * 60,
            )))
        }
        8 => {
            let days = data.get_i32_le();
            let ticks = data.get_u32_le();
            Ok(instant_value(days_and_ticks_to_instant(days, ticks)))
        }
        other => Err(ProtocolError::UnsupportedType(format!("DATETIMEN({other})"))),
    }
}

fn decode_date(data: &mut Bytes) -> Result<SqlValue, ProtocolError> {
    need(data, 1)?;
    let len = data.get_u8() as usize;
    if len == 0 {
        return Ok(SqlValue::Null);
    }
    need(data, 3)?;
    let days = read_u24_le(data);
    Ok(instant_value(date_from_ce_days(days as i64)))
}

fn time_byte_len(scale: u8) -> usize {
    match scale {
        0..=2 => 3,
        3..=4 => 4,
        _ => 5,
    }
}

fn decode_time(data: &mut Bytes, scale: u8) -> Result<SqlValue, ProtocolError> {
    need(data, 1)?;
    let len = data.get_u8() as usize;
    if len == 0 {
        return Ok(SqlValue::Null);
    }
    let byte_len = time_byte_len(scale);
    need(data, byte_len)?;
    let raw = read_uint_le(data, byte_len);
    let hundred_ns = raw * 10u64.pow(7 - scale.min(7) as u32);
    let base = chrono::DateTime::UNIX_EPOCH;
    Ok(instant_value(base + chrono::Duration::nanoseconds((hundred_ns * 100) as i64)))
}

fn decode_datetime2(data: &mut Bytes, scale: u8) -> Result<SqlValue, ProtocolError> {
    need(data, 1)?;
    let len = data.get_u8() as usize;
    if len == 0 {
        return Ok(SqlValue::Null);
    }
    let time_len = time_byte_len(scale);
    need(data, time_len + 3)?;
    let raw_time = read_uint_le(data, time_len);
    let days = read_u24_le(data);
    let hundred_ns = raw_time * 10u64.pow(7 - scale.min(7) as u32);
    let date = date_from_ce_days(days as i64);
    Ok(instant_value(date + chrono::Duration::nanoseconds((hundred_ns * 100) as i64)))
}

fn decode_datetime_offset(data: &mut Bytes, scale: u8) -> Result<SqlValue, ProtocolError> {
    need(data, 1)?;
    let len = data.get_u8() as usize;
    if len == 0 {
        return Ok(SqlValue::Null);
    }
    let time_len = time_byte_len(scale);
    need(data, time_len + 3 + 2)?;
    let raw_time = read_uint_le(data, time_len);
    let days = read_u24_le(data);
    let offset_minutes = data.get_i16_le();
    let hundred_ns = raw_time * 10u64.pow(7 - scale.min(7) as u32);
    let local = date_from_ce_days(days as i64) + chrono::Duration::nanoseconds((hundred_ns * 100) as i64);
    let utc = local - chrono::Duration::minutes(offset_minutes as i64);
    Ok(instant_value(utc))
}

fn date_from_ce_days(days_since_0001: i64) -> chrono::DateTime<chrono::Utc> {
    let base = chrono::DateTime::UNIX_EPOCH - chrono::Duration::days(719_162);
    base + chrono::Duration::days(days_since_0001)
}

fn instant_value(dt: chrono::DateTime<chrono::Utc>) -> SqlValue {
    SqlValue::Instant(dt)
}

fn read_uint_le(data: &mut Bytes, len: usize) -> u64 {
    let mut value = 0u64;
    for i in 0..len {
        value |= (data.get_u8() as u64) << (8 * i);
    }
    value
}

fn read_u24_le(data: &mut Bytes) -> u32 {
    let b0 = data.get_u8() as u32;
    let b1 = data.get_u8() as u32;
    let b2 = data.get_u8() as u32;
    b0 | (b1 << 8) | (b2 << 16)
}

fn decode_decimal(data: &mut Bytes, type_info: &TypeInfo) -> Result<SqlValue, ProtocolError> {
    need(data, 1)?;
    let len = data.get_u8() as usize;
    if len == 0 {
        return Ok(SqlValue::Null);
    }
    need(data, len)?;
    let mut bytes = vec![0u8; len];
    data.copy_to_slice(&mut bytes);
    let sign = bytes[0];
    let mantissa_bytes = &bytes[1..];
    let mut mantissa: u128 = 0;
    for &b in mantissa_bytes.iter().rev() {
        mantissa = (mantissa << 8) | b as u128;
    }
    let scale = type_info.scale.unwrap_or(0);
    decimal_value(sign == 0, mantissa, scale)
}

fn decimal_value(negative: bool, mantissa: u128, scale: u8) -> Result<SqlValue, ProtocolError> {
    let unscaled = i128::try_from(mantissa).map_err(|_| ProtocolError::Truncated)?;
    let mut decimal = rust_decimal::Decimal::from_i128_with_scale(unscaled, scale as u32);
    if negative {
        decimal.set_sign_negative(true);
    }
    Ok(SqlValue::Decimal(decimal))
}

fn decode_byte_counted_text(data: &mut Bytes, type_info: &TypeInfo) -> Result<SqlValue, ProtocolError> {
    need(data, 2)?;
    let len = data.get_u16_le() as usize;
    if len == 0xFFFF {
        return Ok(SqlValue::Null);
    }
    need(data, len)?;
    let mut bytes = vec![0u8; len];
    data.copy_to_slice(&mut bytes);
    let text = decode_collated_bytes(&bytes, type_info);
    Ok(SqlValue::Text(text))
}

fn decode_collated_bytes(bytes: &[u8], type_info: &TypeInfo) -> String {
    #[cfg(feature = "encoding")]
    {
        if let Some(collation) = type_info.collation {
            if let Some(encoding) = encoding_for_lcid(collation.lcid) {
                return encoding.decode(bytes).0.into_owned();
            }
        }
    }
    let _ = type_info;
    String::from_utf8_lossy(bytes).into_owned()
}

fn decode_unicode_text(data: &mut Bytes, _type_info: &TypeInfo) -> Result<SqlValue, ProtocolError> {
    need(data, 2)?;
    let declared_len = data.get_u16_le();
    if declared_len == 0xFFFF {
        return decode_plp_text_or_binary(data, false);
    }
    let char_count = declared_len as usize / 2;
    let text = wire_framing::text::read_utf16_string(data, char_count)
        .map_err(|e| ProtocolError::Decoding(e.to_string()))?;
    Ok(SqlValue::Text(text))
}

fn decode_byte_counted_binary(data: &mut Bytes) -> Result<SqlValue, ProtocolError> {
    need(data, 2)?;
    let len = data.get_u16_le() as usize;
    if len == 0xFFFF {
        return Ok(SqlValue::Null);
    }
    need(data, len)?;
    let mut bytes = vec![0u8; len];
    data.copy_to_slice(&mut bytes);
    Ok(SqlValue::Bytes(bytes::Bytes::from(bytes)))
}

fn decode_plp_text_or_binary(data: &mut Bytes, is_binary: bool) -> Result<SqlValue, ProtocolError> {
    match read_plp_length(data).map_err(|e| ProtocolError::Decoding(e.to_string()))? {
        PlpLength::Null => Ok(SqlValue::Null),
        PlpLength::Unknown | PlpLength::Known(_) => {
            let mut reassembler = ChunkReassembler::new();
            while !reassembler.is_complete() {
                need(data, 4)?;
                let chunk_len = data.get_u32_le();
                let mut chunk = vec![0u8; chunk_len as usize];
                need(data, chunk.len())?;
                data.copy_to_slice(&mut chunk);
                reassembler
                    .push_chunk(chunk_len, &chunk)
                    .map_err(|e| ProtocolError::Decoding(e.to_string()))?;
            }
            let assembled = reassembler.finish();
            if is_binary {
                Ok(SqlValue::Bytes(bytes::Bytes::copy_from_slice(&assembled)))
            } else {
                let text = wire_framing::text::read_utf16_string(
                    &mut assembled.clone(),
                    assembled.len() / 2,
                )
                .map_err(|e| ProtocolError::Decoding(e.to_string()))?;
                Ok(SqlValue::Text(text))
            }
        }
    }
}

/// Bind a [`SqlParameter`] to the RPC wire form `sp_executesql` expects.
///
/// Follows the binding table the RPC layer uses: integers and floats go out
/// as `INTN`/`FLOATN`, text and bytes as PLP `NVARCHAR`/`VARBINARY`, decimals
/// as the NVARCHAR text of their decimal representation (sidesteps
/// precision/scale mismatches with the server's column), UUIDs as a
/// mixed-endian `GUID`, and instants as `DATETIME2(7)`.
pub fn encode_param(param: &SqlParameter) -> RpcParam {
    let mut rpc = match &param.value {
        SqlValue::Null => RpcParam::null(&param.name, RpcTypeInfo::int()),
        SqlValue::Bool(b) => {
            RpcParam::new(&param.name, RpcTypeInfo::bit(), Bytes::from(vec![u8::from(*b)]))
        }
        SqlValue::Int8(v) => encode_int_n(&param.name, 1, *v as i64),
        SqlValue::Int16(v) => encode_int_n(&param.name, 2, *v as i64),
        SqlValue::Int32(v) => encode_int_n(&param.name, 4, *v as i64),
        SqlValue::Int64(v) => encode_int_n(&param.name, 8, *v),
        SqlValue::Float32(v) => {
            let mut buf = BytesMut::with_capacity(4);
            buf.put_f32_le(*v);
            RpcParam::new(&param.name, RpcTypeInfo::real(), buf.freeze())
        }
        SqlValue::Float64(v) => {
            let mut buf = BytesMut::with_capacity(8);
            buf.put_f64_le(*v);
            RpcParam::new(&param.name, RpcTypeInfo::float(), buf.freeze())
        }
        SqlValue::Decimal(d) => RpcParam::nvarchar(&param.name, &d.to_string()),
        SqlValue::Text(s) => RpcParam::nvarchar(&param.name, s),
        SqlValue::Bytes(b) => {
            RpcParam::new(&param.name, RpcTypeInfo::varbinary(0xFFFF), b.clone())
        }
        SqlValue::Uuid(u) => {
            let c = u.as_bytes();
            let wire = [
                c[3], c[2], c[1], c[0], c[5], c[4], c[7], c[6], c[8], c[9], c[10], c[11], c[12],
                c[13], c[14], c[15],
            ];
            RpcParam::new(
                &param.name,
                RpcTypeInfo::uniqueidentifier(),
                Bytes::copy_from_slice(&wire),
            )
        }
        SqlValue::Instant(dt) => encode_datetime2(&param.name, *dt, 7),
        _ => unreachable!("SqlValue is non_exhaustive but all current variants are handled above"),
    };
    if param.output {
        rpc = rpc.as_output();
    }
    rpc
}

fn encode_int_n(name: &str, len: usize, value: i64) -> RpcParam {
    let mut buf = BytesMut::with_capacity(len);
    match len {
        1 => buf.put_i8(value as i8),
        2 => buf.put_i16_le(value as i16),
        4 => buf.put_i32_le(value as i32),
        8 => buf.put_i64_le(value),
        _ => unreachable!("INTN length is always 1, 2, 4 or 8"),
    }
    let type_info = RpcTypeInfo {
        type_id: 0x26,
        max_length: Some(len as u16),
        precision: None,
        scale: None,
        collation: None,
        tvp_type_name: None,
    };
    RpcParam::new(name, type_info, buf.freeze())
}

fn encode_datetime2(name: &str, dt: chrono::DateTime<chrono::Utc>, scale: u8) -> RpcParam {
    let base = chrono::DateTime::UNIX_EPOCH - chrono::Duration::days(719_162);
    let midnight = chrono::DateTime::from_naive_utc_and_offset(dt.date_naive().and_time(chrono::NaiveTime::MIN), chrono::Utc);
    let days = (midnight - base).num_days().max(0) as u32;
    let time_since_midnight = dt - midnight;
    let hundred_ns = time_since_midnight.num_nanoseconds().unwrap_or(0).max(0) as u64 / 100;
    let raw_time = hundred_ns / 10u64.pow(7 - scale.min(7) as u32);
    let time_len = time_byte_len(scale);

    let mut buf = BytesMut::with_capacity(time_len + 3);
    for i in 0..time_len {
        buf.put_u8((raw_time >> (8 * i)) as u8);
    }
    buf.put_u8(days as u8);
    buf.put_u8((days >> 8) as u8);
    buf.put_u8((days >> 16) as u8);

    RpcParam::new(name, RpcTypeInfo::datetime2(scale), buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::ColumnData;
    use bytes::BytesMut;

    fn column(col_type: u8, type_info: TypeInfo) -> ColumnData {
        ColumnData {
            name: "c".to_string(),
            col_type,
            flags: 0,
            type_info,
        }
    }

    #[test]
    fn decodes_fixed_int4() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&42i32.to_le_bytes());
        let col = column(TypeId::Int4 as u8, TypeInfo::default());
        let mut bytes = buf.freeze();
        let v = decode_value(&col, &mut bytes).unwrap();
        assert_eq!(v, SqlValue::Int32(42));
    }

    #[test]
    fn decodes_intn_null() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[0u8]);
        let col = column(TypeId::IntN as u8, TypeInfo::default());
        let mut bytes = buf.freeze();
        assert_eq!(decode_value(&col, &mut bytes).unwrap(), SqlValue::Null);
    }

    #[test]
    fn decodes_bigvarchar() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&5u16.to_le_bytes());
        buf.extend_from_slice(b"hello");
        let col = column(TypeId::BigVarChar as u8, TypeInfo::default());
        let mut bytes = buf.freeze();
        assert_eq!(
            decode_value(&col, &mut bytes).unwrap(),
            SqlValue::Text("hello".to_string())
        );
    }

    #[test]
    fn decodes_guid_reordered() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[16u8]);
        // Canonical GUID bytes on the wire in mixed-endian order.
        let wire: [u8; 16] = [
            0x04, 0x03, 0x02, 0x01, 0x06, 0x05, 0x08, 0x07, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E,
            0x0F, 0x10,
        ];
        buf.extend_from_slice(&wire);
        let col = column(TypeId::Guid as u8, TypeInfo::default());
        let mut bytes = buf.freeze();
        let value = decode_value(&col, &mut bytes).unwrap();
        match value {
            SqlValue::Uuid(u) => {
                assert_eq!(
                    u.as_bytes(),
                    &[
                        0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C,
                        0x0D, 0x0E, 0x0F, 0x10
                    ]
                );
            }
            other => panic!("unexpected value: {other:?}"),
        }
    }

    #[test]
    fn decodes_plp_text() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&wire_framing::chunked::UNKNOWN_LENGTH.to_le_bytes());
        let chunk: Vec<u8> = "hi".encode_utf16().flat_map(u16::to_le_bytes).collect();
        buf.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
        buf.extend_from_slice(&chunk);
        buf.extend_from_slice(&0u32.to_le_bytes());
        let col = column(TypeId::NVarChar as u8, TypeInfo::default());
        let mut bytes = buf.freeze();
        // force PLP path by setting declared length to 0xFFFF first
        let mut wrapped = BytesMut::new();
        wrapped.extend_from_slice(&0xFFFFu16.to_le_bytes());
        wrapped.extend_from_slice(&bytes.split_off(0));
        let mut wrapped = wrapped.freeze();
        assert_eq!(
            decode_value(&col, &mut wrapped).unwrap(),
            SqlValue::Text("hi".to_string())
        );
    }

    #[test]
    fn encodes_int32_param_as_intn() {
        let param = SqlParameter::from_value("@p1", SqlValue::Int32(42));
        let rpc = encode_param(&param);
        assert_eq!(rpc.type_info.type_id, 0x26);
        assert_eq!(rpc.type_info.max_length, Some(4));
        assert_eq!(rpc.value.unwrap(), Bytes::from(42i32.to_le_bytes().to_vec()));
    }

    #[test]
    fn encodes_null_param_as_zero_length_intn() {
        let param = SqlParameter::from_value("@p1", SqlValue::Null);
        let rpc = encode_param(&param);
        assert_eq!(rpc.type_info.type_id, 0x26);
        assert!(rpc.value.is_none());
    }

    #[test]
    fn encodes_text_param_as_nvarchar() {
        let param = SqlParameter::from_value("@p1", SqlValue::Text("hi".into()));
        let rpc = encode_param(&param);
        assert_eq!(rpc.type_info.type_id, 0xE7);
    }

    #[test]
    fn encodes_uuid_param_mixed_endian() {
        let uuid = uuid::Uuid::from_bytes([
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E,
            0x0F, 0x10,
        ]);
        let param = SqlParameter::from_value("@p1", SqlValue::Uuid(uuid));
        let rpc = encode_param(&param);
        let wire = rpc.value.unwrap();
        assert_eq!(
            &wire[..],
            &[
                0x04, 0x03, 0x02, 0x01, 0x06, 0x05, 0x08, 0x07, 0x09, 0x0A, 0x0B, 0x0C, 0x0D,
                0x0E, 0x0F, 0x10
            ]
        );
    }
}
