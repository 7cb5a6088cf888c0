#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use sql_core::SqlValue;

/// Arbitrary SQL values for round-trip fuzzing.
#[derive(Debug, Arbitrary)]
enum FuzzSqlValue {
    Null,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Text(String),
    Bytes(Vec<u8>),
}

fuzz_target!(|input: FuzzSqlValue| {
    let value: SqlValue = match input {
        FuzzSqlValue::Null => SqlValue::Null,
        FuzzSqlValue::Bool(v) => SqlValue::Bool(v),
        FuzzSqlValue::Int8(v) => SqlValue::Int8(v),
        FuzzSqlValue::Int16(v) => SqlValue::Int16(v),
        FuzzSqlValue::Int32(v) => SqlValue::Int32(v),
        FuzzSqlValue::Int64(v) => SqlValue::Int64(v),
        FuzzSqlValue::Float32(v) => SqlValue::Float32(v),
        FuzzSqlValue::Float64(v) => SqlValue::Float64(v),
        FuzzSqlValue::Text(v) => SqlValue::Text(v),
        FuzzSqlValue::Bytes(v) => SqlValue::Bytes(Bytes::from(v)),
    };

    let _is_null = value.is_null();
    let _debug = format!("{value:?}");
});
