#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use tds_protocol::token::{ColumnData, TypeInfo};

/// Arbitrary column metadata for fuzzing.
#[derive(Debug, Arbitrary)]
struct FuzzColumn {
    col_type: u8,
    max_length: Option<u32>,
    precision: Option<u8>,
    scale: Option<u8>,
}

/// Fuzz input combining one column's metadata with its row bytes.
#[derive(Debug, Arbitrary)]
struct FuzzInput {
    column: FuzzColumn,
    data: Vec<u8>,
}

fuzz_target!(|input: FuzzInput| {
    let column = ColumnData {
        name: String::new(),
        col_type: input.column.col_type,
        flags: 0,
        type_info: TypeInfo {
            max_length: input.column.max_length,
            precision: input.column.precision,
            scale: input.column.scale,
            collation: None,
        },
    };

    let mut bytes = Bytes::from(input.data);
    let _ = tds_protocol::decode_row(std::slice::from_ref(&column), &mut bytes, |_| false);
});
