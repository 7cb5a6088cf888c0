#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use tds_protocol::token::Collation;
use tds_protocol::{code_page_for_lcid, encoding_for_lcid, encoding_name_for_lcid, is_utf8_collation};

/// Arbitrary collation data for fuzzing.
#[derive(Debug, Arbitrary)]
struct FuzzCollationInput {
    /// Raw collation bytes (5 bytes in TDS protocol)
    collation_bytes: [u8; 5],
}

fuzz_target!(|input: FuzzCollationInput| {
    let mut bytes = Bytes::copy_from_slice(&input.collation_bytes);
    if let Ok(collation) = Collation::decode(&mut bytes) {
        let _ = is_utf8_collation(collation.lcid);
        let _ = encoding_for_lcid(collation.lcid);
        let _ = code_page_for_lcid(collation.lcid);
        let _ = encoding_name_for_lcid(collation.lcid);
    }
});
