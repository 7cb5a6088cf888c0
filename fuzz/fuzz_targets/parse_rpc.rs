#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tds_protocol::rpc::{RpcParam, RpcRequest};

/// Arbitrary `sp_executesql` inputs for fuzzing RPC request encoding.
#[derive(Debug, Arbitrary)]
struct FuzzRpcInput {
    sql: String,
    param_names: Vec<String>,
    param_values: Vec<i32>,
    transaction_descriptor: u64,
    with_recompile: bool,
}

fuzz_target!(|input: FuzzRpcInput| {
    let params: Vec<RpcParam> = input
        .param_names
        .iter()
        .zip(&input.param_values)
        .map(|(name, value)| RpcParam::int(name, *value))
        .collect();

    let request = RpcRequest::execute_sql(&input.sql, params)
        .with_options(tds_protocol::rpc::RpcOptionFlags::new().with_recompile(input.with_recompile));

    let _ = request.encode();
    let _ = request.encode_with_transaction(input.transaction_descriptor);
});
