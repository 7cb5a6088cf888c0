//! Micro-benchmarks for the parts of the client that run on every request
//! without touching the network: connection-string parsing and parameter
//! binding. Anything that talks to a server belongs in `tests/integration.rs`
//! instead, gated behind a live instance.

use criterion::{Criterion, criterion_group, criterion_main};
use sql_client::{Config, Params};

fn bench_connection_string_parsing(c: &mut Criterion) {
    c.bench_function("parse_tds_connection_string", |b| {
        b.iter(|| {
            Config::from_connection_string(
                "Server=localhost;Database=app;User Id=sa;Password=secret;Encrypt=true",
            )
            .unwrap()
        });
    });
}

fn bench_params_binding(c: &mut Criterion) {
    c.bench_function("bind_five_params", |b| {
        b.iter(|| {
            Params::new()
                .bind(1i32)
                .unwrap()
                .bind("widget")
                .unwrap()
                .bind(3.14f64)
                .unwrap()
                .bind(true)
                .unwrap()
                .bind_output::<i32>(0)
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_connection_string_parsing, bench_params_binding);
criterion_main!(benches);
