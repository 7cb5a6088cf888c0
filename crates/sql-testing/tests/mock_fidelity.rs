//! Structural tests for the three mock servers: each one starts, reports a
//! real listening port, and scripts responses the way its builder promises.
//! None of these drive a real client connection through the wire protocol —
//! that's covered by the `sql-client` integration suite, which runs each
//! mock server under the actual engine it mocks.

#![allow(clippy::unwrap_used, clippy::panic)]

use sql_testing::mock::mysql::MockMySqlServer;
use sql_testing::mock::pg::MockPgServer;
use sql_testing::mock::tds::MockTdsServer;
use sql_testing::mock::{MockColumn, MockResponse, MockServer, ScalarKind, ScalarValue};

#[tokio::test]
async fn tds_server_starts_and_listens() {
    let server = MockTdsServer::builder()
        .with_server_name("FidelityTest")
        .with_database("testdb")
        .build()
        .await
        .expect("server should start");

    assert!(server.port() > 0);
    assert_eq!(server.host(), "127.0.0.1");
    assert_eq!(server.connection_count(), 0);

    server.stop();
}

#[tokio::test]
async fn pg_server_starts_and_listens() {
    let server = MockPgServer::builder()
        .with_server_name("16.1")
        .build()
        .await
        .expect("server should start");

    assert!(server.port() > 0);
    assert_eq!(server.connection_count(), 0);
    server.stop();
}

#[tokio::test]
async fn mysql_server_starts_and_listens() {
    let server = MockMySqlServer::builder()
        .with_server_name("8.0.35-mock")
        .build()
        .await
        .expect("server should start");

    assert!(server.port() > 0);
    assert_eq!(server.connection_count(), 0);
    server.stop();
}

#[tokio::test]
async fn builder_accepts_scripted_responses() {
    let server = MockTdsServer::builder()
        .with_server_name("CustomServer")
        .with_database("customdb")
        .with_response("SELECT 1", MockResponse::scalar_int(1))
        .with_response("SELECT 2", MockResponse::scalar_int(2))
        .with_default_response(MockResponse::empty())
        .build()
        .await
        .expect("server should start");

    assert!(server.port() > 0);
    server.stop();
}

#[test]
fn mock_response_constructors_build_the_right_variant() {
    match MockResponse::scalar_int(42) {
        MockResponse::Scalar(ScalarValue::Int(v)) => assert_eq!(v, 42),
        other => panic!("expected scalar int, got {other:?}"),
    }

    match MockResponse::scalar_string("hello") {
        MockResponse::Scalar(ScalarValue::String(s)) => assert_eq!(s, "hello"),
        other => panic!("expected scalar string, got {other:?}"),
    }

    match MockResponse::affected(5) {
        MockResponse::RowsAffected(n) => assert_eq!(n, 5),
        other => panic!("expected rows affected, got {other:?}"),
    }

    match MockResponse::error(50000, "Test error") {
        MockResponse::Error { number, message, severity } => {
            assert_eq!(number, 50000);
            assert_eq!(message, "Test error");
            assert_eq!(severity, 16);
        }
        other => panic!("expected error, got {other:?}"),
    }

    match MockResponse::empty() {
        MockResponse::RowsAffected(0) => {}
        other => panic!("expected empty rows-affected, got {other:?}"),
    }
}

#[test]
fn mock_column_constructors_set_the_logical_kind() {
    let col = MockColumn::int("id");
    assert_eq!(col.name, "id");
    assert_eq!(col.kind, ScalarKind::Int);
    assert_eq!(col.max_length, Some(4));
    assert!(col.nullable);

    let col = MockColumn::bigint("big_id");
    assert_eq!(col.kind, ScalarKind::BigInt);
    assert_eq!(col.max_length, Some(8));

    let col = MockColumn::text("name", 50);
    assert_eq!(col.kind, ScalarKind::Text);
    assert_eq!(col.max_length, Some(50));

    let col = MockColumn::int("required").with_nullable(false);
    assert!(!col.nullable);
}

#[test]
fn mock_rows_response_carries_both_columns_and_data() {
    let columns = vec![MockColumn::int("id"), MockColumn::text("name", 50)];
    let rows = vec![
        vec![ScalarValue::Int(1), ScalarValue::String("Alice".into())],
        vec![ScalarValue::Int(2), ScalarValue::String("Bob".into())],
    ];

    match MockResponse::rows(columns, rows) {
        MockResponse::Rows { columns, rows } => {
            assert_eq!(columns.len(), 2);
            assert_eq!(rows.len(), 2);
            assert_eq!(columns[0].name, "id");
            assert_eq!(columns[1].name, "name");
        }
        other => panic!("expected rows response, got {other:?}"),
    }
}

#[tokio::test]
async fn multiple_mock_servers_can_run_at_once() {
    let tds = MockTdsServer::builder().build().await.expect("tds should start");
    let pg = MockPgServer::builder().build().await.expect("pg should start");
    let mysql = MockMySqlServer::builder().build().await.expect("mysql should start");

    let ports = [tds.port(), pg.port(), mysql.port()];
    assert_eq!(ports.iter().collect::<std::collections::HashSet<_>>().len(), 3);

    tds.stop();
    pg.stop();
    mysql.stop();
}

#[tokio::test]
async fn stop_is_idempotent() {
    let server = MockTdsServer::builder().build().await.expect("server should start");
    server.stop();
    server.stop();
}
