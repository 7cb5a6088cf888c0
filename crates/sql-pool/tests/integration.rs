//! Connection pool integration tests against a live server.
//!
//! Ignored by default; run with:
//!
//! ```bash
//! export SQL_ENGINE=tds   # or postgres / mysql
//! export SQL_HOST=localhost SQL_USER=sa SQL_PASSWORD=YourStrong@Passw0rd
//! cargo test -p sql-pool --test integration -- --ignored
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

use sql_client::{Config, Engine, TlsPolicy};
use sql_pool::{Pool, PoolConfig};
use std::time::Duration;

fn test_config() -> Option<Config> {
    let engine = match std::env::var("SQL_ENGINE").as_deref() {
        Ok("postgres") => Engine::Postgres,
        Ok("mysql") => Engine::MySql,
        _ => Engine::Tds,
    };
    let host = std::env::var("SQL_HOST").ok()?;
    let user = std::env::var("SQL_USER").unwrap_or_else(|_| "sa".into());
    let password = std::env::var("SQL_PASSWORD").unwrap_or_default();

    Some(
        Config::new(engine)
            .host(host)
            .credentials(user, password)
            .tls(TlsPolicy::Disable)
            .trust_server_certificate(true),
    )
}

#[tokio::test]
#[ignore = "requires a running database instance"]
async fn pool_create_and_close() {
    let config = test_config().expect("SQL_HOST not set");
    let pool = Pool::new(config, PoolConfig::new().max_connections(5)).unwrap();

    assert!(!pool.is_closed());
    let status = pool.status();
    assert_eq!(status.max, 5);
    assert_eq!(status.in_use, 0);

    pool.close().await;
    assert!(pool.is_closed());
}

#[tokio::test]
#[ignore = "requires a running database instance"]
async fn get_returns_a_working_connection() {
    let config = test_config().expect("SQL_HOST not set");
    let pool = Pool::new(config, PoolConfig::new().max_connections(5)).unwrap();

    let mut conn = pool.get().await.expect("failed to get connection");
    assert_eq!(pool.status().in_use, 1);

    let batch = conn.query("SELECT 1 AS value", &[]).await.expect("query failed");
    let value: i32 = batch.rows()[0].try_get_by_name("value").unwrap();
    assert_eq!(value, 1);

    drop(conn);
    let status = pool.status();
    assert_eq!(status.in_use, 0);
    assert_eq!(status.available, 1);

    pool.close().await;
}

#[tokio::test]
#[ignore = "requires a running database instance"]
async fn dropped_connection_is_reused_by_the_next_checkout() {
    let config = test_config().expect("SQL_HOST not set");
    let pool = Pool::new(config, PoolConfig::new().max_connections(2)).unwrap();

    let conn1 = pool.get().await.expect("failed to get connection 1");
    drop(conn1);
    assert_eq!(pool.status().available, 1);

    let _conn2 = pool.get().await.expect("failed to get connection 2");
    assert_eq!(pool.status().available, 0);
    assert_eq!(pool.status().in_use, 1);

    pool.close().await;
}

#[tokio::test]
#[ignore = "requires a running database instance"]
async fn acquisition_times_out_once_the_pool_is_saturated() {
    let config = test_config().expect("SQL_HOST not set");
    let pool_config = PoolConfig::new()
        .max_connections(1)
        .connection_timeout(Duration::from_millis(200));
    let pool = Pool::new(config, pool_config).unwrap();

    let held = pool.get().await.expect("failed to get first connection");
    let result = pool.get().await;
    assert!(result.is_err());
    drop(held);
}

#[tokio::test]
#[ignore = "requires a running database instance"]
async fn detach_removes_the_connection_from_the_pool() {
    let config = test_config().expect("SQL_HOST not set");
    let pool = Pool::new(config, PoolConfig::new().max_connections(3)).unwrap();

    let conn = pool.get().await.expect("failed to get connection");
    let mut raw = conn.detach();
    raw.query("SELECT 1", &[]).await.expect("query failed");

    // Detaching released the capacity permit but did not requeue a
    // connection for reuse.
    assert_eq!(pool.status().available, 0);
    raw.close().await.unwrap();
    pool.close().await;
}

#[tokio::test]
#[ignore = "requires a running database instance"]
async fn release_runs_the_configured_checkin_validation() {
    let config = test_config().expect("SQL_HOST not set");
    let pool_config = PoolConfig::new().max_connections(2).test_on_checkin(true);
    let pool = Pool::new(config, pool_config).unwrap();

    let conn = pool.get().await.expect("failed to get connection");
    conn.release().await;
    assert_eq!(pool.status().available, 1);

    pool.close().await;
}
