//! Connection pooling example.
//!
//! This example demonstrates creating a pool, checking connections in and
//! out, and watching pool status change under concurrent load.
//!
//! # Running
//!
//! ```bash
//! export SQL_ENGINE=tds   # or postgres / mysql
//! export SQL_HOST=localhost
//! export SQL_USER=sa
//! export SQL_PASSWORD=YourStrong@Passw0rd
//!
//! cargo run --example connection_pool
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

use sql_client::{Config, Engine, TlsPolicy};
use sql_pool::{Pool, PoolConfig, PoolError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let engine = match std::env::var("SQL_ENGINE").as_deref() {
        Ok("postgres") => Engine::Postgres,
        Ok("mysql") => Engine::MySql,
        _ => Engine::Tds,
    };
    let host = std::env::var("SQL_HOST").unwrap_or_else(|_| "localhost".into());
    let user = std::env::var("SQL_USER").unwrap_or_else(|_| "sa".into());
    let password = std::env::var("SQL_PASSWORD").unwrap_or_else(|_| "Password123!".into());

    let connection_config = Config::new(engine)
        .host(host)
        .credentials(user, password)
        .tls(TlsPolicy::Prefer)
        .trust_server_certificate(true);

    println!("=== Connection Pool Example ({engine:?}) ===\n");

    let pool_config = PoolConfig::new()
        .min_connections(2)
        .max_connections(10)
        .connection_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(300))
        .sp_reset_connection(true);

    println!("Pool configuration:");
    println!("  Min connections: {}", pool_config.min_connections);
    println!("  Max connections: {}", pool_config.max_connections);
    println!("  Idle timeout: {:?}", pool_config.idle_timeout);
    println!();

    let pool = Arc::new(Pool::new(connection_config, pool_config)?);
    pool.warm_up().await?;

    println!("Pool warmed up.\n");
    print_pool_status(&pool);

    println!("\n1. Basic pool usage:");
    {
        let mut conn = pool.get().await?;
        let version_query = match conn.engine() {
            Engine::Tds => "SELECT @@VERSION AS v",
            Engine::Postgres => "SELECT version() AS v",
            Engine::MySql => "SELECT VERSION() AS v",
        };
        let batch = conn.query(version_query, &[]).await?;
        let version: String = batch.rows()[0].try_get_by_name("v")?;
        println!("  Connected to: {}...", &version[..50.min(version.len())]);
        // Connection is automatically returned to the pool when `conn` drops.
    }

    println!("\n2. Concurrent pool usage (10 parallel queries):");
    let start = Instant::now();
    let mut handles = vec![];

    for i in 0..10 {
        let pool = Arc::clone(&pool);
        handles.push(tokio::spawn(async move {
            let mut conn = pool.get().await?;
            conn.execute("SELECT 1", &[]).await?;
            Ok::<_, PoolError>(i)
        }));
    }

    let mut completed = 0;
    for handle in handles {
        if handle.await?.is_ok() {
            completed += 1;
        }
    }
    println!("  Completed {completed} queries in {:?}", start.elapsed());

    println!("\n3. Pool status after load:");
    print_pool_status(&pool);

    println!("\n4. Graceful shutdown:");
    pool.close().await;
    println!("  Pool closed: {}", pool.is_closed());

    Ok(())
}

fn print_pool_status(pool: &Pool) {
    let status = pool.status();
    let utilization = if status.max == 0 {
        0.0
    } else {
        100.0 * f64::from(status.in_use) / f64::from(status.max)
    };
    println!(
        "  Status: {}/{} in use, {} idle ({:.1}% utilization)",
        status.in_use, status.max, status.available, utilization
    );
}
