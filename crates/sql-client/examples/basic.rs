//! Basic connect-and-query example.
//!
//! Demonstrates the same three calls against whichever engine is selected
//! with `SQL_ENGINE` (`tds`, `postgres`, or `mysql`; defaults to `tds`).
//!
//! # Running
//!
//! ```bash
//! export SQL_HOST=localhost
//! export SQL_USER=sa
//! export SQL_PASSWORD='YourStrong@Passw0rd'
//! export SQL_ENGINE=tds
//! cargo run --example basic
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

use sql_client::{Config, Engine, Error, Params, SqlConnection, TlsPolicy};

fn engine_from_env() -> Engine {
    match std::env::var("SQL_ENGINE").unwrap_or_default().as_str() {
        "postgres" | "postgresql" => Engine::Postgres,
        "mysql" | "mariadb" => Engine::MySql,
        _ => Engine::Tds,
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let engine = engine_from_env();
    let host = std::env::var("SQL_HOST").unwrap_or_else(|_| "localhost".into());
    let user = std::env::var("SQL_USER").unwrap_or_else(|_| "sa".into());
    let password = std::env::var("SQL_PASSWORD").unwrap_or_else(|_| "Password123!".into());

    let config = Config::new(engine)
        .host(&host)
        .credentials(&user, &password)
        .tls(TlsPolicy::Prefer)
        .trust_server_certificate(true);

    println!("Connecting to {engine:?} at {host}...");
    let mut conn = SqlConnection::connect(config).await?;
    println!("Connected. Server version: {:?}", conn.server_version());

    let version_query = match engine {
        Engine::Tds => "SELECT @@VERSION AS version",
        Engine::Postgres => "SELECT version()",
        Engine::MySql => "SELECT VERSION()",
    };
    let batch = conn.query(version_query, &[]).await?;
    for row in batch.rows() {
        let version: String = row.try_get(0)?;
        println!("Version: {version}");
    }

    println!("\nRunning a parameterized query...");
    let params = Params::new().bind(42i32)?.bind("widget")?;
    let placeholder_query = match engine {
        Engine::Tds => "SELECT @p1 AS id, @p2 AS name",
        Engine::Postgres => "SELECT $1 AS id, $2 AS name",
        Engine::MySql => "SELECT ? AS id, ? AS name",
    };
    let batch = conn.query(placeholder_query, params.as_slice()).await?;
    for row in batch.rows() {
        let id: i32 = row.try_get_by_name("id")?;
        let name: String = row.try_get_by_name("name")?;
        println!("id={id}, name={name}");
    }

    conn.close().await?;
    println!("\nConnection closed.");
    Ok(())
}
