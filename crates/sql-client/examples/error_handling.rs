//! Error classification and retry example.
//!
//! `Error::is_transient()` tells you whether retrying the same statement is
//! worth attempting; `Error::is_connection_fatal()` tells you whether the
//! connection itself needs replacing first. This example wires both into a
//! small retry loop driven by the connection's own [`RetryPolicy`].
//!
//! # Running
//!
//! ```bash
//! export SQL_HOST=localhost
//! export SQL_USER=sa
//! export SQL_PASSWORD='YourStrong@Passw0rd'
//! cargo run --example error_handling
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

use sql_client::{Config, Engine, Error, ResultBatch, RetryPolicy, SqlConnection, TlsPolicy};

async fn query_with_retry(
    conn: &mut SqlConnection,
    sql: &str,
    retry: &RetryPolicy,
) -> Result<ResultBatch, Error> {
    let mut attempt = 0;
    loop {
        match conn.query(sql, &[]).await {
            Ok(batch) => return Ok(batch),
            Err(err) if err.is_transient() && retry.should_retry(attempt) => {
                let backoff = retry.backoff_for_attempt(attempt);
                eprintln!("transient error ({err}), retrying in {backoff:?}");
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let host = std::env::var("SQL_HOST").unwrap_or_else(|_| "localhost".into());
    let user = std::env::var("SQL_USER").unwrap_or_else(|_| "sa".into());
    let password = std::env::var("SQL_PASSWORD").unwrap_or_else(|_| "Password123!".into());

    let config = Config::new(Engine::Tds)
        .host(&host)
        .credentials(&user, &password)
        .tls(TlsPolicy::Prefer)
        .trust_server_certificate(true);

    let mut conn = SqlConnection::connect(config).await?;
    let retry = RetryPolicy::new().max_retries(3);

    match query_with_retry(&mut conn, "SELECT 1 AS ok", &retry).await {
        Ok(batch) => println!("rows: {}", batch.rows().len()),
        Err(err) if err.is_connection_fatal() => {
            eprintln!("connection is no longer usable: {err}");
        }
        Err(err) => eprintln!("query failed: {err}"),
    }

    // Statement errors don't need a fresh connection; deliberately trigger
    // one to show the distinction from a connection-fatal error.
    match conn.query("SELECT * FROM no_such_table", &[]).await {
        Ok(_) => unreachable!("table doesn't exist"),
        Err(err) => {
            println!(
                "statement error: {err} (transient={}, connection_fatal={})",
                err.is_transient(),
                err.is_connection_fatal()
            );
        }
    }

    conn.close().await?;
    Ok(())
}
