//! Transaction example: begin, run statements, commit or roll back.
//!
//! # Running
//!
//! ```bash
//! export SQL_HOST=localhost
//! export SQL_USER=sa
//! export SQL_PASSWORD='YourStrong@Passw0rd'
//! cargo run --example transactions
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

use sql_client::{Config, Engine, Error, IsolationLevel, Params, SqlConnection, TlsPolicy};

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

    conn.query("CREATE TABLE #widgets (id INT, name NVARCHAR(50))", &[])
        .await?;

    println!("Beginning a transaction...");
    conn.begin_transaction(IsolationLevel::ReadCommitted).await?;
    assert!(conn.in_transaction());

    let params = Params::new().bind(1i32)?.bind("gizmo")?;
    conn.execute(
        "INSERT INTO #widgets (id, name) VALUES (@p1, @p2)",
        params.as_slice(),
    )
    .await?;

    let batch = conn.query("SELECT COUNT(*) AS n FROM #widgets", &[]).await?;
    let count: i32 = batch.rows()[0].try_get_by_name("n")?;
    println!("rows inside transaction: {count}");

    if count == 1 {
        println!("Committing.");
        conn.commit().await?;
    } else {
        println!("Unexpected state, rolling back.");
        conn.rollback().await?;
    }

    assert!(!conn.in_transaction());
    conn.close().await?;
    Ok(())
}
