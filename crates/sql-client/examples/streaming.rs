//! Streaming a large result set through [`QueryStream`] instead of
//! collecting every row into a `Vec` up front.
//!
//! # Running
//!
//! ```bash
//! export SQL_HOST=localhost
//! export SQL_USER=sa
//! export SQL_PASSWORD='YourStrong@Passw0rd'
//! cargo run --example streaming
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

use futures_util::StreamExt;
use sql_client::{Config, Engine, Error, QueryStream, SqlConnection, TlsPolicy};

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

    let batch = conn
        .query(
            "SELECT TOP (1000) object_id, name FROM sys.all_objects",
            &[],
        )
        .await?;

    let columns = batch
        .rows()
        .first()
        .map(|row| row.columns().to_vec())
        .unwrap_or_default();
    let mut stream = QueryStream::new(columns, batch.rows().to_vec());

    let mut count = 0usize;
    while let Some(row) = stream.next().await {
        let row = row?;
        let name: String = row.try_get_by_name("name")?;
        if count < 5 {
            println!("{name}");
        }
        count += 1;
    }
    println!("streamed {count} rows total");

    conn.close().await?;
    Ok(())
}
