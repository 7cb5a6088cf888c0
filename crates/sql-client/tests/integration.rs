//! Live-server integration tests, one section per engine. All ignored by
//! default; run against a real instance with:
//!
//! ```bash
//! export SQL_TDS_HOST=localhost SQL_TDS_USER=sa SQL_TDS_PASSWORD='YourStrong@Passw0rd'
//! export SQL_PG_HOST=localhost SQL_PG_USER=postgres SQL_PG_PASSWORD=postgres
//! export SQL_MYSQL_HOST=localhost SQL_MYSQL_USER=root SQL_MYSQL_PASSWORD=root
//! cargo test -p sql-client --test integration -- --ignored
//! ```
//!
//! For CI, Docker images exist for all three:
//! ```bash
//! docker run -e 'ACCEPT_EULA=Y' -e 'SA_PASSWORD=YourStrong@Passw0rd' -p 1433:1433 \
//!     mcr.microsoft.com/mssql/server:2022-latest
//! docker run -e POSTGRES_PASSWORD=postgres -p 5432:5432 postgres:16
//! docker run -e MYSQL_ROOT_PASSWORD=root -p 3306:3306 mysql:8
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use sql_client::{Config, Engine, IsolationLevel, Params, SqlConnection, TlsPolicy};

fn config_for(engine: Engine, prefix: &str) -> Option<Config> {
    let host = std::env::var(format!("SQL_{prefix}_HOST")).ok()?;
    let user = std::env::var(format!("SQL_{prefix}_USER")).unwrap_or_else(|_| "sa".into());
    let password = std::env::var(format!("SQL_{prefix}_PASSWORD")).unwrap_or_default();

    Some(
        Config::new(engine)
            .host(host)
            .credentials(user, password)
            .tls(TlsPolicy::Disable)
            .trust_server_certificate(true),
    )
}

mod tds {
    use super::*;

    fn config() -> Option<Config> {
        config_for(Engine::Tds, "TDS")
    }

    #[tokio::test]
    #[ignore = "requires a running SQL Server instance"]
    async fn connects_and_closes() {
        let conn = SqlConnection::connect(config().expect("SQL_TDS_HOST not set")).await.unwrap();
        conn.close().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a running SQL Server instance"]
    async fn invalid_credentials_fail_authentication() {
        let mut config = config().expect("SQL_TDS_HOST not set");
        config.password = "definitely-wrong".into();
        let result = SqlConnection::connect(config).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    #[ignore = "requires a running SQL Server instance"]
    async fn query_with_parameters_round_trips() {
        let mut conn = SqlConnection::connect(config().expect("SQL_TDS_HOST not set"))
            .await
            .unwrap();
        let params = Params::new().bind(7i32).unwrap().bind("hello").unwrap();
        let batch = conn
            .query("SELECT @p1 AS n, @p2 AS s", params.as_slice())
            .await
            .unwrap();
        let row = &batch.rows()[0];
        assert_eq!(row.try_get_by_name::<i32>("n").unwrap(), 7);
        assert_eq!(row.try_get_by_name::<String>("s").unwrap(), "hello");
    }

    #[tokio::test]
    #[ignore = "requires a running SQL Server instance"]
    async fn query_json_reassembles_for_json_output() {
        let mut conn = SqlConnection::connect(config().expect("SQL_TDS_HOST not set"))
            .await
            .unwrap();
        let objects = conn
            .query_json(
                "SELECT 1 AS id, 'a' AS name UNION ALL SELECT 2, 'b' FOR JSON PATH",
                &[],
            )
            .await
            .unwrap();
        assert_eq!(objects.len(), 2);
        assert!(objects[0].contains(r#""id":1"#));
        assert!(objects[1].contains(r#""id":2"#));
    }

    #[tokio::test]
    #[ignore = "requires a running SQL Server instance"]
    async fn transaction_rollback_discards_changes() {
        let mut conn = SqlConnection::connect(config().expect("SQL_TDS_HOST not set"))
            .await
            .unwrap();
        conn.query("CREATE TABLE #rollback_test (id INT)", &[]).await.unwrap();
        conn.begin_transaction(IsolationLevel::ReadCommitted).await.unwrap();
        conn.execute("INSERT INTO #rollback_test VALUES (1)", &[]).await.unwrap();
        conn.rollback().await.unwrap();

        let batch = conn.query("SELECT COUNT(*) AS n FROM #rollback_test", &[]).await.unwrap();
        assert_eq!(batch.rows()[0].try_get_by_name::<i32>("n").unwrap(), 0);
    }
}

mod postgres {
    use super::*;

    fn config() -> Option<Config> {
        config_for(Engine::Postgres, "PG")
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn connects_and_closes() {
        let conn = SqlConnection::connect(config().expect("SQL_PG_HOST not set")).await.unwrap();
        conn.close().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn query_with_positional_parameters_round_trips() {
        let mut conn = SqlConnection::connect(config().expect("SQL_PG_HOST not set"))
            .await
            .unwrap();
        let params = Params::new().bind(7i32).unwrap().bind("hello").unwrap();
        let batch = conn
            .query("SELECT $1 AS n, $2 AS s", params.as_slice())
            .await
            .unwrap();
        let row = &batch.rows()[0];
        assert_eq!(row.try_get_by_name::<i32>("n").unwrap(), 7);
        assert_eq!(row.try_get_by_name::<String>("s").unwrap(), "hello");
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn committed_transaction_persists() {
        let mut conn = SqlConnection::connect(config().expect("SQL_PG_HOST not set"))
            .await
            .unwrap();
        conn.query("CREATE TEMP TABLE commit_test (id INT)", &[]).await.unwrap();
        conn.begin_transaction(IsolationLevel::ReadCommitted).await.unwrap();
        conn.execute("INSERT INTO commit_test VALUES (1)", &[]).await.unwrap();
        conn.commit().await.unwrap();

        let batch = conn.query("SELECT COUNT(*) AS n FROM commit_test", &[]).await.unwrap();
        assert_eq!(batch.rows()[0].try_get_by_name::<i64>("n").unwrap(), 1);
    }
}

mod mysql {
    use super::*;

    fn config() -> Option<Config> {
        config_for(Engine::MySql, "MYSQL")
    }

    #[tokio::test]
    #[ignore = "requires a running MySQL/MariaDB instance"]
    async fn connects_and_closes() {
        let conn = SqlConnection::connect(config().expect("SQL_MYSQL_HOST not set")).await.unwrap();
        conn.close().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a running MySQL/MariaDB instance"]
    async fn query_with_positional_placeholders_round_trips() {
        let mut conn = SqlConnection::connect(config().expect("SQL_MYSQL_HOST not set"))
            .await
            .unwrap();
        let params = Params::new().bind(7i32).unwrap().bind("hello").unwrap();
        let batch = conn
            .query("SELECT ? AS n, ? AS s", params.as_slice())
            .await
            .unwrap();
        let row = &batch.rows()[0];
        assert_eq!(row.try_get_by_name::<i32>("n").unwrap(), 7);
        assert_eq!(row.try_get_by_name::<String>("s").unwrap(), "hello");
    }

    #[tokio::test]
    #[ignore = "requires a running MySQL/MariaDB instance"]
    async fn start_transaction_rollback_discards_changes() {
        let mut conn = SqlConnection::connect(config().expect("SQL_MYSQL_HOST not set"))
            .await
            .unwrap();
        conn.query(
            "CREATE TEMPORARY TABLE rollback_test (id INT)",
            &[],
        )
        .await
        .unwrap();
        conn.begin_transaction(IsolationLevel::ReadCommitted).await.unwrap();
        conn.execute("INSERT INTO rollback_test VALUES (1)", &[]).await.unwrap();
        conn.rollback().await.unwrap();

        let batch = conn.query("SELECT COUNT(*) AS n FROM rollback_test", &[]).await.unwrap();
        assert_eq!(batch.rows()[0].try_get_by_name::<i64>("n").unwrap(), 0);
    }
}
