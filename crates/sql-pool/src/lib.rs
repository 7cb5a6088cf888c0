//! # sql-pool
//!
//! Connection pool for [`sql-client`](../sql_client/index.html), usable with
//! any of its three engines (TDS, PostgreSQL, MySQL/MariaDB) — a pool is
//! tied to whichever engine its [`sql_client::Config`] selects.
//!
//! Unlike a generic pool, this implementation understands the reset step
//! each engine needs before a connection goes back into rotation
//! (`sp_reset_connection` on TDS) and will run a health-check query on
//! checkout and/or checkin.
//!
//! ## Features
//!
//! - Server-side reset on connection return (`sp_reset_connection`)
//! - Health checks via a configurable query, default `SELECT 1`
//! - Configurable min/max pool sizes
//! - Connection acquisition timeout, idle timeout, and max lifetime
//!
//! ## Example
//!
//! ```rust,ignore
//! use sql_pool::{Pool, PoolConfig};
//! use sql_client::{Config, Engine};
//! use std::time::Duration;
//!
//! let connection_config = Config::new(Engine::Postgres)
//!     .host("localhost")
//!     .credentials("app", "secret");
//! let pool_config = PoolConfig::new()
//!     .min_connections(5)
//!     .max_connections(20)
//!     .idle_timeout(Duration::from_secs(300));
//!
//! let pool = Pool::new(connection_config, pool_config)?;
//! let mut conn = pool.get().await?;
//! conn.query("SELECT 1", &[]).await?;
//! // Connection automatically returned to pool on drop.
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod pool;

pub use config::PoolConfig;
pub use error::PoolError;
pub use lifecycle::{ConnectionLifecycle, ConnectionMetadata, ConnectionState, DynConnectionLifecycle};
pub use pool::{Pool, PoolStatus, PooledConnection};
