//! Advisory run lock.
//!
//! Session-level `pg_try_advisory_lock` keyed by `hashtext(job_name)`. The
//! lock belongs to the connection that took it, so the connection is held
//! until [`RunLock::release`]. Dropping a lock that is still held detaches
//! and closes its connection, which releases the lock server-side.

use booking_automation_core::store::StoreFuture;
use booking_automation_core::{RunLock, StoreError};
use sqlx::PgPool;
use sqlx::pool::PoolConnection;
use tokio::sync::Mutex;

/// `PostgreSQL` advisory lock implementing [`RunLock`].
#[derive(Debug)]
pub struct PostgresRunLock {
    pool: PgPool,
    held: Mutex<Option<PoolConnection<sqlx::Postgres>>>,
}

impl PostgresRunLock {
    /// Create a lock that draws its connection from `pool`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            held: Mutex::new(None),
        }
    }
}

impl Drop for PostgresRunLock {
    fn drop(&mut self) {
        if let Some(conn) = self.held.get_mut().take() {
            drop(conn.detach());
        }
    }
}

impl RunLock for PostgresRunLock {
    fn try_acquire<'a>(&'a self, job_name: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let mut held = self.held.lock().await;
            if held.is_some() {
                return Ok(true);
            }

            let mut conn = self
                .pool
                .acquire()
                .await
                .map_err(|e| StoreError::Database(format!("acquire lock connection: {e}")))?;

            let (acquired,): (bool,) =
                sqlx::query_as("SELECT pg_try_advisory_lock(hashtext($1)::bigint)")
                    .bind(job_name)
                    .fetch_one(&mut *conn)
                    .await
                    .map_err(|e| StoreError::Database(format!("pg_try_advisory_lock: {e}")))?;

            if acquired {
                tracing::debug!(job = job_name, "Advisory run lock acquired");
                *held = Some(conn);
            } else {
                tracing::info!(job = job_name, "Advisory run lock held by another run");
            }

            Ok(acquired)
        })
    }

    fn release<'a>(&'a self, job_name: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let Some(mut conn) = self.held.lock().await.take() else {
                return Ok(());
            };

            sqlx::query("SELECT pg_advisory_unlock(hashtext($1)::bigint)")
                .bind(job_name)
                .execute(&mut *conn)
                .await
                .map_err(|e| StoreError::Database(format!("pg_advisory_unlock: {e}")))?;

            tracing::debug!(job = job_name, "Advisory run lock released");
            Ok(())
        })
    }
}
