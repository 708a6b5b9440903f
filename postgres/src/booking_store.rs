//! `PostgreSQL` booking store.
//!
//! Reads and writes the `bookings` table. The table itself is owned by the
//! application that creates bookings; this store never migrates it.

use booking_automation_core::store::{Result, StoreFuture};
use booking_automation_core::{
    Booking, BookingId, BookingStatus, BookingStore, BookingUpdate, StoreError,
};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use uuid::Uuid;

type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>;

const BOOKING_COLUMNS: &str = "id, customer_id, provider_id, status, scheduled_at, \
     duration_minutes, is_online, meeting_link, completed_at, auto_status_updated, \
     completion_notes, settlement_tx_ref, reminder_1h_sent, updated_at";

/// `PostgreSQL`-backed [`BookingStore`].
///
/// # Example
///
/// ```no_run
/// use booking_automation_postgres::PostgresBookingStore;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = PostgresBookingStore::connect(
///     "postgres://localhost/bookings",
///     5,
///     Duration::from_secs(10),
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct PostgresBookingStore {
    pool: PgPool,
}

impl PostgresBookingStore {
    /// Connect a new pool.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the pool cannot connect.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(connect_timeout)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to connect: {e}")))?;

        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch(&self, query: PgQuery<'_>, op: &'static str) -> Result<Vec<Booking>> {
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error(op, &e))?;

        rows.iter().map(row_to_booking).collect()
    }
}

fn db_error(op: &'static str, error: &sqlx::Error) -> StoreError {
    metrics::counter!("booking_automation_store_errors_total", "op" => op).increment(1);
    StoreError::Database(format!("{op}: {error}"))
}

fn to_uuids(ids: &[BookingId]) -> Vec<Uuid> {
    ids.iter().map(|id| *id.as_uuid()).collect()
}

/// Convert a database row to a [`Booking`].
fn row_to_booking(row: &PgRow) -> Result<Booking> {
    let get = |e: sqlx::Error| StoreError::InvalidRow(e.to_string());

    let status: String = row.try_get("status").map_err(get)?;
    let status = status
        .parse::<BookingStatus>()
        .map_err(|e| StoreError::InvalidRow(e.to_string()))?;

    // Negative durations are clamped so end_time never precedes scheduled_at
    let duration: i32 = row.try_get("duration_minutes").map_err(get)?;

    Ok(Booking {
        id: BookingId::from_uuid(row.try_get("id").map_err(get)?),
        customer_id: row.try_get("customer_id").map_err(get)?,
        provider_id: row.try_get("provider_id").map_err(get)?,
        status,
        scheduled_at: row.try_get("scheduled_at").map_err(get)?,
        duration_minutes: u32::try_from(duration).unwrap_or(0),
        is_online: row.try_get("is_online").map_err(get)?,
        meeting_link: row.try_get("meeting_link").map_err(get)?,
        completed_at: row.try_get("completed_at").map_err(get)?,
        auto_status_updated: row.try_get("auto_status_updated").map_err(get)?,
        completion_notes: row.try_get("completion_notes").map_err(get)?,
        settlement_tx_ref: row.try_get("settlement_tx_ref").map_err(get)?,
        reminder_1h_sent: row.try_get("reminder_1h_sent").map_err(get)?,
        updated_at: row.try_get("updated_at").map_err(get)?,
    })
}

impl BookingStore for PostgresBookingStore {
    fn select_by_status_scheduled_before(
        &self,
        status: BookingStatus,
        upper_bound: DateTime<Utc>,
    ) -> StoreFuture<'_, Vec<Booking>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings
                 WHERE status = $1 AND scheduled_at <= $2
                 ORDER BY scheduled_at ASC, id ASC"
            );
            self.fetch(
                sqlx::query(&sql).bind(status.as_str()).bind(upper_bound),
                "select_by_status_scheduled_before",
            )
            .await
        })
    }

    fn select_by_status(&self, status: BookingStatus) -> StoreFuture<'_, Vec<Booking>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings
                 WHERE status = $1
                 ORDER BY scheduled_at ASC, id ASC"
            );
            self.fetch(sqlx::query(&sql).bind(status.as_str()), "select_by_status")
                .await
        })
    }

    fn select_reminder_candidates(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> StoreFuture<'_, Vec<Booking>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings
                 WHERE status = $1
                   AND scheduled_at >= $2
                   AND scheduled_at < $3
                   AND reminder_1h_sent IS NULL
                 ORDER BY scheduled_at ASC, id ASC"
            );
            self.fetch(
                sqlx::query(&sql)
                    .bind(BookingStatus::Confirmed.as_str())
                    .bind(window_start)
                    .bind(window_end),
                "select_reminder_candidates",
            )
            .await
        })
    }

    fn bulk_update_status(
        &self,
        ids: &[BookingId],
        from: BookingStatus,
        to: BookingStatus,
        updated_at: DateTime<Utc>,
    ) -> StoreFuture<'_, Option<u64>> {
        let ids = to_uuids(ids);
        Box::pin(async move {
            let result = sqlx::query(
                r"
                UPDATE bookings
                SET status = $1, updated_at = $2
                WHERE id = ANY($3) AND status = $4
                ",
            )
            .bind(to.as_str())
            .bind(updated_at)
            .bind(&ids)
            .bind(from.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("bulk_update_status", &e))?;

            tracing::debug!(
                from = from.as_str(),
                to = to.as_str(),
                requested = ids.len(),
                affected = result.rows_affected(),
                "Bulk status update applied"
            );

            Ok(Some(result.rows_affected()))
        })
    }

    fn mark_reminders_sent(
        &self,
        ids: &[BookingId],
        sent_at: DateTime<Utc>,
    ) -> StoreFuture<'_, Option<u64>> {
        let ids = to_uuids(ids);
        Box::pin(async move {
            let result = sqlx::query(
                r"
                UPDATE bookings
                SET reminder_1h_sent = $1, updated_at = $1
                WHERE id = ANY($2) AND reminder_1h_sent IS NULL
                ",
            )
            .bind(sent_at)
            .bind(&ids)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("mark_reminders_sent", &e))?;

            Ok(Some(result.rows_affected()))
        })
    }

    fn update_booking(&self, id: BookingId, update: BookingUpdate) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query(
                r"
                UPDATE bookings
                SET status = COALESCE($2, status),
                    completed_at = COALESCE($3, completed_at),
                    auto_status_updated = COALESCE($4, auto_status_updated),
                    completion_notes = COALESCE($5, completion_notes),
                    meeting_link = COALESCE($6, meeting_link),
                    updated_at = $7
                WHERE id = $1
                  AND ($8::text IS NULL OR status = $8)
                  AND (NOT $9 OR meeting_link IS NULL OR meeting_link = '')
                ",
            )
            .bind(id.as_uuid())
            .bind(update.status.map(|s| s.as_str()))
            .bind(update.completed_at)
            .bind(update.auto_status_updated)
            .bind(update.completion_notes.as_deref())
            .bind(update.meeting_link.as_deref())
            .bind(update.updated_at)
            .bind(update.expected_status.map(|s| s.as_str()))
            .bind(update.require_missing_link)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("update_booking", &e))?;

            Ok(result.rows_affected() > 0)
        })
    }
}
