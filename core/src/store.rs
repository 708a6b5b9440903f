//! Booking store abstraction.
//!
//! The store is a typed gateway to booking rows: reads and guarded writes,
//! no business rules. The automation job decides *what* to change; the store
//! only applies it.
//!
//! # Implementations
//!
//! - `PostgresBookingStore` (in `booking-automation-postgres`): production
//! - `InMemoryBookingStore` (in `booking-automation-testing`): fast, deterministic tests
//!
//! # Dyn Compatibility
//!
//! Methods return `Pin<Box<dyn Future>>` instead of using `async fn` so the
//! store can be shared as `Arc<dyn BookingStore>` across the engine, the
//! reminder dispatcher and spawned provisioning tasks.

use crate::booking::{Booking, BookingId, BookingStatus, BookingUpdate};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during booking store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Connection, query or statement failure.
    #[error("Database error: {0}")]
    Database(String),

    /// A row could not be mapped into a [`Booking`].
    #[error("Invalid booking row: {0}")]
    InvalidRow(String),
}

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Boxed future returned by store methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Typed access to booking records.
///
/// All timestamps are supplied by the caller; implementations never read the
/// wall clock, so one pass of the job sees a single consistent `now`.
pub trait BookingStore: Send + Sync {
    /// Bookings with `status` whose `scheduled_at <= upper_bound`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn select_by_status_scheduled_before(
        &self,
        status: BookingStatus,
        upper_bound: DateTime<Utc>,
    ) -> StoreFuture<'_, Vec<Booking>>;

    /// All bookings with `status`, in a stable order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn select_by_status(&self, status: BookingStatus) -> StoreFuture<'_, Vec<Booking>>;

    /// Confirmed bookings with `scheduled_at` in `[window_start, window_end)`
    /// and no reminder stamp.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn select_reminder_candidates(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> StoreFuture<'_, Vec<Booking>>;

    /// Moves every row in `ids` that is still in `from` to `to`, stamping
    /// `updated_at`.
    ///
    /// Returns the number of affected rows, or `None` if the backend cannot
    /// report it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    fn bulk_update_status(
        &self,
        ids: &[BookingId],
        from: BookingStatus,
        to: BookingStatus,
        updated_at: DateTime<Utc>,
    ) -> StoreFuture<'_, Option<u64>>;

    /// Stamps `reminder_1h_sent = sent_at` on every row in `ids` that has no
    /// stamp yet. Existing stamps are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    fn mark_reminders_sent(
        &self,
        ids: &[BookingId],
        sent_at: DateTime<Utc>,
    ) -> StoreFuture<'_, Option<u64>>;

    /// Applies a single-row update.
    ///
    /// Returns `true` if the row matched the update's guards and was written,
    /// `false` if no row matched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    fn update_booking(&self, id: BookingId, update: BookingUpdate) -> StoreFuture<'_, bool>;
}
