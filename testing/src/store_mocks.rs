//! In-memory booking store testing utilities
//!
//! [`InMemoryBookingStore`] keeps bookings in insertion order behind an
//! `RwLock` and applies the same guards the `PostgreSQL` store does, so
//! engine tests exercise real selection and write semantics. Failures can be
//! injected per operation kind or per booking.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use booking_automation_core::store::{Result, StoreFuture};
use booking_automation_core::{
    Booking, BookingId, BookingStatus, BookingStore, BookingUpdate, StoreError,
};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

#[derive(Debug, Default)]
struct Failures {
    selects: AtomicBool,
    bulk_updates: AtomicBool,
    reminder_stamps: AtomicBool,
    single_updates: RwLock<HashSet<BookingId>>,
}

/// In-memory booking store for fast, deterministic testing.
///
/// # Example
///
/// ```
/// use booking_automation_testing::{BookingBuilder, InMemoryBookingStore, test_clock};
/// use booking_automation_core::{environment::Clock, BookingStatus, BookingStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let now = test_clock().now();
/// let store = InMemoryBookingStore::new();
/// store.insert(BookingBuilder::confirmed(now).build());
///
/// let due = store
///     .select_by_status_scheduled_before(BookingStatus::Confirmed, now)
///     .await?;
/// assert_eq!(due.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryBookingStore {
    bookings: Arc<RwLock<Vec<Booking>>>,
    failures: Arc<Failures>,
    reports_affected_rows: Arc<AtomicBool>,
}

impl InMemoryBookingStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self {
            bookings: Arc::new(RwLock::new(Vec::new())),
            failures: Arc::new(Failures::default()),
            reports_affected_rows: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Create a store pre-populated with `bookings`
    #[must_use]
    pub fn with_bookings(bookings: impl IntoIterator<Item = Booking>) -> Self {
        let store = Self::new();
        for booking in bookings {
            store.insert(booking);
        }
        store
    }

    /// Insert or replace a booking
    pub fn insert(&self, booking: Booking) {
        let mut bookings = self.bookings.write().unwrap();
        if let Some(existing) = bookings.iter_mut().find(|b| b.id == booking.id) {
            *existing = booking;
        } else {
            bookings.push(booking);
        }
    }

    /// Get a booking by id
    #[must_use]
    pub fn get(&self, id: BookingId) -> Option<Booking> {
        self.bookings.read().unwrap().iter().find(|b| b.id == id).cloned()
    }

    /// Snapshot of every booking, in insertion order
    #[must_use]
    pub fn all(&self) -> Vec<Booking> {
        self.bookings.read().unwrap().clone()
    }

    /// Number of stored bookings
    #[must_use]
    pub fn len(&self) -> usize {
        self.bookings.read().unwrap().len()
    }

    /// Check if the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bookings.read().unwrap().is_empty()
    }

    /// Apply `f` to a stored booking, as an external writer would.
    ///
    /// Returns `false` if no booking has that id.
    pub fn modify(&self, id: BookingId, f: impl FnOnce(&mut Booking)) -> bool {
        let mut bookings = self.bookings.write().unwrap();
        bookings.iter_mut().find(|b| b.id == id).map(f).is_some()
    }

    /// Make every select fail
    pub fn fail_selects(&self, fail: bool) {
        self.failures.selects.store(fail, Ordering::SeqCst);
    }

    /// Make `bulk_update_status` fail
    pub fn fail_bulk_updates(&self, fail: bool) {
        self.failures.bulk_updates.store(fail, Ordering::SeqCst);
    }

    /// Make `mark_reminders_sent` fail
    pub fn fail_reminder_stamps(&self, fail: bool) {
        self.failures.reminder_stamps.store(fail, Ordering::SeqCst);
    }

    /// Make `update_booking` fail for `id`
    pub fn fail_updates_for(&self, id: BookingId) {
        self.failures.single_updates.write().unwrap().insert(id);
    }

    /// Simulate a backend that cannot report affected-row counts
    pub fn report_affected_rows(&self, report: bool) {
        self.reports_affected_rows.store(report, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, op: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::Database(format!("injected {op} failure")))
        } else {
            Ok(())
        }
    }

    fn affected(&self, n: u64) -> Option<u64> {
        self.reports_affected_rows
            .load(Ordering::SeqCst)
            .then_some(n)
    }

    fn select_where(&self, predicate: impl Fn(&Booking) -> bool) -> Result<Vec<Booking>> {
        Self::check(&self.failures.selects, "select")?;
        Ok(self
            .bookings
            .read()
            .unwrap()
            .iter()
            .filter(|b| predicate(b))
            .cloned()
            .collect())
    }
}

impl Default for InMemoryBookingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingStore for InMemoryBookingStore {
    fn select_by_status_scheduled_before(
        &self,
        status: BookingStatus,
        upper_bound: DateTime<Utc>,
    ) -> StoreFuture<'_, Vec<Booking>> {
        let result = self.select_where(|b| b.status == status && b.scheduled_at <= upper_bound);
        Box::pin(async move { result })
    }

    fn select_by_status(&self, status: BookingStatus) -> StoreFuture<'_, Vec<Booking>> {
        let result = self.select_where(|b| b.status == status);
        Box::pin(async move { result })
    }

    fn select_reminder_candidates(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> StoreFuture<'_, Vec<Booking>> {
        let result = self.select_where(|b| {
            b.status == BookingStatus::Confirmed
                && b.scheduled_at >= window_start
                && b.scheduled_at < window_end
                && b.reminder_1h_sent.is_none()
        });
        Box::pin(async move { result })
    }

    fn bulk_update_status(
        &self,
        ids: &[BookingId],
        from: BookingStatus,
        to: BookingStatus,
        updated_at: DateTime<Utc>,
    ) -> StoreFuture<'_, Option<u64>> {
        let ids: HashSet<BookingId> = ids.iter().copied().collect();
        let result = Self::check(&self.failures.bulk_updates, "bulk update").map(|()| {
            let mut affected = 0;
            for booking in self.bookings.write().unwrap().iter_mut() {
                if ids.contains(&booking.id) && booking.status == from {
                    booking.status = to;
                    booking.updated_at = updated_at;
                    affected += 1;
                }
            }
            self.affected(affected)
        });
        Box::pin(async move { result })
    }

    fn mark_reminders_sent(
        &self,
        ids: &[BookingId],
        sent_at: DateTime<Utc>,
    ) -> StoreFuture<'_, Option<u64>> {
        let ids: HashSet<BookingId> = ids.iter().copied().collect();
        let result = Self::check(&self.failures.reminder_stamps, "reminder stamp").map(|()| {
            let mut affected = 0;
            for booking in self.bookings.write().unwrap().iter_mut() {
                if ids.contains(&booking.id) && booking.reminder_1h_sent.is_none() {
                    booking.reminder_1h_sent = Some(sent_at);
                    booking.updated_at = sent_at;
                    affected += 1;
                }
            }
            self.affected(affected)
        });
        Box::pin(async move { result })
    }

    fn update_booking(&self, id: BookingId, update: BookingUpdate) -> StoreFuture<'_, bool> {
        let result = if self.failures.single_updates.read().unwrap().contains(&id) {
            Err(StoreError::Database(format!("injected update failure for {id}")))
        } else {
            let expected = update.expected_status;
            let require_missing_link = update.require_missing_link;
            let mut bookings = self.bookings.write().unwrap();
            Ok(bookings
                .iter_mut()
                .find(|b| b.id == id)
                .filter(|b| expected.is_none_or(|s| b.status == s))
                .filter(|b| !require_missing_link || b.needs_meeting_link())
                .map(|b| apply(b, update))
                .is_some())
        };
        Box::pin(async move { result })
    }
}

fn apply(booking: &mut Booking, update: BookingUpdate) {
    if let Some(status) = update.status {
        booking.status = status;
    }
    if let Some(completed_at) = update.completed_at {
        booking.completed_at = Some(completed_at);
    }
    if let Some(auto) = update.auto_status_updated {
        booking.auto_status_updated = auto;
    }
    if let Some(notes) = update.completion_notes {
        booking.completion_notes = Some(notes);
    }
    if let Some(link) = update.meeting_link {
        booking.meeting_link = Some(link);
    }
    booking.updated_at = update.updated_at;
}
