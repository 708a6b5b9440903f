//! Whole-pass behavior: report, idempotence, fatal boundary and run lock.

#![allow(clippy::unwrap_used)]

use booking_automation_core::environment::Clock;
use booking_automation_core::store::StoreFuture;
use booking_automation_core::{
    Booking, BookingId, BookingStatus, BookingStore, BookingUpdate, RunLock, StoreError,
    TransitionCounts,
};
use booking_automation_runtime::{ReminderDispatcher, RunController, TransitionEngine};
use booking_automation_testing::{
    BookingBuilder, InMemoryBookingStore, MockSettlementClient, RecordingNotificationSender,
    SettlementBehavior, minutes, test_clock,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

fn now() -> DateTime<Utc> {
    test_clock().now()
}

fn controller(store: Arc<dyn BookingStore>, settlement: MockSettlementClient) -> RunController {
    RunController::new(
        TransitionEngine::new(Arc::clone(&store), Arc::new(settlement)),
        ReminderDispatcher::new(store, Arc::new(RecordingNotificationSender::new())),
        Arc::new(test_clock()),
    )
}

fn seeded_store() -> (InMemoryBookingStore, [Booking; 3]) {
    let starting = BookingBuilder::confirmed(now() - minutes(1)).build();
    let ending = BookingBuilder::in_progress(now() - minutes(61))
        .duration_minutes(60)
        .build();
    let upcoming = BookingBuilder::confirmed(now() + minutes(90)).build();
    let store =
        InMemoryBookingStore::with_bookings([starting.clone(), ending.clone(), upcoming.clone()]);
    (store, [starting, ending, upcoming])
}

/// Store whose in-progress query panics, after Phase A has run for real.
struct PanickingStore(InMemoryBookingStore);

impl BookingStore for PanickingStore {
    fn select_by_status_scheduled_before(
        &self,
        status: BookingStatus,
        upper_bound: DateTime<Utc>,
    ) -> StoreFuture<'_, Vec<Booking>> {
        self.0.select_by_status_scheduled_before(status, upper_bound)
    }

    #[allow(clippy::panic)]
    fn select_by_status(&self, _status: BookingStatus) -> StoreFuture<'_, Vec<Booking>> {
        panic!("connection pool corrupted")
    }

    fn select_reminder_candidates(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> StoreFuture<'_, Vec<Booking>> {
        self.0.select_reminder_candidates(window_start, window_end)
    }

    fn bulk_update_status(
        &self,
        ids: &[BookingId],
        from: BookingStatus,
        to: BookingStatus,
        updated_at: DateTime<Utc>,
    ) -> StoreFuture<'_, Option<u64>> {
        self.0.bulk_update_status(ids, from, to, updated_at)
    }

    fn mark_reminders_sent(
        &self,
        ids: &[BookingId],
        sent_at: DateTime<Utc>,
    ) -> StoreFuture<'_, Option<u64>> {
        self.0.mark_reminders_sent(ids, sent_at)
    }

    fn update_booking(&self, id: BookingId, update: BookingUpdate) -> StoreFuture<'_, bool> {
        self.0.update_booking(id, update)
    }
}

/// Run lock with a fixed answer.
#[derive(Default)]
struct FixedLock {
    held_elsewhere: bool,
    broken: bool,
    released: AtomicBool,
}

impl RunLock for FixedLock {
    fn try_acquire<'a>(&'a self, _job_name: &'a str) -> StoreFuture<'a, bool> {
        let result = if self.broken {
            Err(StoreError::Database("lock connection refused".to_string()))
        } else {
            Ok(!self.held_elsewhere)
        };
        Box::pin(async move { result })
    }

    fn release<'a>(&'a self, _job_name: &'a str) -> StoreFuture<'a, ()> {
        self.released.store(true, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }
}

#[tokio::test]
async fn full_pass_reports_every_phase() {
    let (store, [starting, ending, upcoming]) = seeded_store();
    let settlement =
        MockSettlementClient::new(SettlementBehavior::Settle).with_store(store.clone(), now());

    let report = controller(Arc::new(store.clone()), settlement).run().await;

    assert!(report.success);
    assert!(!report.skipped);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(
        report.transitions,
        TransitionCounts {
            confirmed_to_in_progress: 1,
            in_progress_to_completed: 1,
            reminders_sent: 1,
        }
    );
    assert_eq!(store.get(starting.id).unwrap().status, BookingStatus::InProgress);
    assert_eq!(store.get(ending.id).unwrap().status, BookingStatus::Completed);
    assert_eq!(store.get(upcoming.id).unwrap().reminder_1h_sent, Some(now()));
}

#[tokio::test]
async fn second_pass_with_same_clock_does_nothing() {
    let (store, _) = seeded_store();
    let settlement = MockSettlementClient::new(SettlementBehavior::Reject);
    let controller = controller(Arc::new(store.clone()), settlement.clone());

    let first = controller.run().await;
    let second = controller.run().await;

    assert!(first.success);
    assert!(second.success);
    assert_eq!(second.transitions, TransitionCounts::default());
    assert_eq!(settlement.calls().len(), 1);
}

#[tokio::test]
async fn phase_failures_are_not_fatal() {
    let (store, _) = seeded_store();
    store.fail_selects(true);

    let report = controller(
        Arc::new(store.clone()),
        MockSettlementClient::new(SettlementBehavior::Settle),
    )
    .run()
    .await;

    assert!(report.success);
    assert_eq!(report.transitions, TransitionCounts::default());
}

#[tokio::test]
async fn panic_in_pipeline_fails_the_run_and_keeps_finished_counts() {
    let (store, [starting, ..]) = seeded_store();

    let report = controller(
        Arc::new(PanickingStore(store.clone())),
        MockSettlementClient::new(SettlementBehavior::Settle),
    )
    .run()
    .await;

    assert!(!report.success);
    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.transitions.confirmed_to_in_progress, 1);
    assert_eq!(report.transitions.in_progress_to_completed, 0);
    assert_eq!(report.transitions.reminders_sent, 0);
    assert_eq!(store.get(starting.id).unwrap().status, BookingStatus::InProgress);
}

#[tokio::test]
async fn held_run_lock_skips_the_pass() {
    let (store, [starting, ..]) = seeded_store();
    let lock = Arc::new(FixedLock {
        held_elsewhere: true,
        ..FixedLock::default()
    });

    let report = controller(
        Arc::new(store.clone()),
        MockSettlementClient::new(SettlementBehavior::Settle),
    )
    .with_run_lock(lock.clone(), "booking-lifecycle")
    .run()
    .await;

    assert!(report.success);
    assert!(report.skipped);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.transitions, TransitionCounts::default());
    assert_eq!(store.get(starting.id).unwrap().status, BookingStatus::Confirmed);
    assert!(!lock.released.load(Ordering::SeqCst));
}

#[tokio::test]
async fn acquired_run_lock_is_released_after_the_pass() {
    let (store, _) = seeded_store();
    let lock = Arc::new(FixedLock::default());

    let report = controller(
        Arc::new(store.clone()),
        MockSettlementClient::new(SettlementBehavior::Reject),
    )
    .with_run_lock(lock.clone(), "booking-lifecycle")
    .run()
    .await;

    assert!(report.success);
    assert!(!report.skipped);
    assert_eq!(report.transitions.confirmed_to_in_progress, 1);
    assert!(lock.released.load(Ordering::SeqCst));
}

#[tokio::test]
async fn run_lock_error_is_fatal() {
    let (store, [starting, ..]) = seeded_store();
    let lock = Arc::new(FixedLock {
        broken: true,
        ..FixedLock::default()
    });

    let report = controller(
        Arc::new(store.clone()),
        MockSettlementClient::new(SettlementBehavior::Settle),
    )
    .with_run_lock(lock, "booking-lifecycle")
    .run()
    .await;

    assert!(!report.success);
    assert_eq!(report.exit_code(), 1);
    assert_eq!(store.get(starting.id).unwrap().status, BookingStatus::Confirmed);
}
