//! Phase A and Phase B against the in-memory store and scripted collaborators.

#![allow(clippy::unwrap_used)]

use booking_automation_core::environment::Clock;
use booking_automation_core::{
    BookingId, BookingStatus, NOTES_SETTLEMENT_FAILED, NOTES_SETTLEMENT_REJECTED,
    SettlementClient, SettlementError, SettlementReceipt,
};
use booking_automation_runtime::{CompletionOutcome, TransitionEngine};
use booking_automation_testing::{
    BookingBuilder, InMemoryBookingStore, MockMeetingLinkProvisioner, MockSettlementClient,
    ProvisionBehavior, SettlementBehavior, minutes, test_clock,
};
use chrono::{DateTime, Utc};
use proptest::prelude::*;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

fn now() -> DateTime<Utc> {
    test_clock().now()
}

fn engine(store: &InMemoryBookingStore, settlement: &MockSettlementClient) -> TransitionEngine {
    TransitionEngine::new(Arc::new(store.clone()), Arc::new(settlement.clone()))
}

fn settling(store: &InMemoryBookingStore) -> MockSettlementClient {
    MockSettlementClient::new(SettlementBehavior::Settle).with_store(store.clone(), now())
}

/// Cancels the booking in the store while the call is in flight, then
/// refuses to settle it.
struct CancellingSettlement {
    store: InMemoryBookingStore,
}

impl SettlementClient for CancellingSettlement {
    fn complete_booking(
        &self,
        booking_id: BookingId,
    ) -> Pin<Box<dyn Future<Output = Result<SettlementReceipt, SettlementError>> + Send + '_>> {
        Box::pin(async move {
            self.store
                .modify(booking_id, |b| b.status = BookingStatus::Cancelled);
            Ok(SettlementReceipt::rejected())
        })
    }
}

// Phase A

#[tokio::test]
async fn confirmed_booking_past_start_moves_to_in_progress() {
    let booking = BookingBuilder::confirmed(now() - minutes(1)).build();
    let store = InMemoryBookingStore::with_bookings([booking.clone()]);

    let started = engine(&store, &settling(&store)).start_due_bookings(now()).await;

    assert_eq!(started, 1);
    let stored = store.get(booking.id).unwrap();
    assert_eq!(stored.status, BookingStatus::InProgress);
    assert_eq!(stored.updated_at, now());
}

#[tokio::test]
async fn start_is_inclusive_of_now_and_ignores_future_bookings() {
    let at_now = BookingBuilder::confirmed(now()).build();
    let later = BookingBuilder::confirmed(now() + chrono::Duration::seconds(1)).build();
    let pending = BookingBuilder::new(BookingStatus::Pending, now() - minutes(30)).build();
    let store = InMemoryBookingStore::with_bookings([at_now.clone(), later.clone(), pending.clone()]);

    let started = engine(&store, &settling(&store)).start_due_bookings(now()).await;

    assert_eq!(started, 1);
    assert_eq!(store.get(at_now.id).unwrap().status, BookingStatus::InProgress);
    assert_eq!(store.get(later.id).unwrap().status, BookingStatus::Confirmed);
    assert_eq!(store.get(pending.id).unwrap().status, BookingStatus::Pending);
}

#[tokio::test]
async fn start_falls_back_to_candidate_count_without_affected_rows() {
    let store = InMemoryBookingStore::with_bookings([
        BookingBuilder::confirmed(now() - minutes(5)).build(),
        BookingBuilder::confirmed(now() - minutes(10)).build(),
    ]);
    store.report_affected_rows(false);

    let started = engine(&store, &settling(&store)).start_due_bookings(now()).await;

    assert_eq!(started, 2);
}

#[tokio::test]
async fn start_select_failure_yields_zero() {
    let booking = BookingBuilder::confirmed(now() - minutes(5)).build();
    let store = InMemoryBookingStore::with_bookings([booking.clone()]);
    store.fail_selects(true);

    let started = engine(&store, &settling(&store)).start_due_bookings(now()).await;

    assert_eq!(started, 0);
    assert_eq!(store.get(booking.id).unwrap().status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn start_update_failure_yields_zero_and_leaves_bookings() {
    let booking = BookingBuilder::confirmed(now() - minutes(5)).build();
    let store = InMemoryBookingStore::with_bookings([booking.clone()]);
    store.fail_bulk_updates(true);

    let started = engine(&store, &settling(&store)).start_due_bookings(now()).await;

    assert_eq!(started, 0);
    assert_eq!(store.get(booking.id).unwrap().status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn backfill_provisions_only_online_bookings_without_links() {
    let needs_link = BookingBuilder::confirmed(now() - minutes(1)).online().build();
    let blank_link = BookingBuilder::confirmed(now() - minutes(1))
        .online()
        .meeting_link("")
        .build();
    let has_link = BookingBuilder::confirmed(now() - minutes(1))
        .online()
        .meeting_link("https://meet.test/existing")
        .build();
    let in_person = BookingBuilder::confirmed(now() - minutes(1)).build();
    let store = InMemoryBookingStore::with_bookings([
        needs_link.clone(),
        blank_link.clone(),
        has_link.clone(),
        in_person.clone(),
    ]);
    let provisioner = MockMeetingLinkProvisioner::new(ProvisionBehavior::Generate);

    let started = engine(&store, &settling(&store))
        .with_provisioner(Arc::new(provisioner.clone()))
        .start_due_bookings(now())
        .await;

    assert_eq!(started, 4);
    let mut called = provisioner.calls();
    called.sort();
    let mut expected = vec![needs_link.id, blank_link.id];
    expected.sort();
    assert_eq!(called, expected);

    assert_eq!(
        store.get(needs_link.id).unwrap().meeting_link,
        Some(MockMeetingLinkProvisioner::link_for(needs_link.id))
    );
    assert_eq!(
        store.get(blank_link.id).unwrap().meeting_link,
        Some(MockMeetingLinkProvisioner::link_for(blank_link.id))
    );
    assert_eq!(
        store.get(has_link.id).unwrap().meeting_link.as_deref(),
        Some("https://meet.test/existing")
    );
}

#[tokio::test]
async fn backfill_failures_do_not_affect_status_or_count() {
    let failing = BookingBuilder::confirmed(now() - minutes(1)).online().build();
    let empty = BookingBuilder::confirmed(now() - minutes(1)).online().build();
    let slow = BookingBuilder::confirmed(now() - minutes(1)).online().build();
    let store =
        InMemoryBookingStore::with_bookings([failing.clone(), empty.clone(), slow.clone()]);
    let provisioner = MockMeetingLinkProvisioner::new(ProvisionBehavior::Generate)
        .script(failing.id, ProvisionBehavior::Fail)
        .script(empty.id, ProvisionBehavior::NoLink)
        .script(slow.id, ProvisionBehavior::Delay(Duration::from_secs(5)));

    let started = engine(&store, &settling(&store))
        .with_provisioner(Arc::new(provisioner))
        .with_meeting_link_timeout(Duration::from_millis(50))
        .start_due_bookings(now())
        .await;

    assert_eq!(started, 3);
    for id in [failing.id, empty.id, slow.id] {
        let stored = store.get(id).unwrap();
        assert_eq!(stored.status, BookingStatus::InProgress);
        assert_eq!(stored.meeting_link, None);
    }
}

#[tokio::test]
async fn backfill_runs_even_when_bulk_update_fails() {
    let booking = BookingBuilder::confirmed(now() - minutes(1)).online().build();
    let store = InMemoryBookingStore::with_bookings([booking.clone()]);
    store.fail_bulk_updates(true);
    let provisioner = MockMeetingLinkProvisioner::new(ProvisionBehavior::Generate);

    let started = engine(&store, &settling(&store))
        .with_provisioner(Arc::new(provisioner.clone()))
        .start_due_bookings(now())
        .await;

    assert_eq!(started, 0);
    assert_eq!(provisioner.calls(), vec![booking.id]);
    assert!(store.get(booking.id).unwrap().meeting_link.is_some());
}

// Phase B

#[tokio::test]
async fn ended_booking_is_completed_by_settlement() {
    let booking = BookingBuilder::in_progress(now() - minutes(61))
        .duration_minutes(60)
        .build();
    let store = InMemoryBookingStore::with_bookings([booking.clone()]);
    let settlement = settling(&store);

    let completed = engine(&store, &settlement).complete_ended_bookings(now()).await;

    assert_eq!(completed, 1);
    assert_eq!(settlement.calls(), vec![booking.id]);
    let stored = store.get(booking.id).unwrap();
    assert_eq!(stored.status, BookingStatus::Completed);
    assert_eq!(stored.completed_at, Some(now()));
    assert!(stored.settlement_tx_ref.is_some());
    assert!(!stored.auto_status_updated);
}

#[tokio::test]
async fn end_time_is_inclusive_and_running_sessions_are_left_alone() {
    let just_ended = BookingBuilder::in_progress(now() - minutes(60))
        .duration_minutes(60)
        .build();
    let running = BookingBuilder::in_progress(now() - minutes(59))
        .duration_minutes(60)
        .build();
    let store = InMemoryBookingStore::with_bookings([just_ended.clone(), running.clone()]);
    let settlement = settling(&store);

    let completed = engine(&store, &settlement).complete_ended_bookings(now()).await;

    assert_eq!(completed, 1);
    assert_eq!(settlement.calls(), vec![just_ended.id]);
    assert_eq!(store.get(running.id).unwrap().status, BookingStatus::InProgress);
}

#[tokio::test]
async fn rejected_settlement_falls_back_with_rejection_notes() {
    let booking = BookingBuilder::in_progress(now() - minutes(90)).build();
    let store = InMemoryBookingStore::with_bookings([booking.clone()]);
    let settlement = MockSettlementClient::new(SettlementBehavior::Reject);

    let completed = engine(&store, &settlement).complete_ended_bookings(now()).await;

    assert_eq!(completed, 1);
    let stored = store.get(booking.id).unwrap();
    assert_eq!(stored.status, BookingStatus::Completed);
    assert_eq!(stored.completed_at, Some(now()));
    assert_eq!(stored.updated_at, now());
    assert!(stored.auto_status_updated);
    assert_eq!(stored.completion_notes.as_deref(), Some(NOTES_SETTLEMENT_REJECTED));
    assert_eq!(stored.settlement_tx_ref, None);
}

#[tokio::test]
async fn failed_settlement_falls_back_with_failure_notes() {
    let booking = BookingBuilder::in_progress(now() - minutes(90)).build();
    let store = InMemoryBookingStore::with_bookings([booking.clone()]);
    let settlement =
        MockSettlementClient::new(SettlementBehavior::Fail("connection reset".to_string()));

    let completed = engine(&store, &settlement).complete_ended_bookings(now()).await;

    assert_eq!(completed, 1);
    let stored = store.get(booking.id).unwrap();
    assert!(stored.auto_status_updated);
    assert_eq!(stored.completion_notes.as_deref(), Some(NOTES_SETTLEMENT_FAILED));
}

#[tokio::test]
async fn settlement_timeout_falls_back_and_counts() {
    let booking = BookingBuilder::in_progress(now() - minutes(61))
        .duration_minutes(60)
        .build();
    let store = InMemoryBookingStore::with_bookings([booking.clone()]);
    let settlement = MockSettlementClient::new(SettlementBehavior::Delay(Duration::from_secs(5)))
        .with_store(store.clone(), now());

    let completed = engine(&store, &settlement)
        .with_settlement_timeout(Duration::from_millis(50))
        .complete_ended_bookings(now())
        .await;

    assert_eq!(completed, 1);
    let stored = store.get(booking.id).unwrap();
    assert_eq!(stored.status, BookingStatus::Completed);
    assert!(stored.auto_status_updated);
    assert_eq!(stored.completion_notes.as_deref(), Some(NOTES_SETTLEMENT_FAILED));
    assert_eq!(stored.settlement_tx_ref, None);
}

#[tokio::test]
async fn fallback_write_failure_leaves_booking_in_progress() {
    let broken = BookingBuilder::in_progress(now() - minutes(90)).build();
    let fine = BookingBuilder::in_progress(now() - minutes(90)).build();
    let store = InMemoryBookingStore::with_bookings([broken.clone(), fine.clone()]);
    store.fail_updates_for(broken.id);
    let settlement = MockSettlementClient::new(SettlementBehavior::Reject);

    let completed = engine(&store, &settlement).complete_ended_bookings(now()).await;

    assert_eq!(completed, 1);
    assert_eq!(settlement.calls(), vec![broken.id, fine.id]);
    assert_eq!(store.get(broken.id).unwrap().status, BookingStatus::InProgress);
    assert_eq!(store.get(fine.id).unwrap().status, BookingStatus::Completed);
}

#[tokio::test]
async fn settlement_calls_follow_load_order() {
    let bookings: Vec<_> = (0..4)
        .map(|i| BookingBuilder::in_progress(now() - minutes(120 + i)).build())
        .collect();
    let store = InMemoryBookingStore::with_bookings(bookings.clone());
    let settlement = MockSettlementClient::new(SettlementBehavior::Reject)
        .script(bookings[1].id, SettlementBehavior::Settle)
        .with_store(store.clone(), now());

    let completed = engine(&store, &settlement).complete_ended_bookings(now()).await;

    assert_eq!(completed, 4);
    let order: Vec<_> = bookings.iter().map(|b| b.id).collect();
    assert_eq!(settlement.calls(), order);
}

#[tokio::test]
async fn completion_select_failure_yields_zero() {
    let booking = BookingBuilder::in_progress(now() - minutes(90)).build();
    let store = InMemoryBookingStore::with_bookings([booking.clone()]);
    store.fail_selects(true);
    let settlement = settling(&store);

    let completed = engine(&store, &settlement).complete_ended_bookings(now()).await;

    assert_eq!(completed, 0);
    assert!(settlement.calls().is_empty());
}

#[tokio::test]
async fn fallback_does_not_touch_a_booking_that_left_in_progress() {
    let booking = BookingBuilder::new(BookingStatus::Completed, now() - minutes(90)).build();
    let store = InMemoryBookingStore::with_bookings([booking.clone()]);
    let settlement = MockSettlementClient::new(SettlementBehavior::Reject);

    let outcome = engine(&store, &settlement)
        .complete_booking(booking.id, now())
        .await;

    assert_eq!(outcome, CompletionOutcome::NoLongerInProgress);
    let stored = store.get(booking.id).unwrap();
    assert!(!stored.auto_status_updated);
    assert_eq!(stored.completion_notes, None);
}

#[tokio::test]
async fn booking_cancelled_mid_pass_is_not_counted_as_completed() {
    let cancelled = BookingBuilder::in_progress(now() - minutes(90)).build();
    let store = InMemoryBookingStore::with_bookings([cancelled.clone()]);
    let settlement = CancellingSettlement {
        store: store.clone(),
    };
    let engine = TransitionEngine::new(Arc::new(store.clone()), Arc::new(settlement));

    let completed = engine.complete_ended_bookings(now()).await;

    assert_eq!(completed, 0);
    let stored = store.get(cancelled.id).unwrap();
    assert_eq!(stored.status, BookingStatus::Cancelled);
    assert_eq!(stored.completed_at, None);
    assert_eq!(stored.completion_notes, None);
}

#[tokio::test]
async fn booking_completed_by_another_run_is_counted_once() {
    let booking = BookingBuilder::in_progress(now() - minutes(90)).build();
    let store = InMemoryBookingStore::with_bookings([booking.clone()]);
    let first = engine(&store, &MockSettlementClient::new(SettlementBehavior::Reject));

    let outcome = first.complete_booking(booking.id, now()).await;
    let repeated = first.complete_booking(booking.id, now()).await;

    assert_eq!(outcome, CompletionOutcome::FallbackRejected);
    assert_eq!(repeated, CompletionOutcome::NoLongerInProgress);
    assert!(!repeated.is_completed());
}

#[tokio::test]
async fn settled_outcome_carries_transaction_reference() {
    let booking = BookingBuilder::in_progress(now() - minutes(90)).build();
    let store = InMemoryBookingStore::with_bookings([booking.clone()]);

    let outcome = engine(&store, &settling(&store))
        .complete_booking(booking.id, now())
        .await;

    assert_eq!(
        outcome,
        CompletionOutcome::Settled {
            tx_ref: store.get(booking.id).unwrap().settlement_tx_ref,
        }
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn completes_exactly_the_ended_bookings(
        sessions in prop::collection::vec((0_i64..240, 0_u32..180), 1..8),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let bookings: Vec<_> = sessions
            .iter()
            .map(|(started_ago, duration)| {
                BookingBuilder::in_progress(now() - minutes(*started_ago))
                    .duration_minutes(*duration)
                    .build()
            })
            .collect();
        let store = InMemoryBookingStore::with_bookings(bookings.clone());
        let settlement = MockSettlementClient::new(SettlementBehavior::Reject);

        let completed = runtime.block_on(engine(&store, &settlement).complete_ended_bookings(now()));

        let ended = bookings.iter().filter(|b| b.has_ended(now())).count() as u64;
        prop_assert_eq!(completed, ended);
        for booking in &bookings {
            let stored = store.get(booking.id).unwrap();
            let expected = if booking.has_ended(now()) {
                BookingStatus::Completed
            } else {
                BookingStatus::InProgress
            };
            prop_assert_eq!(stored.status, expected);
        }
    }
}
