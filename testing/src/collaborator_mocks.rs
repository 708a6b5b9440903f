//! Scripted settlement, meeting-link and notification collaborators.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)]

use crate::store_mocks::InMemoryBookingStore;
use booking_automation_core::{
    BookingId, BookingStatus, BookingSummary, MeetingLinkProvisioner, NotificationError,
    NotificationSender, ProvisionError, SettlementClient, SettlementError, SettlementReceipt,
};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How the mock settlement service answers for a booking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettlementBehavior {
    /// Completes the booking and returns a transaction reference
    Settle,
    /// Answers `ok = false`
    Reject,
    /// Returns a transport error
    Fail(String),
    /// Sleeps before settling, so callers' timeouts fire first
    Delay(Duration),
}

/// Mock settlement client with per-booking scripted answers.
///
/// When attached to an [`InMemoryBookingStore`], a `Settle` answer also
/// performs the settlement service's side effect: the booking becomes
/// `completed` with a transaction reference.
#[derive(Clone, Debug)]
pub struct MockSettlementClient {
    default: SettlementBehavior,
    scripted: Arc<Mutex<HashMap<BookingId, SettlementBehavior>>>,
    calls: Arc<Mutex<Vec<BookingId>>>,
    side_effect: Option<(InMemoryBookingStore, DateTime<Utc>)>,
}

impl MockSettlementClient {
    /// A client that answers every booking with `default`.
    #[must_use]
    pub fn new(default: SettlementBehavior) -> Self {
        Self {
            default,
            scripted: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            side_effect: None,
        }
    }

    /// Write settled completions into `store`, stamped `settled_at`.
    #[must_use]
    pub fn with_store(mut self, store: InMemoryBookingStore, settled_at: DateTime<Utc>) -> Self {
        self.side_effect = Some((store, settled_at));
        self
    }

    /// Override the answer for one booking.
    #[must_use]
    pub fn script(self, id: BookingId, behavior: SettlementBehavior) -> Self {
        self.scripted.lock().unwrap().insert(id, behavior);
        self
    }

    /// Booking ids in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<BookingId> {
        self.calls.lock().unwrap().clone()
    }

    fn behavior_for(&self, id: BookingId) -> SettlementBehavior {
        self.scripted
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }

    fn settle(&self, id: BookingId) -> SettlementReceipt {
        let tx_ref = format!("0xmock{}", id.as_uuid().simple());
        if let Some((store, settled_at)) = &self.side_effect {
            store.modify(id, |b| {
                b.status = BookingStatus::Completed;
                b.completed_at = Some(*settled_at);
                b.settlement_tx_ref = Some(tx_ref.clone());
                b.completion_notes = Some("Completed by settlement service".to_string());
                b.updated_at = *settled_at;
            });
        }
        SettlementReceipt::settled(tx_ref)
    }
}

impl SettlementClient for MockSettlementClient {
    fn complete_booking(
        &self,
        booking_id: BookingId,
    ) -> Pin<Box<dyn Future<Output = Result<SettlementReceipt, SettlementError>> + Send + '_>> {
        self.calls.lock().unwrap().push(booking_id);
        let behavior = self.behavior_for(booking_id);
        Box::pin(async move {
            match behavior {
                SettlementBehavior::Settle => Ok(self.settle(booking_id)),
                SettlementBehavior::Reject => Ok(SettlementReceipt::rejected()),
                SettlementBehavior::Fail(message) => Err(SettlementError::Request(message)),
                SettlementBehavior::Delay(delay) => {
                    tokio::time::sleep(delay).await;
                    Ok(self.settle(booking_id))
                }
            }
        })
    }
}

/// How the mock provisioner answers for a booking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProvisionBehavior {
    /// Returns `https://meet.test/<id>`
    Generate,
    /// Returns `Ok(None)`
    NoLink,
    /// Returns an error
    Fail,
    /// Sleeps before generating, so callers' timeouts fire first
    Delay(Duration),
}

/// Mock meeting-link provisioner.
#[derive(Clone, Debug)]
pub struct MockMeetingLinkProvisioner {
    default: ProvisionBehavior,
    scripted: Arc<Mutex<HashMap<BookingId, ProvisionBehavior>>>,
    calls: Arc<Mutex<Vec<BookingId>>>,
}

impl MockMeetingLinkProvisioner {
    /// A provisioner that answers every booking with `default`.
    #[must_use]
    pub fn new(default: ProvisionBehavior) -> Self {
        Self {
            default,
            scripted: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Override the answer for one booking.
    #[must_use]
    pub fn script(self, id: BookingId, behavior: ProvisionBehavior) -> Self {
        self.scripted.lock().unwrap().insert(id, behavior);
        self
    }

    /// Booking ids the provisioner was called for (completion order).
    #[must_use]
    pub fn calls(&self) -> Vec<BookingId> {
        self.calls.lock().unwrap().clone()
    }

    /// Link generated for `id`.
    #[must_use]
    pub fn link_for(id: BookingId) -> String {
        format!("https://meet.test/{id}")
    }
}

impl MeetingLinkProvisioner for MockMeetingLinkProvisioner {
    fn generate_link(
        &self,
        booking_id: BookingId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, ProvisionError>> + Send + '_>> {
        self.calls.lock().unwrap().push(booking_id);
        let behavior = self
            .scripted
            .lock()
            .unwrap()
            .get(&booking_id)
            .cloned()
            .unwrap_or_else(|| self.default.clone());
        Box::pin(async move {
            match behavior {
                ProvisionBehavior::Generate => Ok(Some(Self::link_for(booking_id))),
                ProvisionBehavior::NoLink => Ok(None),
                ProvisionBehavior::Fail => {
                    Err(ProvisionError::Request("mock provider unavailable".to_string()))
                }
                ProvisionBehavior::Delay(delay) => {
                    tokio::time::sleep(delay).await;
                    Ok(Some(Self::link_for(booking_id)))
                }
            }
        })
    }
}

/// Notification sender that records every attempt.
#[derive(Clone, Debug, Default)]
pub struct RecordingNotificationSender {
    attempts: Arc<Mutex<Vec<BookingSummary>>>,
    failing: Arc<Mutex<HashSet<BookingId>>>,
}

impl RecordingNotificationSender {
    /// A sender where every delivery succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make deliveries for `id` fail.
    #[must_use]
    pub fn failing_for(self, id: BookingId) -> Self {
        self.failing.lock().unwrap().insert(id);
        self
    }

    /// Every summary a send was attempted for, in order.
    #[must_use]
    pub fn attempts(&self) -> Vec<BookingSummary> {
        self.attempts.lock().unwrap().clone()
    }
}

impl NotificationSender for RecordingNotificationSender {
    fn send(
        &self,
        summary: BookingSummary,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotificationError>> + Send + '_>> {
        let fails = self.failing.lock().unwrap().contains(&summary.id);
        let id = summary.id;
        self.attempts.lock().unwrap().push(summary);
        Box::pin(async move {
            if fails {
                Err(NotificationError::Delivery(format!("mock delivery failed for {id}")))
            } else {
                Ok(())
            }
        })
    }
}
