//! One-hour reminder dispatch.

use crate::metrics::{REMINDERS_TOTAL, counter};
use booking_automation_core::{BookingId, BookingStore, NotificationError, NotificationSender};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Default budget for one notification send.
pub const DEFAULT_NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends the one-hour reminder for confirmed bookings starting in
/// `[now + 1h, now + 2h)` that have not been reminded yet.
///
/// After every send has been attempted, the whole selected batch is stamped
/// `reminder_1h_sent = now`, including bookings whose send failed. A failed
/// send is therefore never retried.
#[derive(Clone)]
pub struct ReminderDispatcher {
    store: Arc<dyn BookingStore>,
    sender: Arc<dyn NotificationSender>,
    timeout: Duration,
}

impl ReminderDispatcher {
    /// Create a dispatcher.
    #[must_use]
    pub fn new(store: Arc<dyn BookingStore>, sender: Arc<dyn NotificationSender>) -> Self {
        Self {
            store,
            sender,
            timeout: DEFAULT_NOTIFICATION_TIMEOUT,
        }
    }

    /// Budget for each send.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the reminder phase. Returns the number of bookings selected.
    #[tracing::instrument(skip(self), fields(phase = "reminders"))]
    pub async fn dispatch(&self, now: DateTime<Utc>) -> u64 {
        let window_start = now + ChronoDuration::hours(1);
        let window_end = now + ChronoDuration::hours(2);

        let candidates = match self
            .store
            .select_reminder_candidates(window_start, window_end)
            .await
        {
            Ok(bookings) => bookings,
            Err(e) => {
                error!(error = %e, "Failed to select reminder candidates");
                return 0;
            }
        };

        if candidates.is_empty() {
            debug!("No bookings need a reminder");
            return 0;
        }

        let mut failed = 0_usize;
        for booking in &candidates {
            let sent = tokio::time::timeout(self.timeout, self.sender.send(booking.summary()))
                .await
                .unwrap_or(Err(NotificationError::Timeout(self.timeout)));

            match sent {
                Ok(()) => {
                    counter!(REMINDERS_TOTAL, "outcome" => "sent").increment(1);
                    debug!(booking_id = %booking.id, "Reminder sent");
                }
                Err(e) => {
                    failed += 1;
                    counter!(REMINDERS_TOTAL, "outcome" => "failed").increment(1);
                    warn!(booking_id = %booking.id, error = %e, "Reminder send failed");
                }
            }
        }

        let ids: Vec<BookingId> = candidates.iter().map(|b| b.id).collect();
        match self.store.mark_reminders_sent(&ids, now).await {
            Ok(stamped) => debug!(stamped = ?stamped, "Reminder markers stamped"),
            Err(e) => error!(error = %e, count = ids.len(), "Failed to stamp reminder markers"),
        }

        info!(count = ids.len(), failed, "Dispatched reminders");
        ids.len() as u64
    }
}
