//! State transition engine.
//!
//! Two time-based phases, both evaluated against the single `now` of the
//! pass:
//!
//! - **Phase A** moves confirmed bookings whose start has passed to
//!   `in_progress` in one guarded bulk update, then backfills missing
//!   meeting links for the online ones.
//! - **Phase B** completes in-progress bookings whose end has passed, one at
//!   a time, through the settlement service with a direct fallback write.
//!
//! Store and collaborator failures never escape a phase. They are logged and
//! the phase reports what it actually achieved; anything left behind is
//! re-selected on the next pass.

use crate::metrics::{PHASE_COMPLETE, PHASE_START, SETTLEMENT_TOTAL, TRANSITIONS_TOTAL, counter};
use booking_automation_core::{
    Booking, BookingId, BookingStatus, BookingStore, BookingUpdate, MeetingLinkProvisioner,
    NOTES_SETTLEMENT_FAILED, NOTES_SETTLEMENT_REJECTED, ProvisionError, SettlementClient,
    SettlementError,
};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Default budget for one settlement call.
pub const DEFAULT_SETTLEMENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default budget for one meeting-link call.
pub const DEFAULT_MEETING_LINK_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of trying to complete one ended booking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The settlement service completed the booking
    Settled {
        /// Transaction reference reported by the service
        tx_ref: Option<String>,
    },
    /// The service refused; the fallback write completed the booking
    FallbackRejected,
    /// The call failed or timed out; the fallback write completed the booking
    FallbackFailed,
    /// The fallback write found the booking no longer `in_progress` and
    /// changed nothing
    NoLongerInProgress,
    /// The fallback write failed; the booking stays `in_progress`
    WriteFailed,
}

impl CompletionOutcome {
    /// Whether this attempt moved the booking to completed, and so counts in
    /// the run report.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(
            self,
            Self::Settled { .. } | Self::FallbackRejected | Self::FallbackFailed
        )
    }

    /// Metric label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Settled { .. } => "settled",
            Self::FallbackRejected => "fallback_rejected",
            Self::FallbackFailed => "fallback_failed",
            Self::NoLongerInProgress => "no_longer_in_progress",
            Self::WriteFailed => "write_failed",
        }
    }
}

/// Runs Phase A and Phase B against injected collaborators.
///
/// # Example
///
/// ```no_run
/// use booking_automation_runtime::TransitionEngine;
/// # use booking_automation_core::{BookingStore, SettlementClient};
/// # use std::sync::Arc;
/// # async fn example(store: Arc<dyn BookingStore>, settlement: Arc<dyn SettlementClient>) {
/// let engine = TransitionEngine::new(store, settlement);
/// let now = chrono::Utc::now();
/// let started = engine.start_due_bookings(now).await;
/// let completed = engine.complete_ended_bookings(now).await;
/// # let _ = (started, completed);
/// # }
/// ```
#[derive(Clone)]
pub struct TransitionEngine {
    store: Arc<dyn BookingStore>,
    settlement: Arc<dyn SettlementClient>,
    provisioner: Option<Arc<dyn MeetingLinkProvisioner>>,
    settlement_timeout: Duration,
    meeting_link_timeout: Duration,
}

impl TransitionEngine {
    /// Create an engine without meeting-link backfill.
    #[must_use]
    pub fn new(store: Arc<dyn BookingStore>, settlement: Arc<dyn SettlementClient>) -> Self {
        Self {
            store,
            settlement,
            provisioner: None,
            settlement_timeout: DEFAULT_SETTLEMENT_TIMEOUT,
            meeting_link_timeout: DEFAULT_MEETING_LINK_TIMEOUT,
        }
    }

    /// Enable meeting-link backfill in Phase A.
    #[must_use]
    pub fn with_provisioner(mut self, provisioner: Arc<dyn MeetingLinkProvisioner>) -> Self {
        self.provisioner = Some(provisioner);
        self
    }

    /// Budget for each settlement call.
    #[must_use]
    pub const fn with_settlement_timeout(mut self, timeout: Duration) -> Self {
        self.settlement_timeout = timeout;
        self
    }

    /// Budget for each meeting-link call.
    #[must_use]
    pub const fn with_meeting_link_timeout(mut self, timeout: Duration) -> Self {
        self.meeting_link_timeout = timeout;
        self
    }

    /// Phase A: confirmed bookings with `scheduled_at <= now` become
    /// `in_progress`.
    ///
    /// Returns the number of rows moved. When the store cannot report
    /// affected rows the candidate count is used instead.
    #[tracing::instrument(skip(self), fields(phase = PHASE_START))]
    pub async fn start_due_bookings(&self, now: DateTime<Utc>) -> u64 {
        let due = match self
            .store
            .select_by_status_scheduled_before(BookingStatus::Confirmed, now)
            .await
        {
            Ok(bookings) => bookings,
            Err(e) => {
                error!(error = %e, "Failed to select due confirmed bookings");
                return 0;
            }
        };

        if due.is_empty() {
            debug!("No confirmed bookings are due");
            return 0;
        }

        let ids: Vec<BookingId> = due.iter().map(|b| b.id).collect();
        let started = match self
            .store
            .bulk_update_status(&ids, BookingStatus::Confirmed, BookingStatus::InProgress, now)
            .await
        {
            Ok(Some(affected)) => affected,
            Ok(None) => ids.len() as u64,
            Err(e) => {
                error!(error = %e, candidates = ids.len(), "Failed to start due bookings");
                0
            }
        };

        counter!(TRANSITIONS_TOTAL, "phase" => PHASE_START).increment(started);
        info!(count = started, candidates = ids.len(), "Started due bookings");

        self.backfill_meeting_links(&due, now).await;

        started
    }

    /// Ask the provisioner for a link for every online booking in `bookings`
    /// that lacks one. Each call runs in its own task; all are joined before
    /// returning. Outcomes are only logged.
    async fn backfill_meeting_links(&self, bookings: &[Booking], now: DateTime<Utc>) {
        let Some(provisioner) = &self.provisioner else {
            return;
        };

        let tasks: Vec<_> = bookings
            .iter()
            .filter(|b| b.needs_meeting_link())
            .map(|b| {
                let booking_id = b.id;
                tokio::spawn(provision_link(
                    Arc::clone(&self.store),
                    Arc::clone(provisioner),
                    booking_id,
                    now,
                    self.meeting_link_timeout,
                ))
            })
            .collect();

        if tasks.is_empty() {
            return;
        }

        debug!(count = tasks.len(), "Backfilling meeting links");
        for result in join_all(tasks).await {
            if let Err(e) = result {
                warn!(error = %e, "Meeting link task did not finish");
            }
        }
    }

    /// Phase B: `in_progress` bookings whose end time is `<= now` become
    /// completed.
    ///
    /// Bookings are attempted sequentially in load order. Returns the number
    /// of bookings whose outcome [`CompletionOutcome::is_completed`].
    #[tracing::instrument(skip(self), fields(phase = PHASE_COMPLETE))]
    pub async fn complete_ended_bookings(&self, now: DateTime<Utc>) -> u64 {
        let in_progress = match self.store.select_by_status(BookingStatus::InProgress).await {
            Ok(bookings) => bookings,
            Err(e) => {
                error!(error = %e, "Failed to select in-progress bookings");
                return 0;
            }
        };

        let mut seen = HashSet::new();
        let ended: Vec<BookingId> = in_progress
            .iter()
            .filter(|b| b.has_ended(now))
            .map(|b| b.id)
            .filter(|id| seen.insert(*id))
            .collect();

        if ended.is_empty() {
            debug!(in_progress = in_progress.len(), "No in-progress bookings have ended");
            return 0;
        }

        let mut completed = 0;
        for booking_id in ended.iter().copied() {
            if self.complete_booking(booking_id, now).await.is_completed() {
                completed += 1;
            }
        }

        counter!(TRANSITIONS_TOTAL, "phase" => PHASE_COMPLETE).increment(completed);
        info!(count = completed, candidates = ended.len(), "Completed ended bookings");

        completed
    }

    /// Complete one booking: settlement first, fallback write otherwise.
    #[tracing::instrument(skip_all, fields(booking_id = %booking_id))]
    pub async fn complete_booking(
        &self,
        booking_id: BookingId,
        now: DateTime<Utc>,
    ) -> CompletionOutcome {
        let response = tokio::time::timeout(
            self.settlement_timeout,
            self.settlement.complete_booking(booking_id),
        )
        .await
        .unwrap_or(Err(SettlementError::Timeout(self.settlement_timeout)));

        let fallback = match response {
            Ok(receipt) if receipt.ok => {
                info!(tx_ref = receipt.tx_ref.as_deref().unwrap_or(""), "Booking settled");
                let outcome = CompletionOutcome::Settled {
                    tx_ref: receipt.tx_ref,
                };
                counter!(SETTLEMENT_TOTAL, "outcome" => outcome.as_str()).increment(1);
                return outcome;
            }
            Ok(_) => {
                warn!("Settlement service rejected completion, falling back");
                CompletionOutcome::FallbackRejected
            }
            Err(e) => {
                warn!(error = %e, "Settlement call failed, falling back");
                CompletionOutcome::FallbackFailed
            }
        };

        let notes = if fallback == CompletionOutcome::FallbackRejected {
            NOTES_SETTLEMENT_REJECTED
        } else {
            NOTES_SETTLEMENT_FAILED
        };

        let outcome = match self
            .store
            .update_booking(booking_id, BookingUpdate::fallback_completion(notes, now))
            .await
        {
            Ok(true) => {
                info!(notes, "Booking completed by fallback");
                fallback
            }
            Ok(false) => {
                info!("Booking already left in_progress, nothing to write");
                CompletionOutcome::NoLongerInProgress
            }
            Err(e) => {
                error!(error = %e, "Fallback completion failed, booking stays in_progress");
                CompletionOutcome::WriteFailed
            }
        };

        counter!(SETTLEMENT_TOTAL, "outcome" => outcome.as_str()).increment(1);
        outcome
    }
}

async fn provision_link(
    store: Arc<dyn BookingStore>,
    provisioner: Arc<dyn MeetingLinkProvisioner>,
    booking_id: BookingId,
    now: DateTime<Utc>,
    timeout: Duration,
) {
    let generated = tokio::time::timeout(timeout, provisioner.generate_link(booking_id))
        .await
        .unwrap_or(Err(ProvisionError::Timeout(timeout)));

    let link = match generated {
        Ok(Some(link)) => link,
        Ok(None) => {
            warn!(booking_id = %booking_id, "Provider returned no meeting link");
            return;
        }
        Err(e) => {
            warn!(booking_id = %booking_id, error = %e, "Meeting link generation failed");
            return;
        }
    };

    match store
        .update_booking(booking_id, BookingUpdate::meeting_link(link, now))
        .await
    {
        Ok(true) => info!(booking_id = %booking_id, "Meeting link stored"),
        Ok(false) => debug!(booking_id = %booking_id, "Booking already has a meeting link"),
        Err(e) => warn!(booking_id = %booking_id, error = %e, "Failed to store meeting link"),
    }
}
