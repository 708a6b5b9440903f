//! Fixture builders.

use booking_automation_core::{Booking, BookingId, BookingStatus};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Shorthand for `chrono::Duration::minutes`.
#[must_use]
pub fn minutes(n: i64) -> Duration {
    Duration::minutes(n)
}

/// Builder for [`Booking`] fixtures.
///
/// Defaults: 60 minute in-person session, no reminder, no completion data,
/// `updated_at` one day before `scheduled_at`.
///
/// # Example
///
/// ```
/// use booking_automation_testing::{BookingBuilder, minutes, test_clock};
/// use booking_automation_core::{environment::Clock, BookingStatus};
///
/// let now = test_clock().now();
/// let booking = BookingBuilder::in_progress(now - minutes(61))
///     .duration_minutes(60)
///     .build();
/// assert_eq!(booking.status, BookingStatus::InProgress);
/// assert!(booking.has_ended(now));
/// ```
#[derive(Debug, Clone)]
pub struct BookingBuilder {
    booking: Booking,
}

impl BookingBuilder {
    /// Start a booking with the given status and start time.
    #[must_use]
    pub fn new(status: BookingStatus, scheduled_at: DateTime<Utc>) -> Self {
        Self {
            booking: Booking {
                id: BookingId::new(),
                customer_id: Uuid::new_v4(),
                provider_id: Uuid::new_v4(),
                status,
                scheduled_at,
                duration_minutes: 60,
                is_online: false,
                meeting_link: None,
                completed_at: None,
                auto_status_updated: false,
                completion_notes: None,
                settlement_tx_ref: None,
                reminder_1h_sent: None,
                updated_at: scheduled_at - Duration::days(1),
            },
        }
    }

    /// A confirmed booking.
    #[must_use]
    pub fn confirmed(scheduled_at: DateTime<Utc>) -> Self {
        Self::new(BookingStatus::Confirmed, scheduled_at)
    }

    /// An in-progress booking.
    #[must_use]
    pub fn in_progress(scheduled_at: DateTime<Utc>) -> Self {
        Self::new(BookingStatus::InProgress, scheduled_at)
    }

    /// Use a specific id.
    #[must_use]
    pub const fn id(mut self, id: BookingId) -> Self {
        self.booking.id = id;
        self
    }

    /// Session length.
    #[must_use]
    pub const fn duration_minutes(mut self, minutes: u32) -> Self {
        self.booking.duration_minutes = minutes;
        self
    }

    /// Online session without a link.
    #[must_use]
    pub fn online(mut self) -> Self {
        self.booking.is_online = true;
        self.booking.meeting_link = None;
        self
    }

    /// Existing meeting link.
    #[must_use]
    pub fn meeting_link(mut self, link: impl Into<String>) -> Self {
        self.booking.meeting_link = Some(link.into());
        self
    }

    /// Reminder already stamped.
    #[must_use]
    pub const fn reminder_sent_at(mut self, at: DateTime<Utc>) -> Self {
        self.booking.reminder_1h_sent = Some(at);
        self
    }

    /// Finish the booking.
    #[must_use]
    pub fn build(self) -> Booking {
        self.booking
    }
}
