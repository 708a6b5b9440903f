//! Booking domain types.
//!
//! A [`Booking`] is owned by the booking store. This crate never creates or
//! cancels bookings; the automation job only moves them forward along
//! `confirmed → in_progress → completed` and stamps bookkeeping fields.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Completion notes written when the settlement service answered but refused
/// to complete the booking.
pub const NOTES_SETTLEMENT_REJECTED: &str =
    "Auto-completed: settlement service rejected completion (fallback)";

/// Completion notes written when the settlement call errored or timed out.
pub const NOTES_SETTLEMENT_FAILED: &str =
    "Auto-completed: settlement service unavailable (fallback)";

/// Unique identifier for a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(Uuid);

impl BookingId {
    /// Creates a new random `BookingId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `BookingId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a booking.
///
/// Stored as lowercase snake_case text. Automation only ever performs the
/// two forward transitions reported by [`BookingStatus::can_advance_to`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Requested, awaiting confirmation
    Pending,
    /// Confirmed, waiting for its start time
    Confirmed,
    /// Started, waiting for its end time
    InProgress,
    /// Finished
    Completed,
    /// Cancelled by either party
    Cancelled,
    /// Refunded after cancellation or dispute
    Refunded,
}

impl BookingStatus {
    /// Convert status to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    /// Whether the automation job may move a booking from `self` to `next`.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Confirmed, Self::InProgress) | (Self::InProgress, Self::Completed)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid booking status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for BookingStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// A booking record as read from the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Immutable identifier
    pub id: BookingId,
    /// Customer who made the booking
    pub customer_id: Uuid,
    /// Provider delivering the service
    pub provider_id: Uuid,
    /// Current lifecycle status
    pub status: BookingStatus,
    /// Start instant
    pub scheduled_at: DateTime<Utc>,
    /// Length of the session in minutes (never negative)
    pub duration_minutes: u32,
    /// Whether the session happens online
    pub is_online: bool,
    /// Meeting link for online sessions, if one was provisioned
    pub meeting_link: Option<String>,
    /// Set when the job (or the settlement service) completed the booking
    pub completed_at: Option<DateTime<Utc>>,
    /// True when completion was written by the job's fallback path
    pub auto_status_updated: bool,
    /// How the booking was completed
    pub completion_notes: Option<String>,
    /// Settlement transaction reference, written by the settlement service
    pub settlement_tx_ref: Option<String>,
    /// When the one-hour reminder was dispatched
    pub reminder_1h_sent: Option<DateTime<Utc>>,
    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Derived end of the session: `scheduled_at + duration_minutes`.
    #[must_use]
    pub fn end_time(&self) -> DateTime<Utc> {
        self.scheduled_at + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Whether the session has ended at `now` (inclusive).
    #[must_use]
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.end_time() <= now
    }

    /// Online booking still waiting for a meeting link.
    #[must_use]
    pub fn needs_meeting_link(&self) -> bool {
        self.is_online && self.meeting_link.as_deref().is_none_or(str::is_empty)
    }

    /// The subset of the booking handed to notification senders.
    #[must_use]
    pub fn summary(&self) -> BookingSummary {
        BookingSummary {
            id: self.id,
            customer_id: self.customer_id,
            provider_id: self.provider_id,
            scheduled_at: self.scheduled_at,
            duration_minutes: self.duration_minutes,
            is_online: self.is_online,
            meeting_link: self.meeting_link.clone(),
        }
    }
}

/// Reminder payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingSummary {
    /// Booking identifier
    pub id: BookingId,
    /// Customer to remind
    pub customer_id: Uuid,
    /// Provider to remind
    pub provider_id: Uuid,
    /// Start instant
    pub scheduled_at: DateTime<Utc>,
    /// Length in minutes
    pub duration_minutes: u32,
    /// Online session
    pub is_online: bool,
    /// Link to join, if any
    pub meeting_link: Option<String>,
}

/// Single-row mutation applied by [`crate::store::BookingStore::update_booking`].
///
/// Only `Some` fields are written. `updated_at` is always written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookingUpdate {
    /// Only apply the update if the row currently has this status
    pub expected_status: Option<BookingStatus>,
    /// Only apply the update if the row has no meeting link yet
    pub require_missing_link: bool,
    /// New status
    pub status: Option<BookingStatus>,
    /// Completion instant
    pub completed_at: Option<DateTime<Utc>>,
    /// Fallback completion marker
    pub auto_status_updated: Option<bool>,
    /// Completion notes
    pub completion_notes: Option<String>,
    /// Meeting link
    pub meeting_link: Option<String>,
    /// Mutation timestamp
    pub updated_at: DateTime<Utc>,
}

impl BookingUpdate {
    /// Fallback completion: marks an `in_progress` booking completed.
    #[must_use]
    pub fn fallback_completion(notes: &str, now: DateTime<Utc>) -> Self {
        Self {
            expected_status: Some(BookingStatus::InProgress),
            require_missing_link: false,
            status: Some(BookingStatus::Completed),
            completed_at: Some(now),
            auto_status_updated: Some(true),
            completion_notes: Some(notes.to_string()),
            meeting_link: None,
            updated_at: now,
        }
    }

    /// Stores a freshly provisioned meeting link, unless one already exists.
    #[must_use]
    pub const fn meeting_link(link: String, now: DateTime<Utc>) -> Self {
        Self {
            expected_status: None,
            require_missing_link: true,
            status: None,
            completed_at: None,
            auto_status_updated: None,
            completion_notes: None,
            meeting_link: Some(link),
            updated_at: now,
        }
    }
}
