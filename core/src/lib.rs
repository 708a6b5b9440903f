//! # Booking Automation Core
//!
//! Domain types and collaborator traits for the booking lifecycle automation
//! job.
//!
//! The job is a headless, externally scheduled pass that:
//!
//! - moves confirmed bookings whose start time has passed to `in_progress`
//! - completes in-progress bookings whose end time has passed, through the
//!   settlement service or, failing that, a direct fallback write
//! - backfills missing meeting links for online bookings
//! - dispatches one-hour reminders exactly once per booking
//!
//! ## Core Concepts
//!
//! - **Booking**: the store-owned record the job advances ([`booking`])
//! - **Collaborators**: store, settlement, meeting links, notifications,
//!   injected as trait objects ([`store`], [`settlement`], [`meeting_link`],
//!   [`notification`], [`lock`])
//! - **Clock**: the single source of `now` for a pass ([`environment`])
//! - **Report**: the structured outcome of a pass ([`report`])
//!
//! ## Architecture Principles
//!
//! - One immutable `now` per pass, passed explicitly
//! - Forward-only status transitions
//! - All durable state lives in the store; nothing is kept between runs
//! - Dependency injection via traits

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

pub mod booking;
pub mod lock;
pub mod meeting_link;
pub mod notification;
pub mod report;
pub mod settlement;
pub mod store;

pub use booking::{
    Booking, BookingId, BookingStatus, BookingSummary, BookingUpdate, NOTES_SETTLEMENT_FAILED,
    NOTES_SETTLEMENT_REJECTED,
};
pub use lock::RunLock;
pub use meeting_link::{MeetingLinkProvisioner, ProvisionError};
pub use notification::{NotificationError, NotificationSender};
pub use report::{RunReport, TransitionCounts};
pub use settlement::{SettlementClient, SettlementError, SettlementReceipt};
pub use store::{BookingStore, StoreError};

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected into
/// the runtime. The clock lives here because every phase of a pass depends
/// on it.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use booking_automation_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let _now = clock.now();
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
