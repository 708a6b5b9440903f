//! # Booking Automation Testing
//!
//! Testing utilities for the booking lifecycle automation job.
//!
//! This crate provides:
//! - A fixed clock for deterministic passes
//! - An in-memory [`BookingStore`](booking_automation_core::BookingStore)
//!   with failure injection
//! - Scripted settlement, meeting-link and notification collaborators
//! - A [`BookingBuilder`] for readable fixtures
//!
//! ## Example
//!
//! ```ignore
//! use booking_automation_testing::{test_clock, BookingBuilder, InMemoryBookingStore};
//!
//! let clock = test_clock();
//! let store = InMemoryBookingStore::new();
//! store.insert(BookingBuilder::confirmed(clock.now() - minutes(1)).build());
//! ```

use booking_automation_core::environment::Clock;
use chrono::{DateTime, Utc};

pub mod builders;
pub mod collaborator_mocks;
pub mod store_mocks;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use booking_automation_testing::mocks::FixedClock;
    /// use booking_automation_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 12:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T12:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

// Re-export commonly used items
pub use builders::{BookingBuilder, minutes};
pub use collaborator_mocks::{
    MockMeetingLinkProvisioner, MockSettlementClient, ProvisionBehavior,
    RecordingNotificationSender, SettlementBehavior,
};
pub use mocks::{FixedClock, test_clock};
pub use store_mocks::InMemoryBookingStore;
