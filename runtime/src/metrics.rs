//! Metric names and descriptions for the lifecycle job.
//!
//! The runtime records through the `metrics` facade:
//! - Transitions per phase
//! - Settlement outcomes
//! - Reminder sends
//! - Store failures
//! - Pass duration
//!
//! No exporter is installed here. A host that wants the numbers installs a
//! recorder before calling [`register_job_metrics`]; without one every
//! macro call is a no-op.

use metrics::{describe_counter, describe_histogram};

// Re-export metrics macros for use in other modules
pub use metrics::{counter, histogram};

/// Bookings moved by a phase, labelled `phase`.
pub const TRANSITIONS_TOTAL: &str = "booking_automation_transitions_total";

/// Completion attempts, labelled `outcome`.
pub const SETTLEMENT_TOTAL: &str = "booking_automation_settlement_total";

/// Reminder sends, labelled `outcome` (`sent` / `failed`).
pub const REMINDERS_TOTAL: &str = "booking_automation_reminders_total";

/// Booking store failures, labelled `op`. Recorded by the `PostgreSQL` store.
pub const STORE_ERRORS_TOTAL: &str = "booking_automation_store_errors_total";

/// Wall time of one pass.
pub const RUN_DURATION_SECONDS: &str = "booking_automation_run_duration_seconds";

/// Phase label for confirmed → `in_progress`.
pub const PHASE_START: &str = "confirmed_to_in_progress";

/// Phase label for `in_progress` → completed.
pub const PHASE_COMPLETE: &str = "in_progress_to_completed";

/// Register all metric descriptions.
///
/// Safe to call more than once.
pub fn register_job_metrics() {
    describe_counter!(
        TRANSITIONS_TOTAL,
        "Total number of bookings moved to the next status, by phase"
    );
    describe_counter!(
        SETTLEMENT_TOTAL,
        "Total number of completion attempts, by outcome"
    );
    describe_counter!(
        REMINDERS_TOTAL,
        "Total number of one-hour reminder sends, by outcome"
    );
    describe_counter!(
        STORE_ERRORS_TOTAL,
        "Total number of booking store failures, by operation"
    );
    describe_histogram!(
        RUN_DURATION_SECONDS,
        "Time taken by one lifecycle pass"
    );
}
