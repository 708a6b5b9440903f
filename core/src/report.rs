//! Run report emitted once per pass.

use serde::{Deserialize, Serialize};

/// Per-phase transition counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionCounts {
    /// Bookings moved from confirmed to in_progress
    pub confirmed_to_in_progress: u64,
    /// Bookings completed (settlement or fallback)
    pub in_progress_to_completed: u64,
    /// Bookings selected for the one-hour reminder
    pub reminders_sent: u64,
}

/// Structured result of one pass.
///
/// Serializes as
/// `{"success":true,"duration_ms":12,"transitions":{"confirmedToInProgress":1,...}}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Whether the pipeline finished without a fatal error
    pub success: bool,
    /// Wall time of the pass in milliseconds
    pub duration_ms: u64,
    /// Counts per transition
    pub transitions: TransitionCounts,
    /// The pass was skipped because another run held the run lock
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
}

impl RunReport {
    /// Process exit code for this report: 0 on success, 1 otherwise.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        if self.success { 0 } else { 1 }
    }
}
