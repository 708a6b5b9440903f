//! # Booking Automation Runtime
//!
//! Orchestration for one pass of the booking lifecycle job.
//!
//! ## Core Components
//!
//! - **TransitionEngine**: confirmed → `in_progress` (with meeting-link
//!   backfill) and `in_progress` → completed (settlement with fallback)
//! - **ReminderDispatcher**: one-hour reminders, stamped once per booking
//! - **RunController**: captures `now`, runs the phases behind a fatal
//!   boundary and produces the [`RunReport`](booking_automation_core::RunReport)
//!
//! ## Example
//!
//! ```no_run
//! use booking_automation_core::environment::SystemClock;
//! use booking_automation_runtime::{ReminderDispatcher, RunController, TransitionEngine};
//! # use booking_automation_core::{BookingStore, NotificationSender, SettlementClient};
//! # use std::sync::Arc;
//! # async fn example(
//! #     store: Arc<dyn BookingStore>,
//! #     settlement: Arc<dyn SettlementClient>,
//! #     sender: Arc<dyn NotificationSender>,
//! # ) {
//! let controller = RunController::new(
//!     TransitionEngine::new(Arc::clone(&store), settlement),
//!     ReminderDispatcher::new(store, sender),
//!     Arc::new(SystemClock),
//! );
//!
//! let report = controller.run().await;
//! std::process::exit(report.exit_code());
//! # }
//! ```

/// Run controller and fatal boundary
pub mod controller;

/// Metric names and descriptions
pub mod metrics;

/// One-hour reminder phase
pub mod reminders;

/// Phase A and Phase B
pub mod transitions;

/// Error types for a lifecycle pass
pub mod error {
    use booking_automation_core::StoreError;
    use thiserror::Error;

    /// Failures that end a pass with `success = false`.
    ///
    /// Phase-level store and collaborator errors are handled inside the
    /// phases and never become a `JobError`.
    #[derive(Error, Debug)]
    pub enum JobError {
        /// Configuration could not be loaded or applied
        #[error("Configuration error: {0}")]
        Config(String),

        /// The booking store could not be reached at all
        #[error("Store error: {0}")]
        Store(#[from] StoreError),

        /// The run lock could not be queried
        #[error("Run lock error: {0}")]
        Lock(String),

        /// The pipeline task panicked or was aborted
        #[error("Pipeline task panicked: {0}")]
        Panicked(String),
    }

    /// Result type for lifecycle passes
    pub type Result<T> = std::result::Result<T, JobError>;
}

pub use controller::RunController;
pub use error::{JobError, Result};
pub use metrics::register_job_metrics;
pub use reminders::ReminderDispatcher;
pub use transitions::{CompletionOutcome, TransitionEngine};
