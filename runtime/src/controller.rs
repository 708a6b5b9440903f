//! Run controller: one pass of the pipeline behind a fatal boundary.

use crate::error::{JobError, Result};
use crate::metrics::{RUN_DURATION_SECONDS, histogram};
use crate::reminders::ReminderDispatcher;
use crate::transitions::TransitionEngine;
use booking_automation_core::environment::Clock;
use booking_automation_core::{RunLock, RunReport, TransitionCounts};
use chrono::{DateTime, Utc};
use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::task::JoinError;
use tracing::{error, info, warn};

/// How a pass that did not fail ended.
enum PassOutcome {
    Completed,
    Skipped,
}

/// Entry point for one scheduled invocation.
///
/// [`RunController::run`] captures `now` once, then runs Phase A, Phase B
/// and the reminder phase in a spawned task. A panic inside that task, or a
/// [`JobError`] returned from it, turns into `success = false`. Counts from
/// phases that finished before the failure are kept.
pub struct RunController {
    engine: Arc<TransitionEngine>,
    reminders: Arc<ReminderDispatcher>,
    clock: Arc<dyn Clock>,
    run_lock: Option<(Arc<dyn RunLock>, String)>,
}

impl RunController {
    /// Create a controller.
    #[must_use]
    pub fn new(
        engine: TransitionEngine,
        reminders: ReminderDispatcher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engine: Arc::new(engine),
            reminders: Arc::new(reminders),
            clock,
            run_lock: None,
        }
    }

    /// Skip the pass when another run holds `lock` for `job_name`.
    #[must_use]
    pub fn with_run_lock(mut self, lock: Arc<dyn RunLock>, job_name: impl Into<String>) -> Self {
        self.run_lock = Some((lock, job_name.into()));
        self
    }

    /// Execute exactly one pass and report its outcome.
    pub async fn run(&self) -> RunReport {
        let started = Instant::now();
        let now = self.clock.now();
        let counts = Arc::new(Mutex::new(TransitionCounts::default()));

        info!(now = %now, "Starting booking lifecycle pass");

        let pass = tokio::spawn(run_pass(
            Arc::clone(&self.engine),
            Arc::clone(&self.reminders),
            self.run_lock.clone(),
            now,
            Arc::clone(&counts),
        ));

        let outcome = pass
            .await
            .unwrap_or_else(|e| Err(JobError::Panicked(join_error_message(e))));

        let elapsed = started.elapsed();
        histogram!(RUN_DURATION_SECONDS).record(elapsed.as_secs_f64());
        let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let transitions = *lock_counts(&counts);

        let report = match outcome {
            Ok(PassOutcome::Completed) => RunReport {
                success: true,
                duration_ms,
                transitions,
                skipped: false,
            },
            Ok(PassOutcome::Skipped) => RunReport {
                success: true,
                duration_ms,
                transitions: TransitionCounts::default(),
                skipped: true,
            },
            Err(e) => {
                error!(error = %e, "Booking lifecycle pass failed");
                RunReport {
                    success: false,
                    duration_ms,
                    transitions,
                    skipped: false,
                }
            }
        };

        info!(
            success = report.success,
            skipped = report.skipped,
            duration_ms = report.duration_ms,
            confirmed_to_in_progress = report.transitions.confirmed_to_in_progress,
            in_progress_to_completed = report.transitions.in_progress_to_completed,
            reminders_sent = report.transitions.reminders_sent,
            "Booking lifecycle pass finished"
        );

        report
    }
}

async fn run_pass(
    engine: Arc<TransitionEngine>,
    reminders: Arc<ReminderDispatcher>,
    run_lock: Option<(Arc<dyn RunLock>, String)>,
    now: DateTime<Utc>,
    counts: Arc<Mutex<TransitionCounts>>,
) -> Result<PassOutcome> {
    if let Some((lock, job_name)) = &run_lock {
        let acquired = lock
            .try_acquire(job_name)
            .await
            .map_err(|e| JobError::Lock(e.to_string()))?;
        if !acquired {
            info!(job = %job_name, "Another run holds the run lock, skipping pass");
            return Ok(PassOutcome::Skipped);
        }
    }

    let started = engine.start_due_bookings(now).await;
    lock_counts(&counts).confirmed_to_in_progress = started;

    let completed = engine.complete_ended_bookings(now).await;
    lock_counts(&counts).in_progress_to_completed = completed;

    let reminded = reminders.dispatch(now).await;
    lock_counts(&counts).reminders_sent = reminded;

    if let Some((lock, job_name)) = &run_lock {
        if let Err(e) = lock.release(job_name).await {
            warn!(job = %job_name, error = %e, "Failed to release run lock");
        }
    }

    Ok(PassOutcome::Completed)
}

fn lock_counts(counts: &Mutex<TransitionCounts>) -> MutexGuard<'_, TransitionCounts> {
    counts.lock().unwrap_or_else(PoisonError::into_inner)
}

fn join_error_message(error: JoinError) -> String {
    if error.is_panic() {
        panic_message(error.into_panic().as_ref())
    } else {
        error.to_string()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
