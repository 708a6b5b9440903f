//! Booking Lifecycle Automation Job
//!
//! Runs exactly one pass and exits. Meant to be triggered by an external
//! scheduler (cron, Kubernetes `CronJob`, ...) every few minutes.
//!
//! This binary:
//! - Loads configuration from the environment (and `.env`)
//! - Connects to the `PostgreSQL` booking store
//! - Starts due bookings, completes ended ones, sends one-hour reminders
//! - Prints the run report as one JSON line on stdout
//! - Exits 0 on success, 1 on any fatal failure (a panic included)
//!
//! # Metrics
//!
//! Counters and histograms are recorded through the `metrics` facade, but
//! this binary installs no recorder, so they are discarded when it runs on
//! its own. They only appear when a host embeds
//! `booking_automation_runtime` and installs its own recorder before
//! calling `register_job_metrics`.
//!
//! # Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/bookings \
//! SETTLEMENT_URL=https://settlement.internal \
//! cargo run --bin booking-automation
//! ```

use anyhow::Context;
use booking_automation_core::{RunReport, TransitionCounts};
use booking_automation_job::{JobConfig, build_controller, exit_code_of, wait_for_signal};
use booking_automation_runtime::register_job_metrics;
use std::io::Write;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,booking_automation=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    install_panic_hook();
    register_job_metrics();

    std::process::exit(exit_code_of(run_and_report()).await);
}

async fn run_and_report() -> i32 {
    let report = tokio::select! {
        report = run() => report,
        () = wait_for_signal() => {
            tracing::info!("Termination requested, abandoning pass");
            return 0;
        }
    };

    match serde_json::to_string(&report) {
        Ok(line) => {
            if let Err(e) = writeln!(std::io::stdout().lock(), "{line}") {
                tracing::error!(error = %e, "Failed to write run report");
            }
        }
        Err(e) => tracing::error!(error = %e, "Failed to serialize run report"),
    }

    report.exit_code()
}

async fn run() -> RunReport {
    let started = Instant::now();
    match try_run().await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Booking lifecycle job failed to start: {e:#}");
            RunReport {
                success: false,
                duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                transitions: TransitionCounts::default(),
                skipped: false,
            }
        }
    }
}

async fn try_run() -> anyhow::Result<RunReport> {
    let config = JobConfig::from_env().context("invalid configuration")?;
    tracing::info!(
        job = %config.job_name,
        settlement = %config.settlement.url,
        meeting_links = config.meeting_link.is_some(),
        advisory_lock = config.advisory_lock,
        "Configuration loaded"
    );

    let controller = build_controller(&config)
        .await
        .context("failed to initialize collaborators")?;

    Ok(controller.run().await)
}

/// Route panics through tracing before the default hook prints them.
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!(panic = %info, "Panic in booking lifecycle job");
        default_hook(info);
    }));
}
