//! Builds the run controller from configuration.

use crate::config::JobConfig;
use booking_automation_clients::{
    ConsoleNotificationSender, HttpMeetingLinkProvisioner, HttpSettlementClient,
};
use booking_automation_core::BookingStore;
use booking_automation_core::environment::SystemClock;
use booking_automation_postgres::{PostgresBookingStore, PostgresRunLock};
use booking_automation_runtime::{
    JobError, ReminderDispatcher, Result, RunController, TransitionEngine,
};
use std::sync::Arc;
use tracing::info;

/// Connect the store and build every collaborator.
///
/// # Errors
///
/// Returns [`JobError::Store`] if the booking store is unreachable and
/// [`JobError::Config`] if an HTTP client cannot be built.
pub async fn build_controller(config: &JobConfig) -> Result<RunController> {
    let postgres = PostgresBookingStore::connect(
        &config.database.url,
        config.database.max_connections,
        config.database_connect_timeout(),
    )
    .await?;
    let pool = postgres.pool().clone();
    let store: Arc<dyn BookingStore> = Arc::new(postgres);

    let settlement = HttpSettlementClient::new(
        config.settlement.url.clone(),
        config.settlement.api_key.clone(),
        config.settlement_timeout(),
    )
    .map_err(|e| JobError::Config(e.to_string()))?;

    let mut engine = TransitionEngine::new(Arc::clone(&store), Arc::new(settlement))
        .with_settlement_timeout(config.settlement_timeout());

    if let Some(meeting) = &config.meeting_link {
        let provisioner =
            HttpMeetingLinkProvisioner::new(meeting.url.clone(), meeting.api_key.clone(), meeting.timeout())
                .map_err(|e| JobError::Config(e.to_string()))?;
        engine = engine
            .with_provisioner(Arc::new(provisioner))
            .with_meeting_link_timeout(meeting.timeout());
    } else {
        info!("MEETING_LINK_URL not set, meeting link backfill disabled");
    }

    let reminders = ReminderDispatcher::new(store, Arc::new(ConsoleNotificationSender::new()))
        .with_timeout(config.notification_timeout());

    let controller = RunController::new(engine, reminders, Arc::new(SystemClock));

    if config.advisory_lock {
        info!(job = %config.job_name, "Advisory run lock enabled");
        Ok(controller.with_run_lock(Arc::new(PostgresRunLock::new(pool)), config.job_name.clone()))
    } else {
        Ok(controller)
    }
}
