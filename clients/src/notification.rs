//! Console notification sender.

use booking_automation_core::{BookingSummary, NotificationError, NotificationSender};
use std::future::Future;
use std::pin::Pin;
use tracing::info;

/// Notification sender that logs reminders instead of delivering them.
///
/// Stands in for the real delivery channel, which lives outside this job.
#[derive(Clone, Debug, Default)]
pub struct ConsoleNotificationSender;

impl ConsoleNotificationSender {
    /// Create a new console sender.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl NotificationSender for ConsoleNotificationSender {
    fn send(
        &self,
        summary: BookingSummary,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotificationError>> + Send + '_>> {
        Box::pin(async move {
            info!(
                booking_id = %summary.id,
                customer_id = %summary.customer_id,
                provider_id = %summary.provider_id,
                scheduled_at = %summary.scheduled_at,
                duration_minutes = summary.duration_minutes,
                is_online = summary.is_online,
                meeting_link = summary.meeting_link.as_deref().unwrap_or(""),
                "📧 1h reminder (console delivery)"
            );
            Ok(())
        })
    }
}
