//! Reminder notification abstraction.

use crate::booking::BookingSummary;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Delivery failures. Logged per booking; never stop the batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    /// The channel refused or failed the delivery.
    #[error("Notification delivery failed: {0}")]
    Delivery(String),

    /// The send did not finish within its budget.
    #[error("Notification timed out after {0:?}")]
    Timeout(Duration),
}

/// Sends the one-hour reminder for a booking.
///
/// This trait abstracts over delivery channels (email, push, SMS).
pub trait NotificationSender: Send + Sync {
    /// Send a reminder for `summary`.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError`] if delivery fails.
    fn send(
        &self,
        summary: BookingSummary,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotificationError>> + Send + '_>>;
}
