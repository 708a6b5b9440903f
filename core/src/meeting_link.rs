//! Meeting-link provisioning abstraction.

use crate::booking::BookingId;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Provisioning failures. Always logged and otherwise ignored.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProvisionError {
    /// Transport failure or non-success status.
    #[error("Meeting link request failed: {0}")]
    Request(String),

    /// The call did not finish within its budget.
    #[error("Meeting link call timed out after {0:?}")]
    Timeout(Duration),

    /// The provider answered with something we could not read.
    #[error("Unreadable meeting link response: {0}")]
    Response(String),
}

/// Generates meeting links for online bookings that lack one.
pub trait MeetingLinkProvisioner: Send + Sync {
    /// Generate a link for `booking_id`. `Ok(None)` means the provider had
    /// nothing to offer.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError`] if the provider call fails.
    fn generate_link(
        &self,
        booking_id: BookingId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, ProvisionError>> + Send + '_>>;
}
