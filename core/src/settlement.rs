//! Settlement service abstraction.
//!
//! The settlement service finalizes a booking's payment/escrow on-chain. When
//! it succeeds it is the source of truth for the booking's `completed`
//! status and transaction reference; the job does not write either.

use crate::booking::BookingId;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Settlement call failures.
///
/// Every variant is recovered by fallback completion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettlementError {
    /// Transport failure or server-side error.
    #[error("Settlement request failed: {0}")]
    Request(String),

    /// The call did not finish within its budget.
    #[error("Settlement call timed out after {0:?}")]
    Timeout(Duration),

    /// The service answered with something we could not read.
    #[error("Unreadable settlement response: {0}")]
    Response(String),
}

/// Answer from the settlement service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementReceipt {
    /// Whether the service completed the booking
    pub ok: bool,
    /// Transaction reference, when the service reports one
    pub tx_ref: Option<String>,
}

impl SettlementReceipt {
    /// A successful receipt.
    #[must_use]
    pub fn settled(tx_ref: impl Into<String>) -> Self {
        Self {
            ok: true,
            tx_ref: Some(tx_ref.into()),
        }
    }

    /// A refusal.
    #[must_use]
    pub const fn rejected() -> Self {
        Self {
            ok: false,
            tx_ref: None,
        }
    }
}

/// Settlement client.
///
/// Treated as fallible and slow; callers wrap each call in a timeout.
pub trait SettlementClient: Send + Sync {
    /// Ask the settlement service to complete `booking_id`.
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError`] if the service could not be reached or
    /// answered unreadably. A reachable service that declines returns
    /// `Ok` with `ok = false`.
    fn complete_booking(
        &self,
        booking_id: BookingId,
    ) -> Pin<Box<dyn Future<Output = Result<SettlementReceipt, SettlementError>> + Send + '_>>;
}
