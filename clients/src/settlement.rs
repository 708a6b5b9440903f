//! HTTP settlement client.

use booking_automation_core::{BookingId, SettlementClient, SettlementError, SettlementReceipt};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Body returned by the settlement service on a 2xx response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompleteBookingResponse {
    success: bool,
    #[serde(default)]
    tx_hash: Option<String>,
}

/// Settlement service client.
///
/// `POST {base_url}/bookings/{id}/complete`. A 2xx answer is decoded into a
/// receipt; a 4xx answer means the service refused (`ok = false`); anything
/// else is an error.
#[derive(Clone, Debug)]
pub struct HttpSettlementClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpSettlementClient {
    /// Create a client for the service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError::Request`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SettlementError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SettlementError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            timeout,
        })
    }

    fn endpoint(&self, booking_id: BookingId) -> String {
        format!("{}/bookings/{booking_id}/complete", self.base_url)
    }

    async fn complete(&self, booking_id: BookingId) -> Result<SettlementReceipt, SettlementError> {
        let mut request = self.client.post(self.endpoint(booking_id));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SettlementError::Timeout(self.timeout)
            } else {
                SettlementError::Request(e.to_string())
            }
        })?;

        match response.status() {
            status if status.is_success() => {
                let body = response
                    .json::<CompleteBookingResponse>()
                    .await
                    .map_err(|e| SettlementError::Response(e.to_string()))?;

                Ok(SettlementReceipt {
                    ok: body.success,
                    tx_ref: body.tx_hash.filter(|h| !h.is_empty()),
                })
            }
            status if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS => {
                let body = response.text().await.unwrap_or_default();
                tracing::warn!(
                    booking_id = %booking_id,
                    status = status.as_u16(),
                    body = %body,
                    "Settlement service refused completion"
                );
                Ok(SettlementReceipt::rejected())
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(SettlementError::Request(format!(
                    "status {}: {body}",
                    status.as_u16()
                )))
            }
        }
    }
}

impl SettlementClient for HttpSettlementClient {
    fn complete_booking(
        &self,
        booking_id: BookingId,
    ) -> Pin<Box<dyn Future<Output = Result<SettlementReceipt, SettlementError>> + Send + '_>> {
        Box::pin(self.complete(booking_id))
    }
}
