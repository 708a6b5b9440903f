//! HTTP meeting-link provisioner.

use booking_automation_core::{BookingId, MeetingLinkProvisioner, ProvisionError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateLinkRequest {
    booking_id: BookingId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateLinkResponse {
    #[serde(default)]
    meeting_link: Option<String>,
}

/// Meeting-link provider client.
///
/// `POST {endpoint}` with `{"bookingId": ...}`; a 2xx answer may carry
/// `meetingLink`.
#[derive(Clone, Debug)]
pub struct HttpMeetingLinkProvisioner {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpMeetingLinkProvisioner {
    /// Create a provisioner calling `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Request`] if the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProvisionError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProvisionError::Request(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            timeout,
        })
    }

    async fn generate(&self, booking_id: BookingId) -> Result<Option<String>, ProvisionError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&GenerateLinkRequest { booking_id });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProvisionError::Timeout(self.timeout)
            } else {
                ProvisionError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProvisionError::Request(format!(
                "status {}: {body}",
                status.as_u16()
            )));
        }

        let body = response
            .json::<GenerateLinkResponse>()
            .await
            .map_err(|e| ProvisionError::Response(e.to_string()))?;

        Ok(body.meeting_link.filter(|link| !link.trim().is_empty()))
    }
}

impl MeetingLinkProvisioner for HttpMeetingLinkProvisioner {
    fn generate_link(
        &self,
        booking_id: BookingId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, ProvisionError>> + Send + '_>> {
        Box::pin(self.generate(booking_id))
    }
}
