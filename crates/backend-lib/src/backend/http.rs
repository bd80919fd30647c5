// ============================
// crates/backend-lib/src/backend/http.rs
// ============================
//! HTTP client for the conferencing REST API.
//!
//! Request signing is not done here; `endpoint` is expected to be either the
//! provider's API behind a signing proxy or a compatible service.

use std::time::Duration;

use async_trait::async_trait;
use meetsignal_common::{Attendee, Meeting};
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{instrument, warn};

use super::{BackendError, ConferencingBackend};

const CONNECT_TIMEOUT_SECS: u64 = 5;

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateMeetingRequest<'a> {
    client_request_token: &'a str,
    media_region: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateMeetingResponse {
    meeting: Meeting,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateAttendeeRequest<'a> {
    external_user_id: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateAttendeeResponse {
    attendee: Attendee,
}

/// Error payloads come back as `{"Message": ...}` or `{"message": ...}`
#[derive(Deserialize)]
struct RemoteErrorBody {
    #[serde(alias = "Message")]
    message: String,
}

/// Conferencing backend reached over HTTP
#[derive(Clone)]
pub struct HttpConferencingClient {
    client: Client,
    endpoint: String,
}

impl HttpConferencingClient {
    /// Create a new client for `endpoint` (e.g. "https://conferencing.example")
    pub fn new(endpoint: &str, request_timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
        let response = Self::check_status(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn check_status(response: Response) -> Result<Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<RemoteErrorBody>(&text)
            .map(|body| body.message)
            .unwrap_or(text);
        warn!(status = status.as_u16(), %message, "conferencing backend rejected request");

        Err(BackendError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

fn transport(e: reqwest::Error) -> BackendError {
    warn!(error = %e, "conferencing backend unreachable");
    BackendError::Transport(e.to_string())
}

#[async_trait]
impl ConferencingBackend for HttpConferencingClient {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn create_meeting(
        &self,
        client_request_token: &str,
        media_region: &str,
    ) -> Result<Meeting, BackendError> {
        let response = self
            .client
            .post(format!("{}/meetings", self.endpoint))
            .json(&CreateMeetingRequest {
                client_request_token,
                media_region,
            })
            .send()
            .await
            .map_err(transport)?;

        let body: CreateMeetingResponse = Self::decode(response).await?;
        Ok(body.meeting)
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn create_attendee(
        &self,
        meeting_id: &str,
        external_user_id: &str,
    ) -> Result<Attendee, BackendError> {
        let response = self
            .client
            .post(format!("{}/meetings/{}/attendees", self.endpoint, meeting_id))
            .json(&CreateAttendeeRequest { external_user_id })
            .send()
            .await
            .map_err(transport)?;

        let body: CreateAttendeeResponse = Self::decode(response).await?;
        Ok(body.attendee)
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn delete_meeting(&self, meeting_id: &str) -> Result<(), BackendError> {
        let response = self
            .client
            .delete(format!("{}/meetings/{}", self.endpoint, meeting_id))
            .send()
            .await
            .map_err(transport)?;

        Self::check_status(response).await?;
        Ok(())
    }
}
