// ============================
// crates/backend-lib/src/backend/mod.rs
// ============================
//! Remote conferencing backend abstraction.
//!
//! The backend is an opaque creator/destroyer of meetings and attendees. The
//! registry only ever talks to it through [`ConferencingBackend`], so the HTTP
//! client, the in-memory development backend and test fakes are interchangeable.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use meetsignal_common::{Attendee, Meeting};
use thiserror::Error;

pub use http::HttpConferencingClient;
pub use memory::InMemoryBackend;

/// Failure of a single remote call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("rejected: {0}")]
    Rejected(String),
}

/// Trait for conferencing backends
#[async_trait]
pub trait ConferencingBackend: Send + Sync {
    /// Create a backend meeting. `client_request_token` makes the call
    /// idempotent on the backend side.
    async fn create_meeting(
        &self,
        client_request_token: &str,
        media_region: &str,
    ) -> Result<Meeting, BackendError>;

    /// Create an attendee under `meeting_id`
    async fn create_attendee(
        &self,
        meeting_id: &str,
        external_user_id: &str,
    ) -> Result<Attendee, BackendError>;

    /// Delete a backend meeting
    async fn delete_meeting(&self, meeting_id: &str) -> Result<(), BackendError>;
}
