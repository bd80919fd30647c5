// ============================
// crates/backend-lib/src/backend/memory.rs
// ============================
//! Self-contained backend for local development.
//!
//! Mints its own identifiers and keeps meetings in memory, so the server can
//! be exercised end to end without a conferencing account.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use meetsignal_common::{Attendee, Meeting};
use serde_json::{json, Map};
use uuid::Uuid;

use super::{BackendError, ConferencingBackend};

/// In-memory conferencing backend
#[derive(Default)]
pub struct InMemoryBackend {
    /// meeting id -> descriptor
    meetings: DashMap<String, Meeting>,
    /// client request token -> meeting id
    tokens: DashMap<String, String>,
    meetings_created: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct meetings ever created
    pub fn meetings_created(&self) -> usize {
        self.meetings_created.load(Ordering::SeqCst)
    }

    /// Whether `meeting_id` exists and has not been deleted
    pub fn is_live(&self, meeting_id: &str) -> bool {
        self.meetings.contains_key(meeting_id)
    }
}

#[async_trait]
impl ConferencingBackend for InMemoryBackend {
    async fn create_meeting(
        &self,
        client_request_token: &str,
        media_region: &str,
    ) -> Result<Meeting, BackendError> {
        let token = self
            .tokens
            .entry(client_request_token.to_string())
            .or_insert_with(|| Uuid::new_v4().to_string());
        let meeting_id = token.value().clone();
        drop(token);

        let meeting = self
            .meetings
            .entry(meeting_id.clone())
            .or_insert_with(|| {
                self.meetings_created.fetch_add(1, Ordering::SeqCst);
                Meeting {
                    meeting_id: meeting_id.clone(),
                    external_meeting_id: None,
                    media_region: Some(media_region.to_string()),
                    media_placement: Some(json!({
                        "AudioHostUrl": format!("{meeting_id}.audio.localhost:3478"),
                        "SignalingUrl": format!("wss://signal.localhost/control/{meeting_id}"),
                        "TurnControlUrl": "https://turn.localhost/v2/turn_sessions"
                    })),
                    extra: Map::new(),
                }
            })
            .value()
            .clone();

        Ok(meeting)
    }

    async fn create_attendee(
        &self,
        meeting_id: &str,
        external_user_id: &str,
    ) -> Result<Attendee, BackendError> {
        if !self.meetings.contains_key(meeting_id) {
            return Err(BackendError::Rejected(format!(
                "meeting {meeting_id} does not exist"
            )));
        }

        Ok(Attendee {
            attendee_id: Uuid::new_v4().to_string(),
            external_user_id: Some(external_user_id.to_string()),
            join_token: Some(Uuid::new_v4().simple().to_string()),
            extra: Map::new(),
        })
    }

    async fn delete_meeting(&self, meeting_id: &str) -> Result<(), BackendError> {
        self.meetings
            .remove(meeting_id)
            .map(|_| ())
            .ok_or_else(|| BackendError::Rejected(format!("meeting {meeting_id} does not exist")))
    }
}
