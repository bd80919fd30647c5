// ================
// crates/common/src/lib.rs
// ================
//! Common types and structures
//! used for communication between the browser client, the signaling server
//! and the remote conferencing backend.
//! Field names follow the backend's PascalCase JSON so descriptors can be
//! handed to the client exactly as the backend produced them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Display name reported for attendees that joined without one.
pub const UNKNOWN_ATTENDEE_NAME: &str = "unknown";

/// Meeting descriptor returned by the conferencing backend
///
/// Only the fields the server needs are typed; everything else is kept in
/// `extra` and written back out untouched.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Meeting {
    /// Backend-assigned meeting identifier
    pub meeting_id: String,
    /// Caller-chosen external identifier, if the backend echoes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_meeting_id: Option<String>,
    /// Region hosting the meeting media
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_region: Option<String>,
    /// Media endpoints (audio host, signaling URL, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_placement: Option<Value>,
    /// Any other field the backend returned
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Attendee descriptor returned by the conferencing backend
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Attendee {
    /// Backend-assigned attendee identifier
    pub attendee_id: String,
    /// External identifier supplied when the attendee was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_user_id: Option<String>,
    /// Credential the client presents to the media service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_token: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A locally tracked meeting: the backend descriptor plus the playback URL
/// supplied by whoever created it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MeetingRecord {
    #[serde(rename = "Meeting")]
    pub meeting: Meeting,
    #[serde(rename = "PlaybackURL", default, skip_serializing_if = "Option::is_none")]
    pub playback_url: Option<String>,
}

/// Everything a client needs to join (or just locate) a meeting
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct JoinInfo {
    pub title: String,
    pub meeting: Meeting,
    #[serde(rename = "PlaybackURL", default, skip_serializing_if = "Option::is_none")]
    pub playback_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendee: Option<Attendee>,
}

/// `{"JoinInfo": {...}}`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JoinInfoResponse {
    #[serde(rename = "JoinInfo")]
    pub join_info: JoinInfo,
}

/// Display name lookup result
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct AttendeeInfo {
    pub attendee_id: String,
    pub name: String,
}

/// `{"AttendeeInfo": {...}}`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AttendeeInfoResponse {
    #[serde(rename = "AttendeeInfo")]
    pub attendee_info: AttendeeInfo,
}

/// Uniform error body: `{"error": "..."}`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

/// State of the broadcast subprocess
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "State")]
pub enum BroadcastStatus {
    Idle,
    #[serde(rename_all = "PascalCase")]
    Broadcasting {
        /// Meeting the viewer page was pointed at
        meeting_id: String,
        /// When the subprocess was launched
        started_at: DateTime<Utc>,
    },
}
