// ============================
// crates/backend-lib/src/handlers/broadcast.rs
// ============================
//! Broadcast start/stop handlers.
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use meetsignal_common::BroadcastStatus;
use serde::Deserialize;

use crate::error::AppError;
use crate::handlers::QueryParams;
use crate::validation::{require, validate_meeting_id, validate_rtmp_url, validate_stream_key};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct BroadcastParams {
    #[serde(rename = "meetingId")]
    pub meeting_id: Option<String>,
    pub rtmp: Option<String>,
    #[serde(rename = "streamKey")]
    pub stream_key: Option<String>,
    /// Present (with any value) means stop
    pub stop: Option<String>,
}

/// `POST /broadcasting`: start streaming a meeting, or stop the running
/// broadcast when `stop` is present. Accepted once the command is issued.
pub async fn broadcasting(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<BroadcastParams>,
) -> Result<StatusCode, AppError> {
    if params.stop.is_some() {
        state.broadcaster.stop()?;
        return Ok(StatusCode::ACCEPTED);
    }

    let meeting_id = validate_meeting_id(require(params.meeting_id.as_deref(), "meetingId")?)?;
    let rtmp = validate_rtmp_url(require(params.rtmp.as_deref(), "rtmp")?)?;
    let stream_key = validate_stream_key(require(params.stream_key.as_deref(), "streamKey")?)?;

    state.broadcaster.start(meeting_id, rtmp, stream_key)?;
    Ok(StatusCode::ACCEPTED)
}

/// `GET /broadcasting`
pub async fn status(State(state): State<AppState>) -> Json<BroadcastStatus> {
    Json(state.broadcaster.status())
}
