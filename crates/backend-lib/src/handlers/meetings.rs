// ============================
// crates/backend-lib/src/handlers/meetings.rs
// ============================
//! Meeting and attendee handlers.
use std::collections::BTreeMap;

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use meetsignal_common::{AttendeeInfo, AttendeeInfoResponse, JoinInfo, JoinInfoResponse, MeetingRecord};
use serde::Deserialize;

use crate::error::AppError;
use crate::handlers::QueryParams;
use crate::validation::{require, validate_name, validate_region, validate_title};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct JoinParams {
    pub title: Option<String>,
    pub name: Option<String>,
    pub region: Option<String>,
    #[serde(rename = "playbackURL")]
    pub playback_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TitleParams {
    pub title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AttendeeParams {
    pub title: Option<String>,
    pub attendee: Option<String>,
}

/// Delete names the meeting with `name`, not `title`
#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    pub name: Option<String>,
}

/// `POST /join`: create the meeting if needed, then add an attendee
pub async fn join(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<JoinParams>,
) -> Result<(StatusCode, Json<JoinInfoResponse>), AppError> {
    let title = validate_title(require(params.title.as_deref(), "title")?)?;
    let name = validate_name(params.name.as_deref())?;
    let region = validate_region(params.region.as_deref())?;
    let playback_url = params.playback_url.as_deref().filter(|u| !u.is_empty());

    let join_info = state
        .registry
        .join_meeting(title, name, region, playback_url)
        .await?;

    Ok((StatusCode::CREATED, Json(JoinInfoResponse { join_info })))
}

/// `GET /attendee`: display name of an attendee
pub async fn attendee(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<AttendeeParams>,
) -> Result<Json<AttendeeInfoResponse>, AppError> {
    let title = validate_title(require(params.title.as_deref(), "title")?)?;
    let attendee_id = require(params.attendee.as_deref(), "attendee")?;

    let name = state.registry.lookup_attendee_name(title, attendee_id).await?;

    Ok(Json(AttendeeInfoResponse {
        attendee_info: AttendeeInfo {
            attendee_id: attendee_id.to_string(),
            name,
        },
    }))
}

/// `POST /meeting`: make sure the meeting exists without joining it
pub async fn create_meeting(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<TitleParams>,
) -> Result<(StatusCode, Json<JoinInfoResponse>), AppError> {
    let title = validate_title(require(params.title.as_deref(), "title")?)?;

    let record = state.registry.ensure_meeting(title, None, None).await?;

    let join_info = JoinInfo {
        title: title.to_string(),
        meeting: record.meeting,
        playback_url: None,
        attendee: None,
    };
    Ok((StatusCode::CREATED, Json(JoinInfoResponse { join_info })))
}

/// `POST /end`: end the backend meeting, keep the local record
pub async fn end_meeting(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<TitleParams>,
) -> Result<StatusCode, AppError> {
    let title = validate_title(require(params.title.as_deref(), "title")?)?;
    state.registry.end_meeting(title).await?;
    Ok(StatusCode::OK)
}

/// `GET /meetings`
pub async fn list_meetings(State(state): State<AppState>) -> Json<BTreeMap<String, MeetingRecord>> {
    Json(state.registry.list_meetings().await)
}

/// `DELETE /meeting`: end the backend meeting and forget it locally
pub async fn delete_meeting(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<DeleteParams>,
) -> Result<StatusCode, AppError> {
    let title = validate_title(require(params.name.as_deref(), "name")?)?;
    state.registry.delete_meeting(title).await?;
    Ok(StatusCode::OK)
}
