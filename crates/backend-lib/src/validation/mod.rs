// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Request parameter validation.
//!
//! Everything here runs before the registry or the backend is touched, so a
//! rejected request never leaves partial state behind.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

use crate::error::AppError;

const MAX_TITLE_LENGTH: usize = 256;
const MAX_NAME_LENGTH: usize = 256;
const MAX_MEETING_ID_LENGTH: usize = 64;

static REGION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}(-[a-z]+)+-\d{1,2}$").expect("region pattern"));
static MEETING_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9-]+$").expect("meeting id pattern"));

/// Possible validation errors
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("missing required parameter: {0}")]
    Missing(&'static str),

    #[error("Invalid title: {0}")]
    InvalidTitle(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    #[error("Invalid meeting ID: {0}")]
    InvalidMeetingId(String),

    #[error("Invalid RTMP URL: {0}")]
    InvalidRtmpUrl(String),

    #[error("Invalid stream key")]
    InvalidStreamKey,
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Unwrap a required query parameter, treating an empty value as missing
pub fn require<'a>(value: Option<&'a str>, param: &'static str) -> ValidationResult<&'a str> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::Missing(param)),
    }
}

/// Validate a meeting title (the registry key)
pub fn validate_title(title: &str) -> ValidationResult<&str> {
    if title.trim().is_empty() {
        return Err(ValidationError::InvalidTitle(
            "Title must not be blank".to_string(),
        ));
    }

    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ValidationError::InvalidTitle(format!(
            "Title must be at most {MAX_TITLE_LENGTH} characters"
        )));
    }

    if title.chars().any(char::is_control) {
        return Err(ValidationError::InvalidTitle(
            "Title must not contain control characters".to_string(),
        ));
    }

    Ok(title)
}

/// Validate an optional display name. Empty means "no name".
pub fn validate_name(name: Option<&str>) -> ValidationResult<Option<&str>> {
    let Some(name) = name.filter(|n| !n.is_empty()) else {
        return Ok(None);
    };

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::InvalidName(format!(
            "Name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }

    if name.chars().any(char::is_control) {
        return Err(ValidationError::InvalidName(
            "Name must not contain control characters".to_string(),
        ));
    }

    Ok(Some(name))
}

/// Validate an optional media region such as `us-east-1`
pub fn validate_region(region: Option<&str>) -> ValidationResult<Option<&str>> {
    match region.filter(|r| !r.is_empty()) {
        None => Ok(None),
        Some(r) if REGION_REGEX.is_match(r) => Ok(Some(r)),
        Some(r) => Err(ValidationError::InvalidRegion(r.to_string())),
    }
}

/// Validate a backend meeting ID used to build the broadcast viewer URL
pub fn validate_meeting_id(meeting_id: &str) -> ValidationResult<&str> {
    if meeting_id.len() > MAX_MEETING_ID_LENGTH || !MEETING_ID_REGEX.is_match(meeting_id) {
        return Err(ValidationError::InvalidMeetingId(meeting_id.to_string()));
    }
    Ok(meeting_id)
}

/// Validate the RTMP ingest base URL
pub fn validate_rtmp_url(rtmp: &str) -> ValidationResult<&str> {
    let has_scheme = rtmp.starts_with("rtmp://") || rtmp.starts_with("rtmps://");
    if !has_scheme || rtmp.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidRtmpUrl(rtmp.to_string()));
    }
    Ok(rtmp)
}

/// Validate the stream key appended to the ingest URL
pub fn validate_stream_key(key: &str) -> ValidationResult<&str> {
    if key.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ValidationError::InvalidStreamKey);
    }
    Ok(key)
}
