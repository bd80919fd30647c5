// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use meetsignal_common::ErrorBody;
use thiserror::Error;

use crate::backend::BackendError;

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Meeting not found: {0}")]
    MeetingNotFound(String),

    #[error("Conferencing backend unavailable: {0}")]
    BackendUnavailable(#[from] BackendError),

    #[error("A broadcast is already active for meeting {meeting_id}")]
    BroadcastAlreadyActive { meeting_id: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    ///
    /// Browser clients only distinguish "route missing" from "request failed",
    /// so every handler-level failure shares the Forbidden class.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::FORBIDDEN,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::MeetingNotFound(_) => "MEETING_001",
            AppError::BackendUnavailable(_) => "BACKEND_001",
            AppError::BroadcastAlreadyActive { .. } => "BCAST_001",
            AppError::NotFound(_) => "NF_001",
            AppError::InvalidInput(_) => "VAL_001",
            AppError::Internal(_) => "INT_001",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Unmatched routes answer in plain text, like any static file server
        if let AppError::NotFound(route) = &self {
            tracing::debug!(code = self.error_code(), %route, "no route");
            return (status, "404 Not Found").into_response();
        }

        tracing::warn!(code = self.error_code(), status = status.as_u16(), "request failed: {self}");

        let body = ErrorBody {
            error: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}
