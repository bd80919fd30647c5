// ============================
// crates/backend-lib/src/handlers/mod.rs
// ============================
//! HTTP handlers. Every parameter arrives in the query string.

pub mod broadcast;
pub mod meetings;

use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use tracing::info;

use crate::error::AppError;

/// `Query` whose rejection is reported like every other handler error
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct QueryParams<T>(pub T);

/// Client-side log lines posted by the browser app
pub async fn client_logs(body: String) -> StatusCode {
    for line in body.lines().filter(|l| !l.trim().is_empty()) {
        info!(target: "client", "{line}");
    }
    StatusCode::OK
}
