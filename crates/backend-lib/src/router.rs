// ============================
// crates/backend-lib/src/router.rs
// ============================
//! HTTP router: route table, fallbacks and the error boundary.
use std::any::Any;

use axum::{
    http::{Method, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::error;

use crate::error::AppError;
use crate::handlers::{self, broadcast, meetings};
use crate::AppState;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/join", post(meetings::join))
        .route("/attendee", get(meetings::attendee))
        .route(
            "/meeting",
            post(meetings::create_meeting).delete(meetings::delete_meeting),
        )
        .route("/end", post(meetings::end_meeting))
        .route("/meetings", get(meetings::list_meetings))
        .route(
            "/broadcasting",
            post(broadcast::broadcasting).get(broadcast::status),
        )
        .route("/logs", post(handlers::client_logs))
        .fallback(not_found)
        .method_not_allowed_fallback(not_found)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Unknown routes, and known routes hit with the wrong method
async fn not_found(method: Method, uri: Uri) -> AppError {
    AppError::NotFound(format!("{method} {uri}"))
}

/// A panicking handler answers like any other failed request
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "handler panicked".to_string()
    };
    error!(panic = %message, "handler panicked");
    AppError::Internal(message).into_response()
}
