// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Core functionality for the `meetsignal` meeting signaling server.

pub mod backend;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod registry;
pub mod router;
pub mod validation;

use std::sync::Arc;

use crate::backend::{BackendError, ConferencingBackend, HttpConferencingClient, InMemoryBackend};
use crate::broadcast::BroadcastManager;
use crate::config::{BackendKind, BackendSettings, Settings};
use crate::registry::MeetingRegistry;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Title -> meeting registry
    pub registry: MeetingRegistry,
    /// Broadcast subprocess manager
    pub broadcaster: Arc<BroadcastManager>,
    /// Settings the server was started with
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Create a new application state with an empty registry
    pub fn new(settings: Settings, backend: Arc<dyn ConferencingBackend>) -> Self {
        let registry = MeetingRegistry::new(backend, settings.backend.default_region.clone());
        let broadcaster = Arc::new(BroadcastManager::new(
            settings.broadcast.clone(),
            settings.viewer_base_url.clone(),
        ));

        Self {
            registry,
            broadcaster,
            settings: Arc::new(settings),
        }
    }
}

/// Build the conferencing backend selected by `backend.kind`
pub fn build_backend(settings: &BackendSettings) -> Result<Arc<dyn ConferencingBackend>, BackendError> {
    let backend: Arc<dyn ConferencingBackend> = match settings.kind {
        BackendKind::Http => Arc::new(HttpConferencingClient::new(
            &settings.endpoint,
            settings.request_timeout(),
        )?),
        BackendKind::Memory => Arc::new(InMemoryBackend::new()),
    };
    Ok(backend)
}
