//! Shared application state.

use std::sync::Arc;

use mission_orchestrator::coordinator::MissionCoordinator;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Per-community orchestration facade.
    pub coordinator: Arc<MissionCoordinator>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(coordinator: Arc<MissionCoordinator>) -> Self {
        Self { coordinator }
    }
}
