//! HTTP surface of the mission session engine.
//!
//! Library half of the `mission-api` binary so that integration tests can
//! build the exact router `main` serves.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

use axum::Router;

use crate::state::AppState;

/// Builds the application router with every route mounted.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest(
            "/api/v1/communities/{community_id}",
            routes::community_router(),
        )
        .with_state(state)
}
