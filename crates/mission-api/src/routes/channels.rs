//! Channel classification for the dispatch layer.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::post};
use mission_core::ids::CommunityId;
use mission_core::platform::ChannelContext;
use serde::Serialize;
use tracing::instrument;

use crate::state::AppState;

/// Response body for POST /channels/classify.
#[derive(Debug, Serialize)]
pub struct ClassificationResponse {
    pub group_channel: bool,
    pub admin_channel: bool,
}

/// POST /channels/classify
#[instrument(skip(state, channel), fields(channel = %channel.id))]
async fn classify(
    State(state): State<AppState>,
    Path(_community_id): Path<CommunityId>,
    Json(channel): Json<ChannelContext>,
) -> Json<ClassificationResponse> {
    Json(ClassificationResponse {
        group_channel: state.coordinator.is_group_channel(&channel),
        admin_channel: state.coordinator.is_admin_channel(&channel),
    })
}

/// Returns the router for channel classification.
pub fn router() -> Router<AppState> {
    Router::new().route("/channels/classify", post(classify))
}
