//! Route for broadcasting to the group channels.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::post};
use mission_core::ids::{ChannelId, CommunityId};
use mission_orchestrator::commands::MissionAction;
use serde::Deserialize;
use tracing::instrument;

use super::{CommandContext, CommandResponse, dispatch};
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /broadcast.
#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    pub content: String,
    /// Group channels that should not receive the message.
    #[serde(default)]
    pub exclude: Vec<ChannelId>,
    #[serde(flatten)]
    pub context: CommandContext,
}

/// POST /broadcast
#[instrument(skip(state, request), fields(excluded = request.exclude.len()))]
async fn broadcast(
    State(state): State<AppState>,
    Path(community_id): Path<CommunityId>,
    Json(request): Json<BroadcastRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let action = MissionAction::Broadcast {
        content: request.content,
        exclude: request.exclude,
    };
    Ok(Json(
        dispatch(&state, community_id, action, request.context).await?,
    ))
}

/// Returns the router for broadcasts.
pub fn router() -> Router<AppState> {
    Router::new().route("/broadcast", post(broadcast))
}
