//! Routes for channel groups.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::get};
use mission_core::ids::{ChannelId, CommunityId};
use mission_orchestrator::commands::MissionAction;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{CommandContext, CommandResponse, dispatch};
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /groups.
#[derive(Debug, Deserialize)]
pub struct CreateGroupsRequest {
    pub count: u32,
    #[serde(flatten)]
    pub context: CommandContext,
}

/// Response body for GET /groups.
#[derive(Debug, Serialize)]
pub struct GroupsResponse {
    pub running: bool,
    pub channels: Vec<ChannelId>,
}

/// GET /groups
#[instrument(skip(state))]
async fn get_groups(
    State(state): State<AppState>,
    Path(community_id): Path<CommunityId>,
) -> Result<Json<GroupsResponse>, ApiError> {
    let channels = state.coordinator.group_channels(community_id).await?;
    Ok(Json(GroupsResponse {
        running: !channels.is_empty(),
        channels,
    }))
}

/// POST /groups
#[instrument(skip(state, request), fields(count = request.count))]
async fn create_groups(
    State(state): State<AppState>,
    Path(community_id): Path<CommunityId>,
    Json(request): Json<CreateGroupsRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let action = MissionAction::CreateGroups {
        count: request.count,
    };
    Ok(Json(
        dispatch(&state, community_id, action, request.context).await?,
    ))
}

/// DELETE /groups
#[instrument(skip(state, body))]
async fn clean_groups(
    State(state): State<AppState>,
    Path(community_id): Path<CommunityId>,
    body: Option<Json<CommandContext>>,
) -> Result<Json<CommandResponse>, ApiError> {
    let context = body.map(|Json(body)| body).unwrap_or_default();
    Ok(Json(
        dispatch(&state, community_id, MissionAction::CleanGroups, context).await?,
    ))
}

/// Returns the router for channel groups.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/groups",
        get(get_groups).post(create_groups).delete(clean_groups),
    )
}
