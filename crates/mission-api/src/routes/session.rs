//! Routes for mission sessions.

use axum::extract::{Path, State};
use axum::{
    Json, Router,
    routing::{get, post},
};
use mission_core::error::DomainError;
use mission_core::ids::CommunityId;
use mission_orchestrator::commands::MissionAction;
use mission_session::application::query_handlers::SessionView;
use serde::Deserialize;
use tracing::instrument;

use super::{CommandContext, CommandResponse, dispatch};
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /session/start.
#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub players: u32,
    #[serde(flatten)]
    pub context: CommandContext,
}

/// Request body for the counter endpoints.
#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: u32,
    #[serde(flatten)]
    pub context: CommandContext,
}

/// Request body for POST /session/narrative.
#[derive(Debug, Deserialize)]
pub struct NarrativeRequest {
    pub narrative: String,
    #[serde(flatten)]
    pub context: CommandContext,
}

/// POST /session/start
#[instrument(skip(state, request), fields(players = request.players))]
async fn start_session(
    State(state): State<AppState>,
    Path(community_id): Path<CommunityId>,
    Json(request): Json<StartSessionRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let action = MissionAction::StartSession {
        players: request.players,
    };
    Ok(Json(
        dispatch(&state, community_id, action, request.context).await?,
    ))
}

/// POST /session/continue
#[instrument(skip(state, body))]
async fn continue_session(
    State(state): State<AppState>,
    Path(community_id): Path<CommunityId>,
    body: Option<Json<CommandContext>>,
) -> Result<Json<CommandResponse>, ApiError> {
    let context = body.map(|Json(body)| body).unwrap_or_default();
    Ok(Json(
        dispatch(&state, community_id, MissionAction::ContinueSession, context).await?,
    ))
}

/// POST /session/end
#[instrument(skip(state, body))]
async fn end_session(
    State(state): State<AppState>,
    Path(community_id): Path<CommunityId>,
    body: Option<Json<CommandContext>>,
) -> Result<Json<CommandResponse>, ApiError> {
    let context = body.map(|Json(body)| body).unwrap_or_default();
    Ok(Json(
        dispatch(&state, community_id, MissionAction::EndSession, context).await?,
    ))
}

/// POST /session/narrative
#[instrument(skip(state, request))]
async fn choose_narrative(
    State(state): State<AppState>,
    Path(community_id): Path<CommunityId>,
    Json(request): Json<NarrativeRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let action = MissionAction::ChooseNarrative {
        narrative: request.narrative,
    };
    Ok(Json(
        dispatch(&state, community_id, action, request.context).await?,
    ))
}

/// POST /session/damage
#[instrument(skip(state, request), fields(amount = request.amount))]
async fn deal_damage(
    State(state): State<AppState>,
    Path(community_id): Path<CommunityId>,
    Json(request): Json<AmountRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let action = MissionAction::DealDamage {
        amount: request.amount,
    };
    Ok(Json(
        dispatch(&state, community_id, action, request.context).await?,
    ))
}

/// POST /session/clues
#[instrument(skip(state, request), fields(amount = request.amount))]
async fn place_clues(
    State(state): State<AppState>,
    Path(community_id): Path<CommunityId>,
    Json(request): Json<AmountRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let action = MissionAction::PlaceClues {
        amount: request.amount,
    };
    Ok(Json(
        dispatch(&state, community_id, action, request.context).await?,
    ))
}

/// POST /session/counter-measures/gain
#[instrument(skip(state, request), fields(amount = request.amount))]
async fn gain_counter_measures(
    State(state): State<AppState>,
    Path(community_id): Path<CommunityId>,
    Json(request): Json<AmountRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let action = MissionAction::GainCounterMeasures {
        amount: request.amount,
    };
    Ok(Json(
        dispatch(&state, community_id, action, request.context).await?,
    ))
}

/// POST /session/counter-measures/spend
#[instrument(skip(state, request), fields(amount = request.amount))]
async fn spend_counter_measures(
    State(state): State<AppState>,
    Path(community_id): Path<CommunityId>,
    Json(request): Json<AmountRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let action = MissionAction::SpendCounterMeasures {
        amount: request.amount,
    };
    Ok(Json(
        dispatch(&state, community_id, action, request.context).await?,
    ))
}

/// GET /session
#[instrument(skip(state))]
async fn get_session(
    State(state): State<AppState>,
    Path(community_id): Path<CommunityId>,
) -> Result<Json<SessionView>, ApiError> {
    let session = state
        .coordinator
        .read_session(community_id, |session| SessionView::from(session))
        .await
        .ok_or(DomainError::NoActiveSession(community_id))?;
    Ok(Json(session))
}

/// GET /sessions
#[instrument(skip(state))]
async fn list_sessions(
    State(state): State<AppState>,
    Path(community_id): Path<CommunityId>,
) -> Result<Json<Vec<SessionView>>, ApiError> {
    Ok(Json(state.coordinator.session_history(community_id).await?))
}

/// Returns the router for sessions.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/session", get(get_session))
        .route("/sessions", get(list_sessions))
        .route("/session/start", post(start_session))
        .route("/session/continue", post(continue_session))
        .route("/session/end", post(end_session))
        .route("/session/narrative", post(choose_narrative))
        .route("/session/damage", post(deal_damage))
        .route("/session/clues", post(place_clues))
        .route("/session/counter-measures/gain", post(gain_counter_measures))
        .route("/session/counter-measures/spend", post(spend_counter_measures))
}
