//! Route modules, one per concern of the community API.

pub mod broadcast;
pub mod channels;
pub mod groups;
pub mod health;
pub mod session;

use axum::Router;
use mission_channels::broadcast::Delivery;
use mission_core::ids::{ChannelId, CommunityId};
use mission_core::platform::ChannelContext;
use mission_orchestrator::commands::{
    self, CommandOutcome, MissionAction, MissionCommand, Trigger,
};
use mission_session::application::query_handlers::SessionView;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

/// Routes mounted under `/api/v1/communities/{community_id}`.
pub fn community_router() -> Router<AppState> {
    Router::new()
        .merge(session::router())
        .merge(groups::router())
        .merge(broadcast::router())
        .merge(channels::router())
}

/// How a command reached the API. Flattened into every command body, and
/// the optional body of the endpoints that take no arguments.
#[derive(Debug, Default, Deserialize)]
pub struct CommandContext {
    /// Chat channel the command was issued from. When present the command
    /// must be allowed in that channel.
    #[serde(default)]
    pub origin: Option<ChannelContext>,
    /// Text command or reaction on the tracker message.
    #[serde(default)]
    pub trigger: Trigger,
}

/// Per-channel broadcast result.
#[derive(Debug, Serialize)]
pub struct DeliveryResponse {
    pub channel: ChannelId,
    pub admin: bool,
    pub delivered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Delivery> for DeliveryResponse {
    fn from(delivery: &Delivery) -> Self {
        Self {
            channel: delivery.channel,
            admin: delivery.admin,
            delivered: delivery.delivered(),
            error: delivery.result.as_ref().err().map(ToString::to_string),
        }
    }
}

/// Response body returned after a command is handled.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandResponse {
    Session {
        session: SessionView,
    },
    NoSession,
    GroupsCreated {
        channels: Vec<ChannelId>,
    },
    GroupsCleaned {
        deleted: Vec<ChannelId>,
        already_gone: Vec<ChannelId>,
        failed: Vec<ChannelId>,
    },
    Broadcast {
        deliveries: Vec<DeliveryResponse>,
    },
}

impl From<CommandOutcome> for CommandResponse {
    fn from(outcome: CommandOutcome) -> Self {
        match outcome {
            CommandOutcome::Session(session) => Self::Session { session },
            CommandOutcome::NoSession => Self::NoSession,
            CommandOutcome::GroupsCreated(channels) => Self::GroupsCreated { channels },
            CommandOutcome::GroupsCleaned(report) => Self::GroupsCleaned {
                deleted: report.deleted,
                already_gone: report.already_gone,
                failed: report.failed,
            },
            CommandOutcome::Broadcast(deliveries) => Self::Broadcast {
                deliveries: deliveries.iter().map(DeliveryResponse::from).collect(),
            },
        }
    }
}

/// Builds a typed command, tagged with its trigger and, when the caller
/// supplied one, its origin channel, and runs it through the command dispatcher.
pub(crate) async fn dispatch(
    state: &AppState,
    community: CommunityId,
    action: MissionAction,
    context: CommandContext,
) -> Result<CommandResponse, ApiError> {
    let mut command = MissionCommand::new(community, action).triggered_by(context.trigger);
    if let Some(origin) = context.origin {
        command = command.from_channel(origin);
    }
    info!(correlation_id = %command.correlation_id, command_type = command.action.name(), "dispatching command");
    let outcome = commands::execute(&state.coordinator, command).await?;
    Ok(outcome.into())
}
