//! Typed mission commands and their dispatch.
//!
//! Every inbound command, whatever surface it came from, is turned into a
//! [`MissionCommand`] and handed to [`execute`]. Argument limits that belong
//! to the command surface rather than to the session live here.

use mission_channels::broadcast::Delivery;
use mission_channels::registry::CleanupReport;
use mission_core::command::Command;
use mission_core::error::DomainError;
use mission_core::ids::{ChannelId, CommunityId};
use mission_core::platform::ChannelContext;
use mission_session::application::query_handlers::SessionView;
use mission_session::domain::aggregates::Session;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::coordinator::MissionCoordinator;

/// Most clues a single command may place.
pub const MAX_CLUES_PER_COMMAND: u32 = 3;

/// Most groups a single command may create.
pub const MAX_GROUPS_PER_COMMAND: u32 = 10;

/// The ways a command can be triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Matched from a text message.
    pub text: bool,
    /// Fired when a reaction is added to the session tracker message.
    pub reaction_add: bool,
    /// Fired when a reaction is removed from the session tracker message.
    pub reaction_remove: bool,
}

impl Capabilities {
    /// `true` if a command with these capabilities may be fired by
    /// `trigger`.
    #[must_use]
    pub fn allows(self, trigger: Trigger) -> bool {
        match trigger {
            Trigger::Text => self.text,
            Trigger::ReactionAdd => self.reaction_add,
            Trigger::ReactionRemove => self.reaction_remove,
        }
    }

    const TEXT: Self = Self {
        text: true,
        reaction_add: false,
        reaction_remove: false,
    };

    const TEXT_AND_REACTIONS: Self = Self {
        text: true,
        reaction_add: true,
        reaction_remove: true,
    };
}

/// What fired a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    #[default]
    Text,
    ReactionAdd,
    ReactionRemove,
}

/// Channels a command may be issued from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelScope {
    /// Group channels, including the control channel.
    Group,
    /// Only the control channel.
    Admin,
}

/// What a command does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissionAction {
    StartSession { players: u32 },
    ContinueSession,
    EndSession,
    ShowSession,
    ChooseNarrative { narrative: String },
    DealDamage { amount: u32 },
    PlaceClues { amount: u32 },
    GainCounterMeasures { amount: u32 },
    SpendCounterMeasures { amount: u32 },
    CreateGroups { count: u32 },
    CleanGroups,
    Broadcast { content: String, exclude: Vec<ChannelId> },
}

impl MissionAction {
    /// Stable name used for logging and routing.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartSession { .. } => "StartSession",
            Self::ContinueSession => "ContinueSession",
            Self::EndSession => "EndSession",
            Self::ShowSession => "ShowSession",
            Self::ChooseNarrative { .. } => "ChooseNarrative",
            Self::DealDamage { .. } => "DealDamage",
            Self::PlaceClues { .. } => "PlaceClues",
            Self::GainCounterMeasures { .. } => "GainCounterMeasures",
            Self::SpendCounterMeasures { .. } => "SpendCounterMeasures",
            Self::CreateGroups { .. } => "CreateGroups",
            Self::CleanGroups => "CleanGroups",
            Self::Broadcast { .. } => "Broadcast",
        }
    }

    /// Counter commands can also be driven by reactions on the tracker
    /// message; everything else is text only.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        match self {
            Self::DealDamage { .. }
            | Self::PlaceClues { .. }
            | Self::GainCounterMeasures { .. }
            | Self::SpendCounterMeasures { .. } => Capabilities::TEXT_AND_REACTIONS,
            _ => Capabilities::TEXT,
        }
    }

    #[must_use]
    pub fn scope(&self) -> ChannelScope {
        match self {
            Self::ShowSession
            | Self::DealDamage { .. }
            | Self::PlaceClues { .. }
            | Self::GainCounterMeasures { .. }
            | Self::SpendCounterMeasures { .. } => ChannelScope::Group,
            _ => ChannelScope::Admin,
        }
    }

    /// Checks command-level argument limits.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidArgument` naming the offending argument.
    pub fn validate(&self) -> Result<(), DomainError> {
        match self {
            Self::StartSession { players: 0 } => Err(invalid("players must be positive")),
            Self::DealDamage { amount: 0 }
            | Self::PlaceClues { amount: 0 }
            | Self::GainCounterMeasures { amount: 0 }
            | Self::SpendCounterMeasures { amount: 0 } => Err(invalid("amount must be positive")),
            Self::PlaceClues { amount } if *amount > MAX_CLUES_PER_COMMAND => Err(invalid(
                &format!("at most {MAX_CLUES_PER_COMMAND} clues can be placed at once"),
            )),
            Self::CreateGroups { count: 0 } => Err(invalid("count must be positive")),
            Self::CreateGroups { count } if *count > MAX_GROUPS_PER_COMMAND => Err(invalid(
                &format!("at most {MAX_GROUPS_PER_COMMAND} groups can be created at once"),
            )),
            Self::Broadcast { content, .. } if content.trim().is_empty() => {
                Err(invalid("broadcast content must not be empty"))
            }
            Self::ChooseNarrative { narrative } if narrative.trim().is_empty() => {
                Err(invalid("narrative must not be empty"))
            }
            _ => Ok(()),
        }
    }
}

fn invalid(message: &str) -> DomainError {
    DomainError::InvalidArgument(message.to_owned())
}

/// A command addressed to one community.
#[derive(Debug, Clone)]
pub struct MissionCommand {
    pub correlation_id: Uuid,
    pub community: CommunityId,
    /// Channel the command was issued from. `None` for trusted callers,
    /// which skips the channel scope check.
    pub origin: Option<ChannelContext>,
    pub trigger: Trigger,
    pub action: MissionAction,
}

impl MissionCommand {
    /// Creates a text-triggered command with a fresh correlation id and no
    /// origin channel.
    #[must_use]
    pub fn new(community: CommunityId, action: MissionAction) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            community,
            origin: None,
            trigger: Trigger::Text,
            action,
        }
    }

    #[must_use]
    pub fn triggered_by(mut self, trigger: Trigger) -> Self {
        self.trigger = trigger;
        self
    }

    #[must_use]
    pub fn from_channel(mut self, origin: ChannelContext) -> Self {
        self.origin = Some(origin);
        self
    }

    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.action.capabilities()
    }
}

impl Command for MissionCommand {
    fn command_type(&self) -> &'static str {
        self.action.name()
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn community(&self) -> CommunityId {
        self.community
    }
}

/// What a command produced.
#[derive(Debug)]
pub enum CommandOutcome {
    /// The affected or current session.
    Session(SessionView),
    /// No session is running.
    NoSession,
    GroupsCreated(Vec<ChannelId>),
    GroupsCleaned(CleanupReport),
    Broadcast(Vec<Delivery>),
}

/// Validates and runs `command` against `coordinator`.
///
/// # Errors
///
/// Returns `DomainError::InvalidArgument` if the command cannot be fired by
/// its trigger, an argument limit is broken, the origin channel is outside
/// the command's scope, or a spend exceeds the
/// pool; otherwise whatever the coordinator operation returns.
#[instrument(skip(coordinator), fields(command_type = command.command_type(), trigger = ?command.trigger, correlation_id = %command.correlation_id, community = %command.community))]
pub async fn execute(
    coordinator: &MissionCoordinator,
    command: MissionCommand,
) -> Result<CommandOutcome, DomainError> {
    if !command.capabilities().allows(command.trigger) {
        return Err(DomainError::InvalidArgument(format!(
            "{} cannot be triggered by {:?}",
            command.action.name(),
            command.trigger
        )));
    }
    command.action.validate()?;
    if let Some(origin) = &command.origin {
        check_scope(coordinator, command.action.scope(), origin, command.action.name())?;
    }

    let community = command.community;
    let outcome = match command.action {
        MissionAction::StartSession { players } => {
            session(&coordinator.start_session(community, players).await?)
        }
        MissionAction::ContinueSession => coordinator
            .continue_session(community)
            .await?
            .map_or(CommandOutcome::NoSession, |s| session(&s)),
        MissionAction::EndSession => session(&coordinator.end_session(community).await?),
        MissionAction::ShowSession => coordinator
            .current_session(community)
            .await
            .map_or(CommandOutcome::NoSession, |s| session(&s)),
        MissionAction::ChooseNarrative { narrative } => {
            session(&coordinator.choose_narrative(community, &narrative).await?)
        }
        MissionAction::DealDamage { amount } => {
            session(&coordinator.deal_damage(community, amount).await?)
        }
        MissionAction::PlaceClues { amount } => {
            session(&coordinator.place_clues(community, amount).await?)
        }
        MissionAction::GainCounterMeasures { amount } => {
            session(&coordinator.gain_counter_measures(community, amount).await?)
        }
        MissionAction::SpendCounterMeasures { amount } => session(
            &coordinator
                .try_spend_counter_measures(community, amount)
                .await?,
        ),
        MissionAction::CreateGroups { count } => {
            CommandOutcome::GroupsCreated(coordinator.create_groups(community, count).await?)
        }
        MissionAction::CleanGroups => {
            CommandOutcome::GroupsCleaned(coordinator.clean_groups(community).await?)
        }
        MissionAction::Broadcast { content, exclude } => CommandOutcome::Broadcast(
            coordinator.broadcast(community, &content, &exclude).await?,
        ),
    };

    info!("command executed");
    Ok(outcome)
}

fn session(session: &Session) -> CommandOutcome {
    CommandOutcome::Session(SessionView::from(session))
}

fn check_scope(
    coordinator: &MissionCoordinator,
    scope: ChannelScope,
    origin: &ChannelContext,
    command: &str,
) -> Result<(), DomainError> {
    let allowed = match scope {
        ChannelScope::Group => coordinator.is_group_channel(origin),
        ChannelScope::Admin => coordinator.is_admin_channel(origin),
    };
    if allowed {
        Ok(())
    } else {
        Err(DomainError::InvalidArgument(format!(
            "{command} cannot be used in #{}",
            origin.name
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::Utc;
    use mission_channels::config::TopologyConfig;
    use mission_test_support::{FixedClock, InMemoryResourceRepository, MockRng, RecordingPlatform};

    use super::*;

    const COMMUNITY: CommunityId = CommunityId(4242);

    fn coordinator() -> (MissionCoordinator, Arc<InMemoryResourceRepository>) {
        let repo = Arc::new(InMemoryResourceRepository::new());
        let coordinator = MissionCoordinator::new(
            repo.clone(),
            Arc::new(RecordingPlatform::new()),
            Arc::new(FixedClock(Utc::now())),
            Arc::new(Mutex::new(MockRng)),
            TopologyConfig {
                category_name: Some("Blob Event".into()),
                admin_channel_name: Some("control".into()),
            },
        );
        (coordinator, repo)
    }

    fn channel(name: &str, category: Option<&str>) -> ChannelContext {
        ChannelContext {
            id: ChannelId(1),
            name: name.into(),
            category: category.map(Into::into),
        }
    }

    async fn run(coordinator: &MissionCoordinator, action: MissionAction) -> CommandOutcome {
        execute(coordinator, MissionCommand::new(COMMUNITY, action))
            .await
            .unwrap()
    }

    #[test]
    fn test_command_exposes_type_and_correlation_id() {
        let command = MissionCommand::new(COMMUNITY, MissionAction::PlaceClues { amount: 2 });

        assert_eq!(command.command_type(), "PlaceClues");
        assert_eq!(command.correlation_id(), command.correlation_id);
        assert_eq!(Command::community(&command), COMMUNITY);
    }

    #[test]
    fn test_capabilities_per_variant() {
        let damage = MissionAction::DealDamage { amount: 1 }.capabilities();
        let broadcast = MissionAction::Broadcast {
            content: "x".into(),
            exclude: vec![],
        }
        .capabilities();

        assert!(damage.allows(Trigger::ReactionAdd) && damage.allows(Trigger::ReactionRemove));
        assert!(broadcast.allows(Trigger::Text));
        assert!(!broadcast.allows(Trigger::ReactionAdd));
        assert!(!broadcast.allows(Trigger::ReactionRemove));
    }

    #[tokio::test]
    async fn test_reaction_trigger_runs_counter_command_only() {
        // Arrange
        let (coordinator, _) = coordinator();
        run(&coordinator, MissionAction::StartSession { players: 2 }).await;

        // Act
        let clues = execute(
            &coordinator,
            MissionCommand::new(COMMUNITY, MissionAction::PlaceClues { amount: 1 })
                .triggered_by(Trigger::ReactionAdd),
        )
        .await;
        let end = execute(
            &coordinator,
            MissionCommand::new(COMMUNITY, MissionAction::EndSession)
                .triggered_by(Trigger::ReactionRemove),
        )
        .await;

        // Assert
        assert!(matches!(clues, Ok(CommandOutcome::Session(ref view)) if view.clues_placed == 1));
        assert!(matches!(end, Err(DomainError::InvalidArgument(_))));
        assert!(coordinator.current_session(COMMUNITY).await.is_some());
    }

    #[test]
    fn test_validate_enforces_argument_limits() {
        let rejected = [
            MissionAction::StartSession { players: 0 },
            MissionAction::DealDamage { amount: 0 },
            MissionAction::PlaceClues { amount: 4 },
            MissionAction::CreateGroups { count: 11 },
            MissionAction::CreateGroups { count: 0 },
            MissionAction::Broadcast {
                content: "  ".into(),
                exclude: vec![],
            },
        ];
        for action in rejected {
            assert!(
                matches!(action.validate(), Err(DomainError::InvalidArgument(_))),
                "{action:?} should be rejected"
            );
        }

        assert!(MissionAction::PlaceClues { amount: 3 }.validate().is_ok());
        assert!(MissionAction::CreateGroups { count: 10 }.validate().is_ok());
    }

    #[tokio::test]
    async fn test_execute_runs_session_lifecycle() {
        // Arrange
        let (coordinator, _) = coordinator();

        // Act
        run(&coordinator, MissionAction::StartSession { players: 2 }).await;
        run(&coordinator, MissionAction::DealDamage { amount: 12 }).await;
        let shown = run(&coordinator, MissionAction::ShowSession).await;
        run(&coordinator, MissionAction::EndSession).await;
        let after = run(&coordinator, MissionAction::ShowSession).await;

        // Assert
        match shown {
            CommandOutcome::Session(view) => {
                assert_eq!(view.remaining_health, 18);
                assert!(view.running);
            }
            other => panic!("expected a session, got {other:?}"),
        }
        assert!(matches!(after, CommandOutcome::NoSession));
    }

    #[tokio::test]
    async fn test_spend_command_rejects_overspend_without_writing() {
        // Arrange
        let (coordinator, repo) = coordinator();
        run(&coordinator, MissionAction::StartSession { players: 1 }).await;
        let writes = repo.write_count();

        // Act
        let result = execute(
            &coordinator,
            MissionCommand::new(COMMUNITY, MissionAction::SpendCounterMeasures { amount: 2 }),
        )
        .await;

        // Assert
        assert!(matches!(result, Err(DomainError::InvalidArgument(_))));
        assert_eq!(repo.write_count(), writes);
    }

    #[tokio::test]
    async fn test_continue_without_running_session_reports_none() {
        let (coordinator, _) = coordinator();

        let outcome = run(&coordinator, MissionAction::ContinueSession).await;

        assert!(matches!(outcome, CommandOutcome::NoSession));
    }

    #[tokio::test]
    async fn test_origin_channel_scope_is_enforced() {
        // Arrange
        let (coordinator, _) = coordinator();
        let lobby = channel("general", None);
        let group = channel("group-1", Some("Blob Event"));
        let control = channel("control", Some("Blob Event"));

        // Act
        let from_lobby = execute(
            &coordinator,
            MissionCommand::new(COMMUNITY, MissionAction::ShowSession).from_channel(lobby),
        )
        .await;
        let start_from_group = execute(
            &coordinator,
            MissionCommand::new(COMMUNITY, MissionAction::StartSession { players: 3 })
                .from_channel(group.clone()),
        )
        .await;
        let start_from_control = execute(
            &coordinator,
            MissionCommand::new(COMMUNITY, MissionAction::StartSession { players: 3 })
                .from_channel(control),
        )
        .await;
        let damage_from_group = execute(
            &coordinator,
            MissionCommand::new(COMMUNITY, MissionAction::DealDamage { amount: 1 })
                .from_channel(group),
        )
        .await;

        // Assert
        assert!(matches!(from_lobby, Err(DomainError::InvalidArgument(_))));
        assert!(matches!(
            start_from_group,
            Err(DomainError::InvalidArgument(_))
        ));
        assert!(start_from_control.is_ok());
        assert!(damage_from_group.is_ok());
    }

    #[tokio::test]
    async fn test_group_commands_require_configured_category() {
        let (coordinator, _) = coordinator();

        let result = execute(
            &coordinator,
            MissionCommand::new(COMMUNITY, MissionAction::CreateGroups { count: 2 }),
        )
        .await;

        assert!(matches!(result, Err(DomainError::LookupFailed(_))));
    }
}
