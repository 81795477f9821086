//! The per-community coordinator.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use mission_channels::broadcast::{self, Delivery};
use mission_channels::config::TopologyConfig;
use mission_channels::registry::{ChannelGroupRegistry, CleanupReport};
use mission_core::clock::Clock;
use mission_core::error::DomainError;
use mission_core::ids::{ChannelId, CommunityId};
use mission_core::platform::{ChannelContext, MessagingPlatform};
use mission_core::repository::ResourceRepository;
use mission_core::rng::DeterministicRng;
use mission_session::application::command_handlers::{
    self, SessionMutation, handle_choose_narrative, handle_continue_latest, handle_end_session,
    handle_start_session,
};
use mission_session::application::query_handlers::{self, SessionView};
use mission_session::application::session_store::SessionStore;
use mission_session::domain::aggregates::Session;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, instrument, warn};

/// Session half of a community's state.
#[derive(Debug)]
struct SessionSlot {
    store: SessionStore,
    current: Option<Session>,
}

/// Everything the coordinator keeps for one community.
#[derive(Debug)]
struct CommunityState {
    session: AsyncMutex<SessionSlot>,
    /// `None` until the persisted topology has been read.
    groups: AsyncMutex<Option<ChannelGroupRegistry>>,
}

impl CommunityState {
    fn new(community: CommunityId, repo: Arc<dyn ResourceRepository>) -> Self {
        Self {
            session: AsyncMutex::new(SessionSlot {
                store: SessionStore::new(community, repo),
                current: None,
            }),
            groups: AsyncMutex::new(None),
        }
    }
}

/// Orchestrates sessions and channel groups for every community.
///
/// Community entries are created on first use and live for the life of the
/// process. The in-memory current session is a write-through cache: a
/// mutation is published only after the store accepted it.
pub struct MissionCoordinator {
    communities: DashMap<CommunityId, Arc<CommunityState>>,
    repo: Arc<dyn ResourceRepository>,
    platform: Arc<dyn MessagingPlatform>,
    clock: Arc<dyn Clock>,
    rng: Arc<Mutex<dyn DeterministicRng + Send>>,
    topology: TopologyConfig,
}

impl std::fmt::Debug for MissionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MissionCoordinator")
            .field("communities", &self.communities.len())
            .field("topology", &self.topology)
            .finish_non_exhaustive()
    }
}

impl MissionCoordinator {
    /// Creates a coordinator with no communities loaded.
    #[must_use]
    pub fn new(
        repo: Arc<dyn ResourceRepository>,
        platform: Arc<dyn MessagingPlatform>,
        clock: Arc<dyn Clock>,
        rng: Arc<Mutex<dyn DeterministicRng + Send>>,
        topology: TopologyConfig,
    ) -> Self {
        Self {
            communities: DashMap::new(),
            repo,
            platform,
            clock,
            rng,
            topology,
        }
    }

    #[must_use]
    pub fn topology(&self) -> &TopologyConfig {
        &self.topology
    }

    /// Number of communities with in-memory state.
    #[must_use]
    pub fn community_count(&self) -> usize {
        self.communities.len()
    }

    fn community(&self, community: CommunityId) -> Arc<CommunityState> {
        self.communities
            .entry(community)
            .or_insert_with(|| Arc::new(CommunityState::new(community, Arc::clone(&self.repo))))
            .value()
            .clone()
    }

    // --- sessions ---

    /// Starts a new session and makes it the community's current one.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidArgument` for a zero player count, or a
    /// persistence error.
    #[instrument(skip(self), fields(%community))]
    pub async fn start_session(
        &self,
        community: CommunityId,
        players: u32,
    ) -> Result<Session, DomainError> {
        let state = self.community(community);
        let mut slot = state.session.lock().await;
        let session =
            handle_start_session(players, self.clock.as_ref(), &*self.rng, &slot.store).await?;
        slot.current = Some(session.clone());
        Ok(session)
    }

    /// Makes the most recent running session current. Returns `None`, and
    /// clears the current session, if nothing is running.
    ///
    /// # Errors
    ///
    /// Returns a persistence error; the current session is unchanged then.
    #[instrument(skip(self), fields(%community))]
    pub async fn continue_session(
        &self,
        community: CommunityId,
    ) -> Result<Option<Session>, DomainError> {
        let state = self.community(community);
        let mut slot = state.session.lock().await;
        let latest = handle_continue_latest(&slot.store).await?;
        slot.current.clone_from(&latest);
        Ok(latest)
    }

    /// Ends the current session.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NoActiveSession` if there is no current
    /// session, or a persistence error (the session stays current).
    #[instrument(skip(self), fields(%community))]
    pub async fn end_session(&self, community: CommunityId) -> Result<Session, DomainError> {
        let state = self.community(community);
        let mut slot = state.session.lock().await;
        let current = slot
            .current
            .as_ref()
            .ok_or(DomainError::NoActiveSession(community))?;
        let ended = handle_end_session(current, self.clock.as_ref(), &slot.store).await?;
        slot.current = None;
        Ok(ended)
    }

    /// Sets the narrative of the current session, if it has none yet.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NoActiveSession`, `DomainError::InvalidArgument`
    /// for an unknown or second narrative, or a persistence error.
    #[instrument(skip(self), fields(%community))]
    pub async fn choose_narrative(
        &self,
        community: CommunityId,
        value: &str,
    ) -> Result<Session, DomainError> {
        let state = self.community(community);
        let mut slot = state.session.lock().await;
        let current = slot
            .current
            .as_ref()
            .ok_or(DomainError::NoActiveSession(community))?;
        let next = handle_choose_narrative(current, value, &slot.store).await?;
        slot.current = Some(next.clone());
        Ok(next)
    }

    /// Adds damage to the current session.
    ///
    /// # Errors
    ///
    /// See [`Self::apply`].
    pub async fn deal_damage(
        &self,
        community: CommunityId,
        amount: u32,
    ) -> Result<Session, DomainError> {
        self.apply(community, SessionMutation::DealDamage(amount))
            .await
    }

    /// Places clues on the current session's first act.
    ///
    /// # Errors
    ///
    /// See [`Self::apply`].
    pub async fn place_clues(
        &self,
        community: CommunityId,
        amount: u32,
    ) -> Result<Session, DomainError> {
        self.apply(community, SessionMutation::PlaceClues(amount))
            .await
    }

    /// Adds countermeasures to the current session.
    ///
    /// # Errors
    ///
    /// See [`Self::apply`].
    pub async fn gain_counter_measures(
        &self,
        community: CommunityId,
        amount: u32,
    ) -> Result<Session, DomainError> {
        self.apply(community, SessionMutation::GainCounterMeasures(amount))
            .await
    }

    /// Removes countermeasures from the current session without a bounds
    /// check. Callers check [`Self::can_spend_counter_measures`] first, or
    /// use [`Self::try_spend_counter_measures`].
    ///
    /// # Errors
    ///
    /// See [`Self::apply`].
    pub async fn spend_counter_measures(
        &self,
        community: CommunityId,
        amount: u32,
    ) -> Result<Session, DomainError> {
        self.apply(community, SessionMutation::SpendCounterMeasures(amount))
            .await
    }

    /// Checks affordability and spends under one lock acquisition, so two
    /// concurrent spends cannot both pass the check.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidArgument` if the pool holds fewer than
    /// `amount` countermeasures, otherwise as [`Self::apply`].
    #[instrument(skip(self), fields(%community))]
    pub async fn try_spend_counter_measures(
        &self,
        community: CommunityId,
        amount: u32,
    ) -> Result<Session, DomainError> {
        let state = self.community(community);
        let mut slot = state.session.lock().await;
        let current = slot
            .current
            .as_ref()
            .ok_or(DomainError::NoActiveSession(community))?;
        if !current.can_spend_counter_measures(amount) {
            return Err(DomainError::InvalidArgument(format!(
                "cannot spend {amount} countermeasures, only {} available",
                current.counter_measures()
            )));
        }
        let next = command_handlers::handle_mutation(
            current,
            SessionMutation::SpendCounterMeasures(amount),
            &slot.store,
        )
        .await?;
        slot.current = Some(next.clone());
        Ok(next)
    }

    /// `true` if a current session exists and holds at least `amount`
    /// countermeasures.
    pub async fn can_spend_counter_measures(&self, community: CommunityId, amount: u32) -> bool {
        self.read_session(community, |s| s.can_spend_counter_measures(amount))
            .await
            .unwrap_or(false)
    }

    /// Applies one counter mutation to the current session under the
    /// community's session lock and persists it before publishing.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NoActiveSession` without touching anything if
    /// there is no current session, or a persistence error, in which case
    /// the current session keeps its previous value.
    #[instrument(skip(self), fields(%community))]
    pub async fn apply(
        &self,
        community: CommunityId,
        mutation: SessionMutation,
    ) -> Result<Session, DomainError> {
        let state = self.community(community);
        let mut slot = state.session.lock().await;
        let current = slot
            .current
            .as_ref()
            .ok_or(DomainError::NoActiveSession(community))?;
        let next = command_handlers::handle_mutation(current, mutation, &slot.store).await?;
        slot.current = Some(next.clone());
        Ok(next)
    }

    /// Runs `read` against the current session, `None` if there is none.
    pub async fn read_session<T>(
        &self,
        community: CommunityId,
        read: impl FnOnce(&Session) -> T,
    ) -> Option<T> {
        let state = self.community(community);
        let slot = state.session.lock().await;
        slot.current.as_ref().map(read)
    }

    /// A copy of the current session, if any.
    pub async fn current_session(&self, community: CommunityId) -> Option<Session> {
        self.read_session(community, Clone::clone).await
    }

    /// Every stored session of the community, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a persistence error.
    pub async fn session_history(
        &self,
        community: CommunityId,
    ) -> Result<Vec<SessionView>, DomainError> {
        let state = self.community(community);
        let slot = state.session.lock().await;
        query_handlers::get_session_history(&slot.store).await
    }

    // --- channel groups ---

    async fn loaded<'a>(
        &self,
        community: CommunityId,
        slot: &'a mut Option<ChannelGroupRegistry>,
    ) -> Result<&'a mut ChannelGroupRegistry, DomainError> {
        let registry = match slot.take() {
            Some(registry) => registry,
            None => ChannelGroupRegistry::load(community, self.repo.as_ref()).await?,
        };
        Ok(slot.insert(registry))
    }

    /// Creates `count` groups under the configured category.
    ///
    /// # Errors
    ///
    /// See [`ChannelGroupRegistry::create_groups`].
    #[instrument(skip(self), fields(%community))]
    pub async fn create_groups(
        &self,
        community: CommunityId,
        count: u32,
    ) -> Result<Vec<ChannelId>, DomainError> {
        let state = self.community(community);
        let mut groups = state.groups.lock().await;
        self.loaded(community, &mut groups)
            .await?
            .create_groups(
                count,
                &self.topology,
                self.platform.as_ref(),
                self.repo.as_ref(),
            )
            .await
    }

    /// Deletes every group channel of the community.
    ///
    /// # Errors
    ///
    /// See [`ChannelGroupRegistry::clean_groups`].
    #[instrument(skip(self), fields(%community))]
    pub async fn clean_groups(&self, community: CommunityId) -> Result<CleanupReport, DomainError> {
        let state = self.community(community);
        let mut groups = state.groups.lock().await;
        self.loaded(community, &mut groups)
            .await?
            .clean_groups(self.platform.as_ref(), self.repo.as_ref())
            .await
    }

    /// `true` while the community has group channels.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the topology has to be loaded and
    /// cannot be.
    pub async fn groups_running(&self, community: CommunityId) -> Result<bool, DomainError> {
        let state = self.community(community);
        let mut groups = state.groups.lock().await;
        Ok(self.loaded(community, &mut groups).await?.is_running())
    }

    /// The community's tracked group channel ids.
    ///
    /// # Errors
    ///
    /// As [`Self::groups_running`].
    pub async fn group_channels(
        &self,
        community: CommunityId,
    ) -> Result<Vec<ChannelId>, DomainError> {
        let state = self.community(community);
        let mut groups = state.groups.lock().await;
        Ok(self.loaded(community, &mut groups).await?.channels().to_vec())
    }

    /// Sends `content` to every group channel not in `exclude` and to the
    /// control channel. The topology is snapshotted under the groups lock;
    /// sending happens outside it.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the topology cannot be loaded, or the
    /// platform error if channels cannot be listed. Per-channel failures are
    /// reported in the returned deliveries.
    #[instrument(skip(self, content), fields(%community))]
    pub async fn broadcast(
        &self,
        community: CommunityId,
        content: &str,
        exclude: &[ChannelId],
    ) -> Result<Vec<Delivery>, DomainError> {
        let groups = self.group_channels(community).await?;
        broadcast::broadcast(
            community,
            &groups,
            content,
            exclude,
            &self.topology,
            self.platform.as_ref(),
        )
        .await
    }

    #[must_use]
    pub fn is_group_channel(&self, channel: &ChannelContext) -> bool {
        self.topology.is_group_channel(channel)
    }

    #[must_use]
    pub fn is_admin_channel(&self, channel: &ChannelContext) -> bool {
        self.topology.is_admin_channel(channel)
    }

    /// Reads the persisted topology of every community the platform reports.
    /// A community whose topology cannot be read is logged and skipped; it
    /// is retried lazily on first use.
    ///
    /// # Errors
    ///
    /// Returns the platform error if communities cannot be listed.
    #[instrument(skip(self))]
    pub async fn load_topologies(&self) -> Result<usize, DomainError> {
        let communities = self.platform.communities().await?;
        let mut loaded = 0;
        for community in communities {
            match ChannelGroupRegistry::load(community, self.repo.as_ref()).await {
                Ok(registry) => {
                    let state = self.community(community);
                    *state.groups.lock().await = Some(registry);
                    loaded += 1;
                }
                Err(e) => {
                    warn!(%community, error = %e, "channel groups could not be loaded");
                }
            }
        }
        info!(communities = loaded, "channel group topologies loaded");
        Ok(loaded)
    }
}
