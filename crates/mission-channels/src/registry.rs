//! Per-community channel-group registry.
//!
//! The registry owns the flat list of channel ids created for the event's
//! groups and persists it under [`CHANNEL_GROUPS_KEY`] after every change.

use mission_core::error::DomainError;
use mission_core::ids::{ChannelId, CommunityId};
use mission_core::platform::{ChannelKind, Deletion, MessagingPlatform, NewChannel};
use mission_core::repository::ResourceRepository;
use tracing::{debug, info, warn};

use crate::config::TopologyConfig;

/// Resource key holding a community's group channel ids.
pub const CHANNEL_GROUPS_KEY: &str = "channel-groups";

/// Name of the text channel for group `number`.
#[must_use]
pub fn text_channel_name(number: u32) -> String {
    format!("group-{number}")
}

/// Name of the voice channel for group `number`.
#[must_use]
pub fn voice_channel_name(number: u32) -> String {
    format!("Group {number}")
}

/// What a cleanup did to each tracked channel.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    /// Channels deleted.
    pub deleted: Vec<ChannelId>,
    /// Channels that no longer existed.
    pub already_gone: Vec<ChannelId>,
    /// Channels whose deletion failed. They are no longer tracked.
    pub failed: Vec<ChannelId>,
}

/// The live group channels of one community.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelGroupRegistry {
    community: CommunityId,
    channels: Vec<ChannelId>,
}

impl ChannelGroupRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new(community: CommunityId) -> Self {
        Self {
            community,
            channels: Vec::new(),
        }
    }

    /// Loads the persisted registry of `community`, empty if none is stored.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Persistence` if the read fails or the stored
    /// list cannot be decoded.
    pub async fn load(
        community: CommunityId,
        repo: &dyn ResourceRepository,
    ) -> Result<Self, DomainError> {
        if !repo.exists(community, CHANNEL_GROUPS_KEY).await? {
            return Ok(Self::new(community));
        }
        let Some(bytes) = repo.read(community, CHANNEL_GROUPS_KEY).await? else {
            return Ok(Self::new(community));
        };
        let channels: Vec<ChannelId> = serde_json::from_slice(&bytes).map_err(|e| {
            DomainError::Persistence(format!(
                "channel groups of community {community} are corrupt: {e}"
            ))
        })?;
        debug!(%community, channels = channels.len(), "channel groups loaded");
        Ok(Self {
            community,
            channels,
        })
    }

    #[must_use]
    pub fn community(&self) -> CommunityId {
        self.community
    }

    /// Tracked channel ids, in creation order.
    #[must_use]
    pub fn channels(&self) -> &[ChannelId] {
        &self.channels
    }

    /// `true` while any group channel is tracked.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.channels.is_empty()
    }

    /// Creates `count` numbered groups, each a text and a voice channel,
    /// under the configured category and returns the new ids.
    ///
    /// Channels created before a platform failure stay tracked and are
    /// persisted, so a later cleanup removes them.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidArgument` for a zero count or while
    /// groups already exist, `DomainError::ConfigurationMissing` if no category is configured,
    /// `DomainError::LookupFailed` if the category does not exist, or the
    /// platform/persistence error that stopped the run.
    pub async fn create_groups(
        &mut self,
        count: u32,
        config: &TopologyConfig,
        platform: &dyn MessagingPlatform,
        repo: &dyn ResourceRepository,
    ) -> Result<Vec<ChannelId>, DomainError> {
        if count == 0 {
            return Err(DomainError::InvalidArgument(
                "at least one group is required".into(),
            ));
        }
        if self.is_running() {
            return Err(DomainError::InvalidArgument(format!(
                "{} group channels already exist; clean them up first",
                self.channels.len()
            )));
        }
        config.require_category()?;
        let existing = platform.channels(self.community).await?;
        let category = config.find_category(&existing)?.id;

        let mut created = Vec::new();
        let mut failure = None;
        'groups: for number in 1..=count {
            for (name, kind) in [
                (text_channel_name(number), ChannelKind::Text),
                (voice_channel_name(number), ChannelKind::Voice),
            ] {
                let request = NewChannel {
                    name,
                    kind,
                    parent_id: Some(category),
                };
                match platform.create_channel(self.community, request).await {
                    Ok(id) => created.push(id),
                    Err(e) => {
                        warn!(community = %self.community, group = number, error = %e, "group channel creation failed");
                        failure = Some(e);
                        break 'groups;
                    }
                }
            }
        }

        self.channels.extend_from_slice(&created);
        if !created.is_empty() {
            self.persist(repo).await?;
        }
        if let Some(e) = failure {
            return Err(e);
        }

        info!(community = %self.community, groups = count, channels = created.len(), "channel groups created");
        Ok(created)
    }

    /// Deletes every tracked channel, then clears and persists the list.
    ///
    /// Channels that no longer exist are skipped. A failed deletion is
    /// logged and does not stop the others. On an empty registry nothing is
    /// touched.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the empty list cannot be written; the
    /// registry keeps tracking its channels in that case.
    pub async fn clean_groups(
        &mut self,
        platform: &dyn MessagingPlatform,
        repo: &dyn ResourceRepository,
    ) -> Result<CleanupReport, DomainError> {
        let mut report = CleanupReport::default();
        if self.channels.is_empty() {
            return Ok(report);
        }

        for &channel in &self.channels {
            match platform.delete_channel(channel).await {
                Ok(Deletion::Deleted) => report.deleted.push(channel),
                Ok(Deletion::AlreadyGone) => {
                    debug!(community = %self.community, %channel, "group channel already gone");
                    report.already_gone.push(channel);
                }
                Err(e) => {
                    warn!(community = %self.community, %channel, error = %e, "group channel deletion failed");
                    report.failed.push(channel);
                }
            }
        }

        let remaining = std::mem::take(&mut self.channels);
        if let Err(e) = self.persist(repo).await {
            self.channels = remaining;
            return Err(e);
        }

        info!(
            community = %self.community,
            deleted = report.deleted.len(),
            already_gone = report.already_gone.len(),
            failed = report.failed.len(),
            "channel groups cleaned"
        );
        Ok(report)
    }

    async fn persist(&self, repo: &dyn ResourceRepository) -> Result<(), DomainError> {
        let bytes = serde_json::to_vec(&self.channels)
            .map_err(|e| DomainError::Persistence(format!("channel group encoding failed: {e}")))?;
        repo.write(self.community, CHANNEL_GROUPS_KEY, &bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mission_test_support::{
        FailingResourceRepository, InMemoryResourceRepository, RecordingPlatform,
    };

    const COMMUNITY: CommunityId = CommunityId(300);

    fn config() -> TopologyConfig {
        TopologyConfig {
            category_name: Some("Blob Event".into()),
            admin_channel_name: Some("control".into()),
        }
    }

    fn platform_with_category() -> (RecordingPlatform, ChannelId) {
        let platform = RecordingPlatform::new();
        let category = platform.add_channel(COMMUNITY, "Blob Event", ChannelKind::Category, None);
        (platform, category)
    }

    #[tokio::test]
    async fn test_create_groups_creates_text_and_voice_pairs_under_category() {
        // Arrange
        let (platform, category) = platform_with_category();
        let repo = InMemoryResourceRepository::new();
        let mut registry = ChannelGroupRegistry::new(COMMUNITY);

        // Act
        let created = registry
            .create_groups(3, &config(), &platform, &repo)
            .await
            .unwrap();

        // Assert
        assert_eq!(created.len(), 6);
        assert_eq!(registry.channels(), created.as_slice());
        assert!(registry.is_running());

        let channels = platform.channels_of(COMMUNITY);
        let names: Vec<(&str, ChannelKind)> = channels
            .iter()
            .filter(|c| c.parent_id == Some(category))
            .map(|c| (c.name.as_str(), c.kind))
            .collect();
        assert_eq!(
            names,
            vec![
                ("group-1", ChannelKind::Text),
                ("Group 1", ChannelKind::Voice),
                ("group-2", ChannelKind::Text),
                ("Group 2", ChannelKind::Voice),
                ("group-3", ChannelKind::Text),
                ("Group 3", ChannelKind::Voice),
            ]
        );

        let reloaded = ChannelGroupRegistry::load(COMMUNITY, &repo).await.unwrap();
        assert_eq!(reloaded, registry);
    }

    #[tokio::test]
    async fn test_create_groups_requires_configured_category() {
        let (platform, _) = platform_with_category();
        let repo = InMemoryResourceRepository::new();
        let mut registry = ChannelGroupRegistry::new(COMMUNITY);

        let result = registry
            .create_groups(2, &TopologyConfig::default(), &platform, &repo)
            .await;

        assert!(matches!(result, Err(DomainError::ConfigurationMissing(_))));
        assert!(platform.created().is_empty());
    }

    #[tokio::test]
    async fn test_create_groups_fails_when_category_is_missing() {
        let platform = RecordingPlatform::new();
        platform.add_community(COMMUNITY);
        let repo = InMemoryResourceRepository::new();
        let mut registry = ChannelGroupRegistry::new(COMMUNITY);

        let result = registry.create_groups(2, &config(), &platform, &repo).await;

        assert!(matches!(result, Err(DomainError::LookupFailed(_))));
        assert!(!registry.is_running());
        assert_eq!(repo.write_count(), 0);
    }

    #[tokio::test]
    async fn test_create_groups_rejects_zero_count() {
        let (platform, _) = platform_with_category();
        let repo = InMemoryResourceRepository::new();
        let mut registry = ChannelGroupRegistry::new(COMMUNITY);

        let result = registry.create_groups(0, &config(), &platform, &repo).await;

        assert!(matches!(result, Err(DomainError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_create_groups_rejects_second_run_while_groups_exist() {
        // Arrange
        let (platform, _) = platform_with_category();
        let repo = InMemoryResourceRepository::new();
        let mut registry = ChannelGroupRegistry::new(COMMUNITY);
        let first = registry
            .create_groups(2, &config(), &platform, &repo)
            .await
            .unwrap();
        let writes = repo.write_count();

        // Act
        let second = registry.create_groups(2, &config(), &platform, &repo).await;

        // Assert
        assert!(matches!(second, Err(DomainError::InvalidArgument(_))));
        assert_eq!(registry.channels(), first.as_slice());
        assert_eq!(platform.created().len(), 4);
        assert_eq!(repo.write_count(), writes);
    }

    #[tokio::test]
    async fn test_create_groups_is_allowed_again_after_cleanup() {
        let (platform, _) = platform_with_category();
        let repo = InMemoryResourceRepository::new();
        let mut registry = ChannelGroupRegistry::new(COMMUNITY);
        registry
            .create_groups(1, &config(), &platform, &repo)
            .await
            .unwrap();
        registry.clean_groups(&platform, &repo).await.unwrap();

        let recreated = registry.create_groups(1, &config(), &platform, &repo).await;

        assert_eq!(recreated.unwrap().len(), 2);
        assert_eq!(registry.channels().len(), 2);
    }

    #[tokio::test]
    async fn test_create_groups_keeps_partial_progress_on_platform_failure() {
        // Arrange
        let (platform, _) = platform_with_category();
        platform.fail_creates_after(3);
        let repo = InMemoryResourceRepository::new();
        let mut registry = ChannelGroupRegistry::new(COMMUNITY);

        // Act
        let result = registry.create_groups(3, &config(), &platform, &repo).await;

        // Assert
        assert!(matches!(result, Err(DomainError::Platform(_))));
        assert_eq!(registry.channels(), platform.created().as_slice());
        assert_eq!(registry.channels().len(), 3);
        let reloaded = ChannelGroupRegistry::load(COMMUNITY, &repo).await.unwrap();
        assert_eq!(reloaded.channels().len(), 3);
    }

    #[tokio::test]
    async fn test_clean_groups_deletes_every_created_channel_and_clears_list() {
        // Arrange
        let (platform, _) = platform_with_category();
        let repo = InMemoryResourceRepository::new();
        let mut registry = ChannelGroupRegistry::new(COMMUNITY);
        let created = registry
            .create_groups(3, &config(), &platform, &repo)
            .await
            .unwrap();

        // Act
        let report = registry.clean_groups(&platform, &repo).await.unwrap();

        // Assert
        assert_eq!(platform.delete_attempts(), created);
        assert_eq!(report.deleted, created);
        assert!(!registry.is_running());
        let reloaded = ChannelGroupRegistry::load(COMMUNITY, &repo).await.unwrap();
        assert!(reloaded.channels().is_empty());

        // A second cleanup is a no-op.
        let second = registry.clean_groups(&platform, &repo).await.unwrap();
        assert_eq!(second, CleanupReport::default());
        assert_eq!(platform.delete_attempts().len(), 6);
    }

    #[tokio::test]
    async fn test_clean_groups_skips_missing_and_isolates_failures() {
        // Arrange
        let (platform, _) = platform_with_category();
        let repo = InMemoryResourceRepository::new();
        let mut registry = ChannelGroupRegistry::new(COMMUNITY);
        let created = registry
            .create_groups(2, &config(), &platform, &repo)
            .await
            .unwrap();
        platform.remove_channel(created[0]);
        platform.fail_deletes_of(created[1]);

        // Act
        let report = registry.clean_groups(&platform, &repo).await.unwrap();

        // Assert
        assert_eq!(report.already_gone, vec![created[0]]);
        assert_eq!(report.failed, vec![created[1]]);
        assert_eq!(report.deleted, created[2..].to_vec());
        assert!(!registry.is_running());
    }

    #[tokio::test]
    async fn test_clean_groups_keeps_tracking_when_persist_fails() {
        let (platform, _) = platform_with_category();
        let repo = InMemoryResourceRepository::new();
        let mut registry = ChannelGroupRegistry::new(COMMUNITY);
        registry
            .create_groups(1, &config(), &platform, &repo)
            .await
            .unwrap();

        let result = registry
            .clean_groups(&platform, &FailingResourceRepository)
            .await;

        assert!(matches!(result, Err(DomainError::Persistence(_))));
        assert_eq!(registry.channels().len(), 2);
    }

    #[tokio::test]
    async fn test_load_returns_empty_registry_when_nothing_stored() {
        let repo = InMemoryResourceRepository::new();

        let registry = ChannelGroupRegistry::load(COMMUNITY, &repo).await.unwrap();

        assert!(!registry.is_running());
    }
}
