//! Broadcast fan-out to group channels and the control channel.

use std::collections::HashSet;

use mission_core::error::DomainError;
use mission_core::ids::{ChannelId, CommunityId};
use mission_core::platform::{ChannelKind, MessagingPlatform};
use tracing::{debug, info, warn};

use crate::config::TopologyConfig;

/// Result of sending to one channel.
#[derive(Debug)]
pub struct Delivery {
    /// The destination channel.
    pub channel: ChannelId,
    /// `true` for the control channel.
    pub admin: bool,
    /// The send outcome.
    pub result: Result<(), DomainError>,
}

impl Delivery {
    #[must_use]
    pub fn delivered(&self) -> bool {
        self.result.is_ok()
    }
}

/// Sends `content` to every live text channel in `groups` not listed in
/// `exclude`, then to the control channel when it can be found.
///
/// Sends are independent: a failure on one channel is recorded in its
/// [`Delivery`] and the others still go out.
///
/// # Errors
///
/// Returns the platform error if the community's channels cannot be listed;
/// nothing is sent in that case.
pub async fn broadcast(
    community: CommunityId,
    groups: &[ChannelId],
    content: &str,
    exclude: &[ChannelId],
    config: &TopologyConfig,
    platform: &dyn MessagingPlatform,
) -> Result<Vec<Delivery>, DomainError> {
    let live = platform.channels(community).await?;
    let excluded: HashSet<ChannelId> = exclude.iter().copied().collect();

    let mut targets: Vec<(ChannelId, bool)> = groups
        .iter()
        .filter(|id| !excluded.contains(*id))
        .filter(|id| {
            live.iter()
                .any(|c| c.id == **id && c.kind == ChannelKind::Text)
        })
        .map(|id| (*id, false))
        .collect();

    match config.find_admin_channel(&live) {
        Some(admin) if !targets.iter().any(|(id, _)| *id == admin.id) => {
            targets.push((admin.id, true));
        }
        Some(_) => {}
        None => debug!(%community, "no control channel to broadcast to"),
    }

    let mut deliveries = Vec::with_capacity(targets.len());
    for (channel, admin) in targets {
        let result = platform.send(channel, content).await;
        if let Err(e) = &result {
            warn!(%community, %channel, error = %e, "broadcast delivery failed");
        }
        deliveries.push(Delivery {
            channel,
            admin,
            result,
        });
    }

    info!(
        %community,
        targets = deliveries.len(),
        failed = deliveries.iter().filter(|d| !d.delivered()).count(),
        "broadcast sent"
    );
    Ok(deliveries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mission_test_support::{InMemoryResourceRepository, RecordingPlatform, SentMessage};

    use crate::registry::ChannelGroupRegistry;

    const COMMUNITY: CommunityId = CommunityId(12);

    fn config() -> TopologyConfig {
        TopologyConfig {
            category_name: Some("Blob Event".into()),
            admin_channel_name: Some("control".into()),
        }
    }

    async fn running_groups(platform: &RecordingPlatform, count: u32) -> Vec<ChannelId> {
        let repo = InMemoryResourceRepository::new();
        let mut registry = ChannelGroupRegistry::new(COMMUNITY);
        registry
            .create_groups(count, &config(), platform, &repo)
            .await
            .unwrap()
    }

    fn setup() -> (RecordingPlatform, ChannelId) {
        let platform = RecordingPlatform::new();
        let category = platform.add_channel(COMMUNITY, "Blob Event", ChannelKind::Category, None);
        let admin = platform.add_channel(COMMUNITY, "control", ChannelKind::Text, Some(category));
        (platform, admin)
    }

    #[tokio::test]
    async fn test_broadcast_reaches_text_channels_and_control_channel() {
        // Arrange
        let (platform, admin) = setup();
        let groups = running_groups(&platform, 2).await;

        // Act
        let deliveries = broadcast(COMMUNITY, &groups, "Act 2 begins", &[], &config(), &platform)
            .await
            .unwrap();

        // Assert
        let sent: Vec<ChannelId> = platform.sent().iter().map(|m| m.channel).collect();
        assert_eq!(sent, vec![groups[0], groups[2], admin]);
        assert!(deliveries.iter().all(Delivery::delivered));
        assert!(deliveries.last().unwrap().admin);
    }

    #[tokio::test]
    async fn test_broadcast_skips_excluded_groups() {
        // Arrange
        let (platform, admin) = setup();
        let groups = running_groups(&platform, 3).await;
        let texts = [groups[0], groups[2], groups[4]];

        // Act
        broadcast(COMMUNITY, &groups, "hello", &[texts[1]], &config(), &platform)
            .await
            .unwrap();

        // Assert
        let sent = platform.sent();
        assert_eq!(
            sent,
            vec![
                SentMessage {
                    channel: texts[0],
                    content: "hello".into()
                },
                SentMessage {
                    channel: texts[2],
                    content: "hello".into()
                },
                SentMessage {
                    channel: admin,
                    content: "hello".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_broadcast_isolates_failing_channel() {
        // Arrange
        let (platform, admin) = setup();
        let groups = running_groups(&platform, 2).await;
        platform.fail_sends_to(groups[0]);

        // Act
        let deliveries = broadcast(COMMUNITY, &groups, "hi", &[], &config(), &platform)
            .await
            .unwrap();

        // Assert
        assert_eq!(deliveries.len(), 3);
        assert!(!deliveries[0].delivered());
        let sent: Vec<ChannelId> = platform.sent().iter().map(|m| m.channel).collect();
        assert_eq!(sent, vec![groups[2], admin]);
    }

    #[tokio::test]
    async fn test_broadcast_without_control_channel_only_hits_groups() {
        let platform = RecordingPlatform::new();
        platform.add_channel(COMMUNITY, "Blob Event", ChannelKind::Category, None);
        let groups = running_groups(&platform, 1).await;

        let deliveries = broadcast(COMMUNITY, &groups, "hi", &[], &config(), &platform)
            .await
            .unwrap();

        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].channel, groups[0]);
        assert!(!deliveries[0].admin);
    }

    #[tokio::test]
    async fn test_broadcast_skips_channels_deleted_outside_the_engine() {
        let (platform, admin) = setup();
        let groups = running_groups(&platform, 2).await;
        platform.remove_channel(groups[2]);

        broadcast(COMMUNITY, &groups, "hi", &[], &config(), &platform)
            .await
            .unwrap();

        let sent: Vec<ChannelId> = platform.sent().iter().map(|m| m.channel).collect();
        assert_eq!(sent, vec![groups[0], admin]);
    }
}
