//! Test platform: an in-memory `MessagingPlatform` that records every call.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use mission_core::error::DomainError;
use mission_core::ids::{ChannelId, CommunityId};
use mission_core::platform::{ChannelInfo, ChannelKind, Deletion, MessagingPlatform, NewChannel};

/// A message delivered through [`RecordingPlatform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// The destination channel.
    pub channel: ChannelId,
    /// The delivered content.
    pub content: String,
}

#[derive(Debug, Default)]
struct State {
    channels: HashMap<CommunityId, Vec<ChannelInfo>>,
    next_id: u64,
    created: Vec<ChannelId>,
    delete_attempts: Vec<ChannelId>,
    sent: Vec<SentMessage>,
    failing_sends: HashSet<ChannelId>,
    failing_deletes: HashSet<ChannelId>,
    creates_before_failure: Option<usize>,
}

/// An in-memory messaging platform.
///
/// Channel ids are allocated sequentially starting at 1000. Individual
/// channels can be made to fail on send or delete, and channel creation can
/// be made to fail after a number of successful creations.
#[derive(Debug)]
pub struct RecordingPlatform {
    state: Mutex<State>,
}

impl Default for RecordingPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingPlatform {
    /// Creates a platform with no communities.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 1000,
                ..State::default()
            }),
        }
    }

    /// Registers a community with no channels.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn add_community(&self, community: CommunityId) {
        self.state
            .lock()
            .unwrap()
            .channels
            .entry(community)
            .or_default();
    }

    /// Adds a pre-existing channel to a community and returns its id.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn add_channel(
        &self,
        community: CommunityId,
        name: &str,
        kind: ChannelKind,
        parent_id: Option<ChannelId>,
    ) -> ChannelId {
        let mut state = self.state.lock().unwrap();
        let id = ChannelId(state.next_id);
        state.next_id += 1;
        state.channels.entry(community).or_default().push(ChannelInfo {
            id,
            name: name.to_owned(),
            kind,
            parent_id,
        });
        id
    }

    /// Removes a channel as if it had been deleted outside the engine.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn remove_channel(&self, channel: ChannelId) {
        let mut state = self.state.lock().unwrap();
        for channels in state.channels.values_mut() {
            channels.retain(|c| c.id != channel);
        }
    }

    /// Makes every send to `channel` fail.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn fail_sends_to(&self, channel: ChannelId) {
        self.state.lock().unwrap().failing_sends.insert(channel);
    }

    /// Makes every delete of `channel` fail.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn fail_deletes_of(&self, channel: ChannelId) {
        self.state.lock().unwrap().failing_deletes.insert(channel);
    }

    /// Lets `count` further channel creations succeed, then fails the rest.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn fail_creates_after(&self, count: usize) {
        self.state.lock().unwrap().creates_before_failure = Some(count);
    }

    /// Ids of channels created through the platform API, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn created(&self) -> Vec<ChannelId> {
        self.state.lock().unwrap().created.clone()
    }

    /// Ids passed to `delete_channel`, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn delete_attempts(&self) -> Vec<ChannelId> {
        self.state.lock().unwrap().delete_attempts.clone()
    }

    /// Messages delivered successfully, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Current channels of a community.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn channels_of(&self, community: CommunityId) -> Vec<ChannelInfo> {
        self.state
            .lock()
            .unwrap()
            .channels
            .get(&community)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl MessagingPlatform for RecordingPlatform {
    async fn communities(&self) -> Result<Vec<CommunityId>, DomainError> {
        let mut communities: Vec<CommunityId> =
            self.state.lock().unwrap().channels.keys().copied().collect();
        communities.sort();
        Ok(communities)
    }

    async fn channels(&self, community: CommunityId) -> Result<Vec<ChannelInfo>, DomainError> {
        tokio::task::yield_now().await;
        Ok(self.channels_of(community))
    }

    async fn create_channel(
        &self,
        community: CommunityId,
        channel: NewChannel,
    ) -> Result<ChannelId, DomainError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().unwrap();
        if let Some(remaining) = state.creates_before_failure.as_mut() {
            if *remaining == 0 {
                return Err(DomainError::Platform("rate limited".into()));
            }
            *remaining -= 1;
        }
        let id = ChannelId(state.next_id);
        state.next_id += 1;
        state.created.push(id);
        state.channels.entry(community).or_default().push(ChannelInfo {
            id,
            name: channel.name,
            kind: channel.kind,
            parent_id: channel.parent_id,
        });
        Ok(id)
    }

    async fn delete_channel(&self, channel: ChannelId) -> Result<Deletion, DomainError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().unwrap();
        state.delete_attempts.push(channel);
        if state.failing_deletes.contains(&channel) {
            return Err(DomainError::Platform(format!("cannot delete {channel}")));
        }
        let mut found = false;
        for channels in state.channels.values_mut() {
            let before = channels.len();
            channels.retain(|c| c.id != channel);
            found |= channels.len() != before;
        }
        Ok(if found {
            Deletion::Deleted
        } else {
            Deletion::AlreadyGone
        })
    }

    async fn send(&self, channel: ChannelId, content: &str) -> Result<(), DomainError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().unwrap();
        if state.failing_sends.contains(&channel) {
            return Err(DomainError::Platform(format!("missing access to {channel}")));
        }
        state.sent.push(SentMessage {
            channel,
            content: content.to_owned(),
        });
        Ok(())
    }
}
