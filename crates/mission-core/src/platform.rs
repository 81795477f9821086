//! Messaging platform abstraction.
//!
//! Every call is asynchronous and may fail independently of any other call;
//! callers that fan out (broadcast, cleanup) are expected to isolate
//! per-channel failures.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::{ChannelId, CommunityId};

/// The kind of a platform channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// A text channel that accepts messages.
    Text,
    /// A voice-capable channel.
    Voice,
    /// A category that parents other channels.
    Category,
}

/// A channel as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    /// The channel identifier.
    pub id: ChannelId,
    /// The channel name.
    pub name: String,
    /// The channel kind.
    pub kind: ChannelKind,
    /// The parent category, if any.
    pub parent_id: Option<ChannelId>,
}

/// Parameters for creating a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChannel {
    /// The channel name.
    pub name: String,
    /// The channel kind.
    pub kind: ChannelKind,
    /// The category to create the channel under.
    pub parent_id: Option<ChannelId>,
}

/// The channel a command originated from, as described by the dispatch
/// layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelContext {
    /// The channel identifier.
    pub id: ChannelId,
    /// The channel name.
    pub name: String,
    /// Name of the channel's parent category, if it has one.
    pub category: Option<String>,
}

/// Outcome of a channel deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    /// The channel existed and was removed.
    Deleted,
    /// The channel no longer existed.
    AlreadyGone,
}

/// Port to the messaging platform.
#[async_trait]
pub trait MessagingPlatform: Send + Sync {
    /// Lists every community the process is a member of.
    async fn communities(&self) -> Result<Vec<CommunityId>, DomainError>;

    /// Lists all channels of a community.
    async fn channels(&self, community: CommunityId) -> Result<Vec<ChannelInfo>, DomainError>;

    /// Creates a channel and returns its identifier.
    async fn create_channel(
        &self,
        community: CommunityId,
        channel: NewChannel,
    ) -> Result<ChannelId, DomainError>;

    /// Deletes a channel.
    async fn delete_channel(&self, channel: ChannelId) -> Result<Deletion, DomainError>;

    /// Sends text content to a channel.
    async fn send(&self, channel: ChannelId, content: &str) -> Result<(), DomainError>;
}
