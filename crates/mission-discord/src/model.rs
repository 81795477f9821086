//! Discord REST payloads.

use mission_core::ids::{ChannelId, CommunityId};
use mission_core::platform::{ChannelInfo, ChannelKind};
use serde::{Deserialize, Serialize};

pub const GUILD_TEXT: u8 = 0;
pub const GUILD_VOICE: u8 = 2;
pub const GUILD_CATEGORY: u8 = 4;

/// Longest message body Discord accepts.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Partial guild, as returned by `GET /users/@me/guilds`.
#[derive(Debug, Clone, Deserialize)]
pub struct PartialGuild {
    pub id: CommunityId,
    #[serde(default)]
    pub name: String,
}

/// Guild channel, as returned by `GET /guilds/{id}/channels`.
#[derive(Debug, Clone, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parent_id: Option<ChannelId>,
}

impl Channel {
    /// Maps to the platform view. Channel types the engine does not work
    /// with (announcement, stage, forum, threads) map to `None`.
    #[must_use]
    pub fn into_info(self) -> Option<ChannelInfo> {
        let kind = match self.kind {
            GUILD_TEXT => ChannelKind::Text,
            GUILD_VOICE => ChannelKind::Voice,
            GUILD_CATEGORY => ChannelKind::Category,
            _ => return None,
        };
        Some(ChannelInfo {
            id: self.id,
            name: self.name.unwrap_or_default(),
            kind,
            parent_id: self.parent_id,
        })
    }
}

#[must_use]
pub fn kind_code(kind: ChannelKind) -> u8 {
    match kind {
        ChannelKind::Text => GUILD_TEXT,
        ChannelKind::Voice => GUILD_VOICE,
        ChannelKind::Category => GUILD_CATEGORY,
    }
}

/// Body of `POST /guilds/{id}/channels`.
#[derive(Debug, Serialize)]
pub struct CreateChannel<'a> {
    pub name: &'a str,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ChannelId>,
}

/// Body of `POST /channels/{id}/messages`.
#[derive(Debug, Serialize)]
pub struct CreateMessage<'a> {
    pub content: &'a str,
}

/// Body of a 429 response.
#[derive(Debug, Deserialize)]
pub struct RateLimited {
    /// Seconds to wait before retrying.
    pub retry_after: f64,
}
