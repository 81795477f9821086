//! Discord REST client implementing `MessagingPlatform`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use mission_core::error::DomainError;
use mission_core::ids::{ChannelId, CommunityId};
use mission_core::platform::{ChannelInfo, Deletion, MessagingPlatform, NewChannel};

use crate::model::{
    Channel, CreateChannel, CreateMessage, MAX_MESSAGE_LENGTH, PartialGuild, RateLimited,
    kind_code,
};

/// Default Discord REST base URL.
pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ATTEMPTS: u32 = 3;
const MAX_RETRY_WAIT_SECS: f64 = 10.0;
const GUILD_PAGE_SIZE: usize = 200;

/// Talks to the Discord REST API with a bot token.
#[derive(Debug, Clone)]
pub struct DiscordPlatform {
    client: Client,
    base_url: String,
}

impl DiscordPlatform {
    /// Creates a client for `base_url` authenticating as the bot `token`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConfigurationMissing` for an empty or
    /// malformed token, or `DomainError::Platform` if the HTTP client
    /// cannot be built.
    pub fn new(token: &str, base_url: &str) -> Result<Self, DomainError> {
        if token.trim().is_empty() {
            return Err(DomainError::ConfigurationMissing("discord bot token".into()));
        }
        let mut auth = HeaderValue::from_str(&format!("Bot {}", token.trim()))
            .map_err(|_| DomainError::ConfigurationMissing("valid discord bot token".into()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!(
                "DiscordBot (https://github.com/mission-control, ",
                env!("CARGO_PKG_VERSION"),
                ")"
            )),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DomainError::Platform(format!("http client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends the request built by `build`, retrying on 429 after the
    /// advertised delay.
    async fn dispatch(
        &self,
        what: &str,
        build: impl Fn() -> RequestBuilder,
    ) -> Result<Response, DomainError> {
        let mut attempt = 1;
        loop {
            let response = build()
                .send()
                .await
                .map_err(|e| DomainError::Platform(format!("{what}: {e}")))?;
            if response.status() != StatusCode::TOO_MANY_REQUESTS || attempt >= MAX_ATTEMPTS {
                return Ok(response);
            }
            let wait = response
                .json::<RateLimited>()
                .await
                .map_or(1.0, |r| r.retry_after)
                .clamp(0.0, MAX_RETRY_WAIT_SECS);
            warn!(what, attempt, retry_after = wait, "rate limited, retrying");
            tokio::time::sleep(Duration::from_secs_f64(wait)).await;
            attempt += 1;
        }
    }

    async fn success(what: &str, response: Response) -> Result<Response, DomainError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(DomainError::Platform(format!(
            "{what} failed with {status}: {body}"
        )))
    }

    async fn json<T: DeserializeOwned>(what: &str, response: Response) -> Result<T, DomainError> {
        Self::success(what, response)
            .await?
            .json()
            .await
            .map_err(|e| DomainError::Platform(format!("{what}: unexpected response: {e}")))
    }
}

#[async_trait]
impl MessagingPlatform for DiscordPlatform {
    async fn communities(&self) -> Result<Vec<CommunityId>, DomainError> {
        let mut communities = Vec::new();
        let mut after: Option<CommunityId> = None;
        loop {
            let mut query = vec![("limit", GUILD_PAGE_SIZE.to_string())];
            if let Some(last) = after {
                query.push(("after", last.to_string()));
            }
            let url = self.url("/users/@me/guilds");
            let response = self
                .dispatch("list guilds", || self.client.get(&url).query(&query))
                .await?;
            let page: Vec<PartialGuild> = Self::json("list guilds", response).await?;
            let full = page.len() == GUILD_PAGE_SIZE;
            after = page.last().map(|g| g.id);
            communities.extend(page.into_iter().map(|g| g.id));
            if !full {
                break;
            }
        }
        debug!(communities = communities.len(), "guilds listed");
        Ok(communities)
    }

    async fn channels(&self, community: CommunityId) -> Result<Vec<ChannelInfo>, DomainError> {
        let url = self.url(&format!("/guilds/{community}/channels"));
        let response = self
            .dispatch("list channels", || self.client.get(&url))
            .await?;
        let channels: Vec<Channel> = Self::json("list channels", response).await?;
        Ok(channels.into_iter().filter_map(Channel::into_info).collect())
    }

    async fn create_channel(
        &self,
        community: CommunityId,
        channel: NewChannel,
    ) -> Result<ChannelId, DomainError> {
        let url = self.url(&format!("/guilds/{community}/channels"));
        let body = CreateChannel {
            name: &channel.name,
            kind: kind_code(channel.kind),
            parent_id: channel.parent_id,
        };
        let response = self
            .dispatch("create channel", || self.client.post(&url).json(&body))
            .await?;
        let created: Channel = Self::json("create channel", response).await?;
        debug!(%community, channel = %created.id, name = %channel.name, "channel created");
        Ok(created.id)
    }

    async fn delete_channel(&self, channel: ChannelId) -> Result<Deletion, DomainError> {
        let url = self.url(&format!("/channels/{channel}"));
        let response = self
            .dispatch("delete channel", || self.client.delete(&url))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Deletion::AlreadyGone);
        }
        Self::success("delete channel", response).await?;
        Ok(Deletion::Deleted)
    }

    async fn send(&self, channel: ChannelId, content: &str) -> Result<(), DomainError> {
        if content.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(DomainError::InvalidArgument(format!(
                "message exceeds {MAX_MESSAGE_LENGTH} characters"
            )));
        }
        let url = self.url(&format!("/channels/{channel}/messages"));
        let body = CreateMessage { content };
        let response = self
            .dispatch("send message", || self.client.post(&url).json(&body))
            .await?;
        Self::success("send message", response).await?;
        Ok(())
    }
}
