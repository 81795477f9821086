//! Channel topology configuration.

use mission_core::error::DomainError;
use mission_core::platform::{ChannelContext, ChannelInfo, ChannelKind};

/// Names that locate the event's channels inside a community.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyConfig {
    /// Category that parents every group channel and the control channel.
    pub category_name: Option<String>,
    /// Name of the control channel inside that category.
    pub admin_channel_name: Option<String>,
}

impl TopologyConfig {
    /// Returns the configured category name.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConfigurationMissing` if it is unset.
    pub fn require_category(&self) -> Result<&str, DomainError> {
        self.category_name
            .as_deref()
            .ok_or_else(|| DomainError::ConfigurationMissing("group category name".into()))
    }

    /// `true` if the channel sits in the configured category.
    #[must_use]
    pub fn is_group_channel(&self, channel: &ChannelContext) -> bool {
        match (&self.category_name, &channel.category) {
            (Some(wanted), Some(actual)) => wanted == actual,
            _ => false,
        }
    }

    /// `true` if the channel is the control channel of the configured
    /// category.
    #[must_use]
    pub fn is_admin_channel(&self, channel: &ChannelContext) -> bool {
        self.is_group_channel(channel)
            && self
                .admin_channel_name
                .as_deref()
                .is_some_and(|name| name == channel.name)
    }

    /// Finds the configured category among a community's channels.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConfigurationMissing` if no category name is
    /// configured, or `DomainError::LookupFailed` if none matches.
    pub fn find_category<'a>(
        &self,
        channels: &'a [ChannelInfo],
    ) -> Result<&'a ChannelInfo, DomainError> {
        let name = self.require_category()?;
        channels
            .iter()
            .find(|c| c.kind == ChannelKind::Category && c.name == name)
            .ok_or_else(|| DomainError::LookupFailed(format!("category '{name}' not found")))
    }

    /// Finds the control channel among a community's channels, if both
    /// names are configured and it exists.
    #[must_use]
    pub fn find_admin_channel<'a>(&self, channels: &'a [ChannelInfo]) -> Option<&'a ChannelInfo> {
        let category = self.find_category(channels).ok()?;
        let name = self.admin_channel_name.as_deref()?;
        channels.iter().find(|c| {
            c.kind == ChannelKind::Text && c.name == name && c.parent_id == Some(category.id)
        })
    }
}
