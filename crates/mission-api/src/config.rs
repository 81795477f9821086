//! Server configuration from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

use mission_channels::config::TopologyConfig;
use mission_discord::client::DEFAULT_API_BASE;

use crate::error::AppError;

/// Everything `main` needs to wire the server.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Selects the `PostgreSQL` store when set; the filesystem store under
    /// `data_dir` otherwise.
    pub database_url: Option<String>,
    pub data_dir: PathBuf,
    pub discord_token: String,
    pub discord_api_base: String,
    pub topology: TopologyConfig,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database_url.is_some())
            .field("data_dir", &self.data_dir)
            .field("discord_api_base", &self.discord_api_base)
            .field("topology", &self.topology)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DISCORD_TOKEN` is missing or `PORT`
    /// is not a valid port number.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`. Empty values count as
    /// unset.
    ///
    /// # Errors
    ///
    /// As [`Self::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?,
            None => 3000,
        };
        let discord_token = get("DISCORD_TOKEN").ok_or_else(|| {
            AppError::Config("DISCORD_TOKEN environment variable must be set".into())
        })?;

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            database_url: get("DATABASE_URL"),
            data_dir: get("DATA_DIR").map_or_else(|| PathBuf::from("./data"), PathBuf::from),
            discord_token,
            discord_api_base: get("DISCORD_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            topology: TopologyConfig {
                category_name: get("GROUP_CATEGORY_NAME"),
                admin_channel_name: get("ADMIN_CHANNEL_NAME"),
            },
        })
    }

    /// The address to bind.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `HOST:PORT` is not a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}
