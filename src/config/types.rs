//! Core configuration types and loading.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::error;

use regex::Regex;

use super::defaults::{
    default_command_prefix, default_port, default_realname, default_session_hours, default_true,
    default_username,
};
use super::users::UserBlock;

static PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^[^\w\s]+$").unwrap()
});

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Connection and command settings.
    pub server: ServerConfig,
    /// Names the bot answers to.
    #[serde(default)]
    pub identity: IdentityConfig,
    /// Session policy for the auth collaborator.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Free-form per-plugin tables, keyed by plugin name.
    #[serde(default)]
    pub plugins: HashMap<String, toml::Table>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = content.parse()?;
        Ok(config)
    }

    /// Nicks used for mention detection: the identity name then its aliases.
    pub fn identity_nicks(&self) -> Vec<String> {
        let name = self
            .identity
            .name
            .clone()
            .unwrap_or_else(|| self.server.nick.clone());

        std::iter::once(name)
            .chain(
                self.identity
                    .aliases
                    .iter()
                    .map(|a| a.trim().to_lowercase()),
            )
            .filter(|n| !n.is_empty())
            .collect()
    }
}

impl FromStr for Config {
    type Err = toml::de::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s)
    }
}

/// IRC server connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Hostname to connect to.
    pub host: String,
    /// Port to connect to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Nickname to register with.
    pub nick: String,
    /// Username (ident) sent with USER.
    #[serde(default = "default_username")]
    pub username: String,
    /// Realname sent with USER.
    #[serde(default = "default_realname")]
    pub realname: String,
    /// Optional server password sent with PASS.
    pub password: Option<String>,
    /// Text that introduces a command line.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    /// Send usage errors to the channel instead of noticing the caller.
    #[serde(default)]
    pub public_errors: bool,
    /// Channels to join after registration.
    #[serde(default)]
    pub channels: Vec<String>,
}

impl ServerConfig {
    /// The command prefix, or `None` when it is not one or more
    /// non-word, non-space characters. An invalid prefix disables commands.
    pub fn validated_prefix(&self) -> Option<String> {
        if PREFIX_RE.is_match(&self.command_prefix) {
            Some(self.command_prefix.clone())
        } else {
            error!(
                prefix = %self.command_prefix,
                "invalid command prefix; commands are disabled"
            );
            None
        }
    }
}

/// Bot identity configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentityConfig {
    /// Primary name, defaults to the server nick.
    pub name: Option<String>,
    /// Other names the bot answers to.
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Session policy.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session lifetime in hours.
    #[serde(default = "default_session_hours")]
    pub session_hours: u64,
    /// Whether a successful check extends the session.
    #[serde(default = "default_true")]
    pub refresh_on_access: bool,
    /// Accounts that may log in, keyed by account name.
    #[serde(default)]
    pub users: HashMap<String, UserBlock>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_hours: default_session_hours(),
            refresh_on_access: true,
            users: HashMap::new(),
        }
    }
}
