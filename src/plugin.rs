//! The plugin capability.
//!
//! A plugin is a long-lived object that owns some state (settings, caches)
//! and exposes command and event handlers bound to it. Each plugin type is
//! constructed at most once per process by the [`Registry`](crate::registry::Registry)
//! from a [`PluginHandle`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::auth::Authenticator;
use crate::error::HandlerError;

/// Privilege needed to run a command or receive an event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Anyone.
    #[default]
    Guest,
    /// Any caller with an active session.
    User,
    /// Callers whose session belongs to the admin group.
    Admin,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "guest" => Ok(Self::Guest),
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown permission level: {other}")),
        }
    }
}

/// What a plugin is given at construction.
#[derive(Clone)]
pub struct PluginHandle {
    name: String,
    settings: toml::Table,
    identity: Arc<[String]>,
    auth: Arc<dyn Authenticator>,
}

impl PluginHandle {
    pub fn new(
        name: impl Into<String>,
        settings: toml::Table,
        identity: Arc<[String]>,
        auth: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            name: name.into(),
            settings,
            identity,
            auth,
        }
    }

    /// Normalized plugin name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw `[plugins.<name>]` table.
    pub fn settings(&self) -> &toml::Table {
        &self.settings
    }

    /// Deserialize the settings table into a typed struct.
    pub fn settings_as<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        Ok(toml::Value::Table(self.settings.clone()).try_into()?)
    }

    /// Names the bot answers to.
    pub fn identity(&self) -> &[String] {
        &self.identity
    }

    /// The session authority.
    pub fn auth(&self) -> &Arc<dyn Authenticator> {
        &self.auth
    }
}

impl fmt::Debug for PluginHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginHandle")
            .field("name", &self.name)
            .field("settings", &self.settings)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// Object-safe view of a loaded plugin.
pub trait Plugin: Send + Sync + 'static {
    /// Normalized plugin name; the first token of a command line.
    fn name(&self) -> &str;

    /// Permission applied to bindings that don't specify one.
    fn default_permission(&self) -> Permission {
        Permission::Guest
    }

    /// The handle the plugin was built from.
    fn handle(&self) -> &PluginHandle;
}

/// Construction side of the plugin capability.
pub trait PluginInit: Plugin + Sized {
    /// Name used for lookup before the plugin exists.
    const NAME: &'static str;

    fn init(handle: PluginHandle) -> Result<Self, HandlerError>;
}

/// Normalize a plugin or command name: lowercase, trimmed, spaces to underscores.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}
