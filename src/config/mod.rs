//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Config struct definitions (Config, ServerConfig, IdentityConfig, AuthConfig)
//! - [`defaults`]: serde default helpers
//! - [`users`]: `[auth.users.<name>]` account blocks
//! - [`validation`]: startup checks that report every problem at once

mod defaults;
mod types;
mod users;
mod validation;

pub use types::{AuthConfig, Config, ConfigError, IdentityConfig, ServerConfig};
pub use users::UserBlock;
pub use validation::{ValidationError, validate};
