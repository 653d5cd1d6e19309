//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("server.host is required")]
    MissingHost,
    #[error("server.nick is required")]
    MissingNick,
    #[error("server.port must be non-zero")]
    InvalidPort,
    #[error("auth.session_hours must be non-zero")]
    InvalidSessionLength,
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.host.trim().is_empty() {
        errors.push(ValidationError::MissingHost);
    }
    if config.server.nick.trim().is_empty() {
        errors.push(ValidationError::MissingNick);
    }
    if config.server.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }
    if config.auth.session_hours == 0 {
        errors.push(ValidationError::InvalidSessionLength);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
