//! Default value functions for configuration.

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

// =============================================================================
// Server Defaults
// =============================================================================

pub fn default_port() -> u16 {
    6667
}

pub fn default_username() -> String {
    "firefly".to_string()
}

pub fn default_realname() -> String {
    "Firefly IRC bot".to_string()
}

pub fn default_command_prefix() -> String {
    ">>>".to_string()
}

// =============================================================================
// Auth Defaults
// =============================================================================

pub fn default_session_hours() -> u64 {
    36
}
