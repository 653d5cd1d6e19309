//! Unified error handling for firefly.
//!
//! Errors are grouped by the layer that raises them. Inside the dispatch
//! path none of these escape: they are logged and dispatch moves on to the
//! next handler or event.

use thiserror::Error;

// ============================================================================
// Registry Errors (binding and lookup)
// ============================================================================

/// Errors raised while binding or looking up commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("command {plugin}.{command} is already bound")]
    DuplicateCommand { plugin: String, command: String },

    #[error("no such plugin: {0}")]
    NoSuchPlugin(String),

    #[error("plugin {plugin} has no command named {command}")]
    NoSuchCommand { plugin: String, command: String },

    #[error("invalid plugin {plugin}: {reason}")]
    InvalidPlugin { plugin: String, reason: String },
}

impl RegistryError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateCommand { .. } => "duplicate_command",
            Self::NoSuchPlugin(_) => "no_such_plugin",
            Self::NoSuchCommand { .. } => "no_such_command",
            Self::InvalidPlugin { .. } => "invalid_plugin",
        }
    }
}

// ============================================================================
// Handler Errors (plugin command and event processing)
// ============================================================================

/// Errors a plugin handler may return.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("plugin configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Config(_) => "config_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

/// Result type for command and event handlers.
pub type HandlerResult = Result<(), HandlerError>;

// ============================================================================
// Collaborator Errors
// ============================================================================

/// Outbound delivery failures.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Login failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("already logged in as {0}")]
    AlreadyLoggedIn(String),

    #[error("no such account: {0}")]
    NoSuchUser(String),

    #[error("bad password for account {0}")]
    BadLogin(String),

    #[error("this authenticator does not accept logins")]
    Unsupported,
}

impl AuthError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyLoggedIn(_) => "already_logged_in",
            Self::NoSuchUser(_) => "no_such_user",
            Self::BadLogin(_) => "bad_login",
            Self::Unsupported => "unsupported",
        }
    }
}

/// Failures inside a language engine.
#[derive(Debug, Error)]
pub enum LanguageError {
    #[error("language engine failed: {0}")]
    Engine(String),
}
