//! Error types for the wire grammar.
//!
//! Parse-local problems (bad ISUPPORT values, malformed hostmasks) never
//! surface as errors; they are logged and the affected fields stay unset.
//! Only the operations a caller explicitly asks for can fail.

use thiserror::Error;

/// Errors produced when splitting a command line into its parts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The text does not start with the configured prefix, or no prefix is configured.
    #[error("message does not contain a valid command")]
    NotACommand,

    /// Fewer than two tokens followed the prefix.
    #[error("command strings must contain at least a plugin name and command name, got {0} token(s)")]
    Malformed(usize),

    /// The remainder could not be shell-tokenized (unbalanced quotes, trailing escape).
    #[error("unable to tokenize command line: {0}")]
    Tokenize(String),
}

/// Errors produced by hostmask host resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The hostmask has no host component to resolve.
    #[error("hostmask {0:?} has no host to resolve")]
    NoHost(String),

    /// The DNS lookup itself failed.
    #[error("could not resolve host {host}: {reason}")]
    Lookup {
        /// Host that was looked up.
        host: String,
        /// Resolver error text.
        reason: String,
    },

    /// The lookup succeeded but returned no addresses.
    #[error("host {0} resolved to no addresses")]
    NoAddress(String),
}
