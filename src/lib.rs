//! Firefly - an IRC bot runtime.
//!
//! Lines from the server are translated into protocol events and routed by
//! the [`Dispatcher`](dispatcher::Dispatcher) to plugin commands, event
//! handlers and an optional language engine. Replies are queued per event and
//! flushed through a [`Transport`](transport::Transport).

pub mod auth;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod language;
pub mod plugin;
pub mod plugins;
pub mod registry;
pub mod response;
pub mod transport;
