//! Minimal line client: registration, keepalive and translation of inbound
//! lines into protocol events for the dispatcher.

mod connection;
pub mod wire;

pub use connection::Connection;
