//! Integration test common infrastructure.
//!
//! Provides stand-in collaborators for the dispatcher, a plugin that records
//! what it sees, and a scripted IRC server for connection tests.

pub mod fixtures;
pub mod server;

#[allow(unused_imports)]
pub use fixtures::{Harness, PluginTest, RecordingTransport, Sent, StubAuth, StubLanguage};
#[allow(unused_imports)]
pub use server::TestServer;
