//! Outbound delivery of bot replies.
//!
//! The dispatcher never writes protocol lines itself. Everything a plugin
//! says goes through a [`Transport`], which the live client implements with
//! [`LineTransport`] and tests replace with a recorder.

use async_trait::async_trait;
use firefly_proto::{Destination, Hostmask};
use tokio::sync::mpsc;
use tracing::trace;

use crate::error::TransportError;

/// Anything that can be addressed on the wire.
pub trait Target {
    /// The raw target string: a channel name or a nick.
    fn target(&self) -> &str;
}

impl Target for str {
    fn target(&self) -> &str {
        self
    }
}

impl Target for String {
    fn target(&self) -> &str {
        self
    }
}

impl Target for Destination {
    fn target(&self) -> &str {
        self.raw()
    }
}

/// Hostmasks are addressed by nick; unparsed masks fall back to the raw text.
impl Target for Hostmask {
    fn target(&self) -> &str {
        self.nick_or_raw()
    }
}

/// Delivery primitives for replies.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a PRIVMSG.
    async fn msg(&self, target: &str, text: &str) -> Result<(), TransportError>;

    /// Send a NOTICE.
    async fn notice(&self, target: &str, text: &str) -> Result<(), TransportError>;

    /// Send a CTCP ACTION.
    async fn describe(&self, target: &str, text: &str) -> Result<(), TransportError>;
}

/// A [`Transport`] that renders raw protocol lines into a channel.
///
/// The connection's writer task owns the receiving end. Multi-line text is
/// split so a reply can never smuggle extra commands onto the wire.
#[derive(Clone, Debug)]
pub struct LineTransport {
    tx: mpsc::Sender<String>,
}

impl LineTransport {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }

    /// Queue a raw protocol line.
    pub async fn send_raw(&self, line: String) -> Result<(), TransportError> {
        trace!(line = %line, "queueing outbound line");
        self.tx.send(line).await.map_err(|_| TransportError::Closed)
    }

    async fn send_lines(&self, verb: &str, target: &str, text: &str, ctcp: Option<&str>) -> Result<(), TransportError> {
        let target = sanitize(target);
        for line in text.split(['\r', '\n']).filter(|l| !l.trim().is_empty()) {
            let body = match ctcp {
                Some(tag) => format!("\x01{tag} {line}\x01"),
                None => line.to_owned(),
            };
            self.send_raw(format!("{verb} {target} :{body}")).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for LineTransport {
    async fn msg(&self, target: &str, text: &str) -> Result<(), TransportError> {
        self.send_lines("PRIVMSG", target, text, None).await
    }

    async fn notice(&self, target: &str, text: &str) -> Result<(), TransportError> {
        self.send_lines("NOTICE", target, text, None).await
    }

    async fn describe(&self, target: &str, text: &str) -> Result<(), TransportError> {
        self.send_lines("PRIVMSG", target, text, Some("ACTION")).await
    }
}

/// Targets are a single middle parameter; cut at the first space or line break.
fn sanitize(target: &str) -> &str {
    target
        .split([' ', '\r', '\n'])
        .next()
        .unwrap_or_default()
}
