//! A single server connection.
//!
//! ```text
//!   TcpStream ── Framed<LinesCodec> ─┬─ stream ── read loop ── Translator ── Dispatcher
//!                                    │                                          │
//!                                    └─ sink ◄── writer task ◄── mpsc ◄── LineTransport
//! ```
//!
//! The read loop awaits each dispatch before reading the next line, so
//! events are handled strictly in arrival order.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, info, trace, warn};

use super::wire::{Line, Translator};
use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;
use crate::error::TransportError;
use crate::transport::LineTransport;

/// Longest accepted inbound line, tags included.
const MAX_LINE_LENGTH: usize = 8191;

/// Outbound queue depth between the transport and the writer task.
const OUTBOUND_CHANNEL_SIZE: usize = 256;

/// Client side of one IRC connection.
pub struct Connection {
    server: ServerConfig,
    tx: mpsc::Sender<String>,
    rx: Option<mpsc::Receiver<String>>,
    translator: Translator,
    nick: String,
    registered: bool,
}

impl Connection {
    /// Create a connection and the transport that writes to it.
    ///
    /// The transport can be handed to the dispatcher before the socket is
    /// opened; lines queued early are written once [`Connection::run`] starts.
    pub fn new(server: ServerConfig) -> (Self, LineTransport) {
        let (tx, rx) = mpsc::channel(OUTBOUND_CHANNEL_SIZE);
        let transport = LineTransport::new(tx.clone());
        let nick = server.nick.clone();
        let connection = Self {
            server,
            tx,
            rx: Some(rx),
            translator: Translator::new(),
            nick,
            registered: false,
        };
        (connection, transport)
    }

    /// Connect, register and process lines until the server closes the socket.
    pub async fn run(self, dispatcher: &mut Dispatcher) -> Result<(), TransportError> {
        let addr = (self.server.host.as_str(), self.server.port);
        let stream = TcpStream::connect(addr).await?;
        info!(host = %self.server.host, port = self.server.port, "connected");
        self.run_on(stream, dispatcher).await
    }

    /// Drive an already-open stream.
    pub async fn run_on(mut self, stream: TcpStream, dispatcher: &mut Dispatcher) -> Result<(), TransportError> {
        let framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
        let (mut sink, mut lines) = framed.split();

        let mut rx = self.rx.take().ok_or(TransportError::Closed)?;
        let writer = tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                trace!(line = %line, "send");
                if let Err(e) = sink.send(line).await {
                    warn!(error = %e, "write failed");
                    break;
                }
            }
        });

        self.register().await?;

        let result = loop {
            let raw = match lines.next().await {
                Some(Ok(raw)) => raw,
                Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                    warn!(max = MAX_LINE_LENGTH, "dropping overlong line");
                    continue;
                }
                Some(Err(LinesCodecError::Io(e))) => break Err(TransportError::Io(e)),
                None => break Ok(()),
            };
            trace!(line = %raw, "recv");

            let Some(line) = Line::parse(&raw) else {
                continue;
            };
            if let Err(e) = self.handle(line, dispatcher).await {
                break Err(e);
            }
        };

        info!(host = %self.server.host, "connection closed");
        writer.abort();
        result
    }

    async fn send(&self, line: String) -> Result<(), TransportError> {
        self.tx.send(line).await.map_err(|_| TransportError::Closed)
    }

    async fn register(&self) -> Result<(), TransportError> {
        if let Some(password) = &self.server.password {
            self.send(format!("PASS {password}")).await?;
        }
        self.send(format!("NICK {}", self.nick)).await?;
        self.send(format!(
            "USER {} 0 * :{}",
            self.server.username, self.server.realname
        ))
        .await
    }

    async fn handle(&mut self, line: Line, dispatcher: &mut Dispatcher) -> Result<(), TransportError> {
        match line.command.as_str() {
            "PING" => {
                let token = line.params.last().cloned().unwrap_or_default();
                return self.send(format!("PONG :{token}")).await;
            }
            "433" if !self.registered => {
                self.nick.push('_');
                debug!(nick = %self.nick, "nick in use, retrying");
                self.send(format!("NICK {}", self.nick)).await?;
            }
            "001" => {
                self.registered = true;
                if let Some(nick) = line.params.first() {
                    self.nick.clone_from(nick);
                }
            }
            _ => {}
        }

        for event in self.translator.translate(&line) {
            dispatcher.dispatch(event).await;
        }

        if line.command == "001" {
            for channel in &self.server.channels {
                info!(channel = %channel, "joining");
                self.send(format!("JOIN {channel}")).await?;
            }
        }
        Ok(())
    }
}
