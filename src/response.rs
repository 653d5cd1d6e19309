//! Deferred reply delivery.
//!
//! Handlers never talk to the transport directly. They queue replies on a
//! [`ResponseQueue`] which the dispatcher flushes once the handler chain for
//! an inbound event has finished.

use chrono::{DateTime, Utc};
use firefly_proto::Message;
use tracing::{debug, warn};

use crate::transport::{Target, Transport};

/// How a reply is delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReplyKind {
    Message,
    Notice,
    Action,
}

/// Where a queued reply goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    /// The channel the triggering event happened in.
    Channel,
    /// The user who triggered the event.
    User,
    /// Any other raw target.
    To(String),
}

#[derive(Clone, Debug)]
struct Entry {
    kind: ReplyKind,
    text: String,
    route: Option<Route>,
}

/// A reply that reached the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivered {
    pub kind: ReplyKind,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// Ordered, not-yet-delivered replies for one dispatch.
#[derive(Debug)]
pub struct ResponseQueue {
    channel: Option<String>,
    user: Option<String>,
    default_route: Route,
    queue: Vec<Entry>,
    delivered: Vec<Delivered>,
    sent: bool,
}

impl ResponseQueue {
    /// A queue answering to `channel` by default, or to `user` when there is no channel.
    pub fn new(channel: Option<String>, user: Option<String>) -> Self {
        let default_route = if channel.is_some() {
            Route::Channel
        } else {
            Route::User
        };
        Self {
            channel,
            user,
            default_route,
            queue: Vec::new(),
            delivered: Vec::new(),
            sent: false,
        }
    }

    /// A queue for replies to `message`: channel messages are answered in
    /// the channel, queries are answered privately.
    pub fn for_message(message: &Message) -> Self {
        let dest = message.destination();
        let channel = dest.is_channel().then(|| dest.target().to_owned());
        Self::new(channel, Some(message.source().target().to_owned()))
    }

    pub fn add_message(&mut self, text: impl Into<String>) {
        self.push(ReplyKind::Message, text.into(), None);
    }

    pub fn add_notice(&mut self, text: impl Into<String>) {
        self.push(ReplyKind::Notice, text.into(), None);
    }

    pub fn add_action(&mut self, text: impl Into<String>) {
        self.push(ReplyKind::Action, text.into(), None);
    }

    /// Queue a message with an explicit route.
    pub fn add_message_to(&mut self, text: impl Into<String>, route: Route) {
        self.push(ReplyKind::Message, text.into(), Some(route));
    }

    /// Queue a notice with an explicit route.
    pub fn add_notice_to(&mut self, text: impl Into<String>, route: Route) {
        self.push(ReplyKind::Notice, text.into(), Some(route));
    }

    /// Queue an action with an explicit route.
    pub fn add_action_to(&mut self, text: impl Into<String>, route: Route) {
        self.push(ReplyKind::Action, text.into(), Some(route));
    }

    fn push(&mut self, kind: ReplyKind, text: String, route: Option<Route>) {
        self.queue.push(Entry { kind, text, route });
    }

    /// Channel target of this queue, if any.
    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    /// User target of this queue, if any.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Number of replies waiting.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Replies that reached the transport, oldest first.
    pub fn delivered(&self) -> &[Delivered] {
        &self.delivered
    }

    /// True once [`send`](Self::send) has run.
    pub fn is_sent(&self) -> bool {
        self.sent
    }

    /// Pending replies as `(kind, text)` pairs.
    pub fn pending(&self) -> impl Iterator<Item = (ReplyKind, &str)> {
        self.queue.iter().map(|e| (e.kind, e.text.as_str()))
    }

    fn resolve<'a>(&'a self, route: Option<&'a Route>) -> Option<&'a str> {
        match route.unwrap_or(&self.default_route) {
            Route::Channel => self.channel.as_deref(),
            Route::User => self.user.as_deref(),
            Route::To(target) => Some(target),
        }
    }

    /// Deliver every queued reply in order.
    ///
    /// A failed entry is logged and skipped; later entries are still sent.
    /// The queue is empty and marked sent afterwards.
    pub async fn send(&mut self, transport: &dyn Transport) {
        let queue = std::mem::take(&mut self.queue);
        for entry in queue {
            let Some(target) = self.resolve(entry.route.as_ref()).map(str::to_owned) else {
                warn!(kind = ?entry.kind, route = ?entry.route, "reply has no target, dropping");
                continue;
            };

            let result = match entry.kind {
                ReplyKind::Message => transport.msg(&target, &entry.text).await,
                ReplyKind::Notice => transport.notice(&target, &entry.text).await,
                ReplyKind::Action => transport.describe(&target, &entry.text).await,
            };

            match result {
                Ok(()) => self.delivered.push(Delivered {
                    kind: entry.kind,
                    text: entry.text,
                    at: Utc::now(),
                }),
                Err(e) => warn!(target = %target, kind = ?entry.kind, error = %e, "failed to deliver reply"),
            }
        }
        self.sent = true;
    }

    /// Drop everything queued without delivering it.
    pub fn discard(&mut self) {
        if !self.queue.is_empty() {
            debug!(count = self.queue.len(), "discarding queued replies");
        }
        self.queue.clear();
    }
}
