//! Routing of inbound protocol events to plugins.
//!
//! For each [`ProtocolEvent`] the dispatcher:
//!
//! 1. builds the typed hostmask, destination and message,
//! 2. runs a command if the message is a well-formed command line,
//! 3. asks the language engine for a reply when the message is eligible,
//! 4. fires the generic event (e.g. `privmsg`),
//! 5. fires the specific event (e.g. `channelMessage`),
//!
//! then flushes the replies event handlers queued. Every failure inside
//! this path is logged; nothing a plugin does can stop the connection.

mod event;

pub use event::{CtcpQuery, Event, EventContext, EventKind, ProtocolEvent};

use std::sync::Arc;

use firefly_proto::format::color::BOLD;
use firefly_proto::{
    CapabilityTable, CommandParts, Destination, Hostmask, Message, MessageKind, MentionLocation,
    MentionMatcher,
};
use tracing::{debug, info, warn};

use crate::auth::{Authenticator, Session};
use crate::config::Config;
use crate::language::{Addressing, LanguageEngine, LanguageRequest};
use crate::plugin::Permission;
use crate::registry::{CommandContext, Registry};
use crate::response::{ResponseQueue, Route};
use crate::transport::{Target, Transport};

/// Per-connection dispatch policy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Validated command prefix; `None` disables commands.
    pub command_prefix: Option<String>,
    /// Deliver usage errors in the channel instead of by notice.
    pub public_errors: bool,
    /// Names the bot answers to in mentions.
    pub identity: Vec<String>,
    /// Nick requested at registration, until the server confirms one.
    pub nick: String,
}

impl DispatchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            command_prefix: config.server.validated_prefix(),
            public_errors: config.server.public_errors,
            identity: config.identity_nicks(),
            nick: config.server.nick.clone(),
        }
    }
}

/// Central event router for one connection.
pub struct Dispatcher {
    registry: Registry,
    capabilities: CapabilityTable,
    settings: DispatchSettings,
    nickname: String,
    mention_start: MentionMatcher,
    mention_end: MentionMatcher,
    transport: Arc<dyn Transport>,
    language: Arc<dyn LanguageEngine>,
    auth: Arc<dyn Authenticator>,
}

/// Message flags shared by the generic and specific events.
#[derive(Clone, Copy, Debug, Default)]
struct Flags {
    has_reply: bool,
    is_command: bool,
}

impl Dispatcher {
    pub fn new(
        registry: Registry,
        settings: DispatchSettings,
        transport: Arc<dyn Transport>,
        language: Arc<dyn LanguageEngine>,
        auth: Arc<dyn Authenticator>,
    ) -> Self {
        let nickname = settings.nick.clone();
        let mut dispatcher = Self {
            registry,
            capabilities: CapabilityTable::new(),
            settings,
            nickname,
            mention_start: MentionMatcher::empty(MentionLocation::Start),
            mention_end: MentionMatcher::empty(MentionLocation::End),
            transport,
            language,
            auth,
        };
        dispatcher.rebuild_mentions();
        dispatcher
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Capabilities learnt from ISUPPORT so far.
    pub fn capabilities(&self) -> &CapabilityTable {
        &self.capabilities
    }

    /// The bot's current nick.
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    fn rebuild_mentions(&mut self) {
        let mut nicks = self.settings.identity.clone();
        if !nicks.iter().any(|n| n.eq_ignore_ascii_case(&self.nickname)) {
            nicks.push(self.nickname.clone());
        }

        let build = |location: MentionLocation| {
            MentionMatcher::new(&nicks, location).unwrap_or_else(|e| {
                warn!(error = %e, ?location, "failed to compile mention pattern");
                MentionMatcher::empty(location)
            })
        };
        self.mention_start = build(MentionLocation::Start);
        self.mention_end = build(MentionLocation::End);
    }

    fn is_self(&self, nick: Option<&str>) -> bool {
        nick.is_some_and(|n| n.eq_ignore_ascii_case(&self.nickname))
    }

    fn destination(&self, raw: &str) -> Destination {
        Destination::classify(raw, &self.capabilities)
    }

    /// Route one protocol event. Never fails; problems are logged.
    pub async fn dispatch(&mut self, event: ProtocolEvent) {
        match event {
            ProtocolEvent::Welcome { server, nick, text } => {
                info!(nick = %nick, server = %server, "registered with server");
                self.nickname = nick.clone();
                self.rebuild_mentions();
                let server = Hostmask::parse(&server);
                self.fire_simple(EventKind::ServerWelcome, Event::Welcome { server, text })
                    .await;
                self.fire_simple(EventKind::SignedOn, Event::SignedOn { nick }).await;
            }
            ProtocolEvent::ISupport { tokens } => {
                self.capabilities.apply(&tokens);
                self.fire_simple(EventKind::ServerSupports, Event::ISupport { tokens })
                    .await;
            }
            ProtocolEvent::Motd { lines } => {
                self.fire_simple(EventKind::ServerMotd, Event::Motd { lines }).await;
            }
            ProtocolEvent::Privmsg { source, target, text } => {
                self.on_privmsg(&source, &target, &text).await;
            }
            ProtocolEvent::Notice { source, target, text } => {
                let message = self.build_message(&source, &target, &text, MessageKind::Notice);
                self.fire_message(message, Flags::default()).await;
            }
            ProtocolEvent::Action { source, target, text } => {
                let message = self.build_message(&source, &target, &text, MessageKind::Action);
                self.fire_message(message, Flags::default()).await;
            }
            ProtocolEvent::CtcpQuery { source, target, queries } => {
                let event = Event::CtcpQuery {
                    source: Hostmask::parse(&source),
                    destination: self.destination(&target),
                    queries,
                };
                self.fire_simple(EventKind::CtcpQuery, event).await;
            }
            ProtocolEvent::Join { source, channel } => {
                let user = Hostmask::parse(&source);
                let kind = if self.is_self(user.nick()) {
                    EventKind::Joined
                } else {
                    EventKind::UserJoined
                };
                let channel = self.destination(&channel);
                self.fire_simple(kind, Event::Join { user, channel }).await;
            }
            ProtocolEvent::Part { source, channel, reason } => {
                let user = Hostmask::parse(&source);
                let kind = if self.is_self(user.nick()) {
                    EventKind::Left
                } else {
                    EventKind::UserLeft
                };
                let channel = self.destination(&channel);
                self.fire_simple(kind, Event::Part { user, channel, reason })
                    .await;
            }
            ProtocolEvent::Kick { source, channel, kicked, reason } => {
                let kind = if self.is_self(Some(kicked.as_str())) {
                    EventKind::KickedFrom
                } else {
                    EventKind::UserKicked
                };
                let event = Event::Kick {
                    kicker: Hostmask::parse(&source),
                    channel: self.destination(&channel),
                    kicked,
                    reason,
                };
                self.fire_simple(kind, event).await;
            }
            ProtocolEvent::Quit { source, reason } => {
                let user = Hostmask::parse(&source);
                self.fire_simple(EventKind::UserQuit, Event::Quit { user, reason })
                    .await;
            }
            ProtocolEvent::Nick { source, nick } => {
                let user = Hostmask::parse(&source);
                let old = user.nick_or_raw().to_owned();
                let kind = if self.is_self(Some(old.as_str())) {
                    info!(old = %old, new = %nick, "own nick changed");
                    self.nickname = nick.clone();
                    self.rebuild_mentions();
                    EventKind::NickChanged
                } else {
                    EventKind::UserRenamed
                };
                self.fire_simple(kind, Event::Nick { user, old, new: nick }).await;
            }
            ProtocolEvent::Mode { source, target, set, modes, args } => {
                let event = Event::Mode {
                    user: Hostmask::parse(&source),
                    target: self.destination(&target),
                    set,
                    modes,
                    args,
                };
                self.fire_simple(EventKind::ModeChanged, event).await;
            }
            ProtocolEvent::Topic { source, channel, topic } => {
                let event = Event::Topic {
                    user: Hostmask::parse(&source),
                    channel: self.destination(&channel),
                    topic,
                };
                self.fire_simple(EventKind::TopicUpdated, event).await;
            }
            ProtocolEvent::NickInUse { nick } => {
                self.fire_simple(EventKind::NickInUse, Event::NickInUse { nick }).await;
            }
            ProtocolEvent::Unknown { source, command, params } => {
                let event = Event::Unknown {
                    source: source.as_deref().map(Hostmask::parse),
                    command,
                    params,
                };
                self.fire_simple(EventKind::Unknown, event).await;
            }
        }
    }

    fn build_message(&self, source: &str, target: &str, text: &str, kind: MessageKind) -> Message {
        Message::new(text, self.destination(target), Hostmask::parse(source), kind)
    }

    async fn on_privmsg(&mut self, source: &str, target: &str, text: &str) {
        let message = self.build_message(source, target, text, MessageKind::Message);
        let mut flags = Flags::default();

        let prefix = self.settings.command_prefix.as_deref();
        if message.is_command(prefix) {
            match message.command_parts(prefix) {
                Ok(parts) => {
                    flags.is_command = true;
                    self.run_command(&parts, &message).await;
                }
                Err(e) => debug!(text = %message.stripped(), error = %e, "ignoring malformed command"),
            }
        }

        if message.destination().is_user() || !flags.is_command {
            flags.has_reply = self.language_reply(&message).await;
        }

        self.fire_message(message, flags).await;
    }

    async fn run_command(&self, parts: &CommandParts, message: &Message) {
        if let Some(mut queue) = self.execute_command(parts, message) {
            queue.send(self.transport.as_ref()).await;
        }
    }

    /// Look up, authorize, parse and run a command. Returns the replies to
    /// flush, or `None` when the command never ran.
    fn execute_command(&self, parts: &CommandParts, message: &Message) -> Option<ResponseQueue> {
        let entry = match self.registry.get_command(&parts.plugin, &parts.command) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(plugin = %parts.plugin, command = %parts.command, error = %e, code = e.error_code(), "command lookup failed");
                return None;
            }
        };

        let session = self.auth.check(message.source());
        if !permitted(entry.permission(), session.as_ref()) {
            info!(
                source = %message.source(),
                plugin = %entry.plugin().name(),
                command = %entry.name(),
                required = %entry.permission(),
                "permission denied"
            );
            return None;
        }

        let mut queue = ResponseQueue::for_message(message);
        match entry.schema().clone().try_get_matches_from(&parts.args) {
            Ok(args) => {
                info!(
                    source = %message.source(),
                    plugin = %entry.plugin().name(),
                    command = %entry.name(),
                    "running command"
                );
                let ctx = CommandContext {
                    message,
                    args: &args,
                    session: session.as_ref(),
                };
                if let Err(e) = entry.call(&ctx, &mut queue) {
                    warn!(command = %entry.name(), error = %e, code = e.error_code(), "command handler failed");
                    queue.discard();
                    return None;
                }
            }
            Err(e) => {
                debug!(command = %entry.name(), error = %e, "command usage error");
                self.queue_usage_error(&mut queue, message, entry.schema(), &e);
            }
        }
        Some(queue)
    }

    /// Queue the two-line usage error: what went wrong, then the usage string
    /// and description.
    fn queue_usage_error(&self, queue: &mut ResponseQueue, message: &Message, schema: &clap::Command, error: &clap::Error) {
        let rendered = error.to_string();
        let summary = rendered
            .lines()
            .next()
            .unwrap_or_default()
            .trim_start_matches("error:")
            .trim();
        let summary = capitalize(summary);

        let usage = schema.clone().render_usage().to_string();
        let usage = usage.trim().trim_start_matches("Usage:").trim().to_owned();
        let mut detail = format!("({BOLD}{usage}{BOLD})");
        if let Some(about) = schema.get_about() {
            detail.push_str(&format!(" -- {about}"));
        }

        let route = if message.destination().is_user() || self.settings.public_errors {
            None
        } else {
            Some(Route::User)
        };
        for line in [summary, detail] {
            match &route {
                None => queue.add_message(line),
                Some(route) => queue.add_notice_to(line, route.clone()),
            }
        }
    }

    /// Ask the language engine for a reply and deliver it right away.
    async fn language_reply(&self, message: &Message) -> bool {
        let stripped = message.stripped();
        let (text, addressing) = if message.destination().is_user() {
            (stripped.to_owned(), Addressing::Private)
        } else if let Some(m) = self
            .mention_start
            .detect(stripped)
            .or_else(|| self.mention_end.detect(stripped))
        {
            (m.message, Addressing::Mentioned(m.nick))
        } else {
            (stripped.to_owned(), Addressing::Public)
        };

        let request = LanguageRequest {
            text: &text,
            addressing,
            source: message.source(),
        };
        let reply = match self.language.get_reply(&request).await {
            Ok(Some(reply)) if !reply.trim().is_empty() => reply,
            Ok(_) => return false,
            Err(e) => {
                warn!(error = %e, "language engine failed");
                return false;
            }
        };

        let target = if message.destination().is_user() {
            message.source().target()
        } else {
            message.destination().target()
        };
        if let Err(e) = self.transport.msg(target, &reply).await {
            warn!(target = %target, error = %e, "failed to deliver language reply");
        }
        true
    }

    /// Fire the generic and then the specific event for a message, notice or
    /// action, then flush. Replies to notices are discarded.
    async fn fire_message(&self, message: Message, flags: Flags) {
        let (generic, channel, private) = match message.kind() {
            MessageKind::Message => (
                EventKind::Message,
                EventKind::ChannelMessage,
                EventKind::PrivateMessage,
            ),
            MessageKind::Notice => (
                EventKind::Notice,
                EventKind::ChannelNotice,
                EventKind::PrivateNotice,
            ),
            MessageKind::Action => (
                EventKind::Action,
                EventKind::ChannelAction,
                EventKind::PrivateAction,
            ),
        };
        let specific = if message.destination().is_channel() {
            channel
        } else {
            private
        };

        let mut queue = ResponseQueue::for_message(&message);
        let is_notice = message.kind() == MessageKind::Notice;
        let event = Event::Message(message);
        let session = event.source().and_then(|s| self.auth.check(s));

        self.fire(generic, &event, flags, session.as_ref(), &mut queue);
        self.fire(specific, &event, flags, session.as_ref(), &mut queue);

        if is_notice {
            for (kind, text) in queue.pending() {
                debug!(?kind, text, "not replying to a notice");
            }
            queue.discard();
        } else {
            queue.send(self.transport.as_ref()).await;
        }
    }

    /// Fire a single event and flush whatever its handlers queued.
    async fn fire_simple(&self, kind: EventKind, event: Event) {
        let channel = event.channel().map(|c| c.target().to_owned());
        let user = event.source().and_then(|s| s.nick()).map(str::to_owned);
        let mut queue = ResponseQueue::new(channel, user);
        let session = event.source().and_then(|s| self.auth.check(s));

        self.fire(kind, &event, Flags::default(), session.as_ref(), &mut queue);
        queue.send(self.transport.as_ref()).await;
    }

    fn fire(&self, kind: EventKind, event: &Event, flags: Flags, session: Option<&Session>, queue: &mut ResponseQueue) {
        let bindings = self.registry.get_events(kind);
        if bindings.is_empty() {
            return;
        }

        let ctx = EventContext {
            kind,
            event,
            has_reply: flags.has_reply,
            is_command: flags.is_command,
            session,
        };
        for binding in bindings {
            let plugin = binding.plugin().name();
            if !binding.accepts(flags.is_command, flags.has_reply) {
                debug!(event = %kind, plugin = %plugin, "binding filtered out");
                continue;
            }
            if !permitted(binding.permission(), session) {
                debug!(event = %kind, plugin = %plugin, required = %binding.permission(), "binding not permitted");
                continue;
            }
            if let Err(e) = binding.call(&ctx, queue) {
                warn!(event = %kind, plugin = %plugin, error = %e, code = e.error_code(), "event handler failed");
            }
        }
    }
}

/// Whether a caller with `session` meets `required`.
pub fn permitted(required: Permission, session: Option<&Session>) -> bool {
    match required {
        Permission::Guest => true,
        Permission::User => session.is_some(),
        Permission::Admin => session.is_some_and(Session::is_admin),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
