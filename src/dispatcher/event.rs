//! Inbound protocol callbacks and the events they fan out to.

use std::fmt;
use std::str::FromStr;

use firefly_proto::{Destination, Hostmask, Message};

use crate::auth::Session;

/// A callback from the connection, carrying raw wire strings.
///
/// The dispatcher turns these into typed [`Event`]s once it knows the
/// server's capabilities and the bot's own nick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProtocolEvent {
    /// RPL_WELCOME (001); `nick` is the nick the server registered us under.
    Welcome { server: String, nick: String, text: String },
    /// RPL_ISUPPORT (005) tokens, without the trailing text.
    ISupport { tokens: Vec<String> },
    /// The complete MOTD, one entry per line.
    Motd { lines: Vec<String> },
    Privmsg { source: String, target: String, text: String },
    Notice { source: String, target: String, text: String },
    /// CTCP ACTION body.
    Action { source: String, target: String, text: String },
    /// CTCP queries other than ACTION.
    CtcpQuery { source: String, target: String, queries: Vec<CtcpQuery> },
    Join { source: String, channel: String },
    Part { source: String, channel: String, reason: Option<String> },
    Kick { source: String, channel: String, kicked: String, reason: Option<String> },
    Quit { source: String, reason: Option<String> },
    Nick { source: String, nick: String },
    /// One `+` or `-` run of a MODE line.
    Mode { source: String, target: String, set: bool, modes: String, args: Vec<String> },
    /// TOPIC change, or RPL_TOPIC (332) on join.
    Topic { source: String, channel: String, topic: String },
    /// ERR_NICKNAMEINUSE (433).
    NickInUse { nick: String },
    Unknown { source: Option<String>, command: String, params: Vec<String> },
}

/// A single `\x01TAG data\x01` query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CtcpQuery {
    pub tag: String,
    pub data: Option<String>,
}

/// Typed payload handed to event handlers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Welcome { server: Hostmask, text: String },
    SignedOn { nick: String },
    ISupport { tokens: Vec<String> },
    Motd { lines: Vec<String> },
    /// PRIVMSG, NOTICE or ACTION; see [`Message::kind`].
    Message(Message),
    CtcpQuery { source: Hostmask, destination: Destination, queries: Vec<CtcpQuery> },
    Join { user: Hostmask, channel: Destination },
    Part { user: Hostmask, channel: Destination, reason: Option<String> },
    Kick { kicker: Hostmask, channel: Destination, kicked: String, reason: Option<String> },
    Quit { user: Hostmask, reason: Option<String> },
    Nick { user: Hostmask, old: String, new: String },
    Mode { user: Hostmask, target: Destination, set: bool, modes: String, args: Vec<String> },
    Topic { user: Hostmask, channel: Destination, topic: String },
    NickInUse { nick: String },
    Unknown { source: Option<Hostmask>, command: String, params: Vec<String> },
}

impl Event {
    /// The user or server that caused the event, when there is one.
    pub fn source(&self) -> Option<&Hostmask> {
        match self {
            Self::Welcome { server, .. } => Some(server),
            Self::Message(message) => Some(message.source()),
            Self::CtcpQuery { source, .. } => Some(source),
            Self::Join { user, .. }
            | Self::Part { user, .. }
            | Self::Quit { user, .. }
            | Self::Nick { user, .. }
            | Self::Mode { user, .. }
            | Self::Topic { user, .. } => Some(user),
            Self::Kick { kicker, .. } => Some(kicker),
            Self::Unknown { source, .. } => source.as_ref(),
            Self::SignedOn { .. } | Self::ISupport { .. } | Self::Motd { .. } | Self::NickInUse { .. } => None,
        }
    }

    /// The channel the event happened in, when there is one.
    pub fn channel(&self) -> Option<&Destination> {
        match self {
            Self::Message(message) => Some(message.destination()).filter(|d| d.is_channel()),
            Self::CtcpQuery { destination, .. } => Some(destination).filter(|d| d.is_channel()),
            Self::Mode { target, .. } => Some(target).filter(|d| d.is_channel()),
            Self::Join { channel, .. }
            | Self::Part { channel, .. }
            | Self::Kick { channel, .. }
            | Self::Topic { channel, .. } => Some(channel),
            _ => None,
        }
    }

    /// The message payload for message-like events.
    pub fn message(&self) -> Option<&Message> {
        match self {
            Self::Message(message) => Some(message),
            _ => None,
        }
    }
}

macro_rules! event_kinds {
    ($($variant:ident => $wire:literal),+ $(,)?) => {
        /// Named events plugins can bind to.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum EventKind {
            $($variant),+
        }

        impl EventKind {
            /// Every kind, in declaration order.
            pub const ALL: &'static [EventKind] = &[$(EventKind::$variant),+];

            /// The event's wire name, e.g. `channelMessage`.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(EventKind::$variant => $wire),+
                }
            }
        }

        impl FromStr for EventKind {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(EventKind::$variant),)+
                    other => Err(format!("unknown event: {other}")),
                }
            }
        }
    };
}

event_kinds! {
    ServerWelcome => "irc_RPL_WELCOME",
    SignedOn => "signedOn",
    ServerSupports => "isupport",
    ServerMotd => "receivedMOTD",
    Message => "privmsg",
    ChannelMessage => "channelMessage",
    PrivateMessage => "privateMessage",
    Notice => "noticed",
    ChannelNotice => "channelNotice",
    PrivateNotice => "privateNotice",
    Action => "action",
    ChannelAction => "channelAction",
    PrivateAction => "privateAction",
    CtcpQuery => "ctcpQuery",
    Joined => "joined",
    Left => "left",
    KickedFrom => "kickedFrom",
    NickChanged => "nickChanged",
    UserJoined => "userJoined",
    UserLeft => "userLeft",
    UserKicked => "userKicked",
    UserQuit => "userQuit",
    UserRenamed => "userRenamed",
    ModeChanged => "modeChanged",
    TopicUpdated => "topicUpdated",
    NickInUse => "irc_ERR_NICKNAMEINUSE",
    Unknown => "irc_unknown",
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an event handler sees.
#[derive(Clone, Copy, Debug)]
pub struct EventContext<'a> {
    /// Which binding fired.
    pub kind: EventKind,
    pub event: &'a Event,
    /// The language engine answered this message.
    pub has_reply: bool,
    /// The message invoked a command.
    pub is_command: bool,
    /// The source's session, if any.
    pub session: Option<&'a Session>,
}
