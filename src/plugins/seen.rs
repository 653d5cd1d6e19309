//! `seen` plugin: remembers when each nick first and last spoke in a channel.

use chrono::{DateTime, Utc};
use clap::{Arg, ArgAction};
use dashmap::DashMap;
use firefly_proto::{Message, MessageKind};
use serde::Deserialize;
use tracing::debug;

use crate::dispatcher::{EventContext, EventKind};
use crate::error::{HandlerError, RegistryError};
use crate::plugin::{Plugin, PluginHandle, PluginInit};
use crate::registry::{CommandParams, CommandSpec, EventParams, Registry};
use crate::response::ResponseQueue;
use crate::transport::Target;

/// One observed line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sighting {
    pub nick: String,
    pub channel: String,
    pub text: String,
    pub action: bool,
    pub at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
struct Record {
    first: Sighting,
    last: Sighting,
}

/// Which end of the history a lookup wants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Which {
    First,
    Last,
}

/// `[plugins.seen]` settings.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SeenSettings {
    /// Most `(channel, nick)` pairs remembered; the least recently active
    /// pair is forgotten first.
    pub max_records: usize,
}

impl Default for SeenSettings {
    fn default() -> Self {
        Self { max_records: 10_000 }
    }
}

#[derive(Debug)]
pub struct SeenPlugin {
    handle: PluginHandle,
    settings: SeenSettings,
    /// Keyed by lowercased `(channel, nick)`.
    records: DashMap<(String, String), Record>,
}

impl Plugin for SeenPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn handle(&self) -> &PluginHandle {
        &self.handle
    }
}

impl PluginInit for SeenPlugin {
    const NAME: &'static str = "seen";

    fn init(handle: PluginHandle) -> Result<Self, HandlerError> {
        let settings = handle.settings_as::<SeenSettings>()?;
        Ok(Self {
            handle,
            settings,
            records: DashMap::new(),
        })
    }
}

impl SeenPlugin {
    /// Record a channel message or action. Other messages are ignored.
    pub fn record(&self, message: &Message, at: DateTime<Utc>) {
        let channel = message.destination();
        if !channel.is_channel() {
            return;
        }
        let nick = message.source().target().to_owned();
        let sighting = Sighting {
            nick: nick.clone(),
            channel: channel.raw().to_owned(),
            text: message.stripped().to_owned(),
            action: message.kind() == MessageKind::Action,
            at,
        };

        let key = (channel.raw().to_lowercase(), nick.to_lowercase());
        if !self.records.contains_key(&key) && self.records.len() >= self.settings.max_records.max(1) {
            self.evict_oldest();
        }
        self.records
            .entry(key)
            .and_modify(|r| r.last = sighting.clone())
            .or_insert_with(|| Record {
                first: sighting.clone(),
                last: sighting,
            });
    }

    /// Number of remembered `(channel, nick)` pairs.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn evict_oldest(&self) {
        let oldest = self
            .records
            .iter()
            .min_by_key(|r| r.value().last.at)
            .map(|r| r.key().clone());
        if let Some(key) = oldest {
            debug!(channel = %key.0, nick = %key.1, "forgetting least recently seen nick");
            self.records.remove(&key);
        }
    }

    /// True if `nick` is one of the bot's own names.
    pub fn is_me(&self, nick: &str) -> bool {
        self.handle.identity().iter().any(|n| n.eq_ignore_ascii_case(nick))
    }

    /// Look `nick` up in `channel`, or across every channel when `None`.
    pub fn lookup(&self, channel: Option<&str>, nick: &str, which: Which) -> Option<Sighting> {
        let nick = nick.to_lowercase();
        let channel = channel.map(str::to_lowercase);
        let pick = |r: &Record| match which {
            Which::First => r.first.clone(),
            Which::Last => r.last.clone(),
        };

        let candidates = self
            .records
            .iter()
            .filter(|r| r.key().1 == nick && channel.as_ref().is_none_or(|c| *c == r.key().0))
            .map(|r| pick(r.value()));
        match which {
            Which::First => candidates.min_by_key(|s| s.at),
            Which::Last => candidates.max_by_key(|s| s.at),
        }
    }

    /// Render the answer for a lookup.
    pub fn describe(&self, channel: Option<&str>, nick: &str, which: Which, with_message: bool, now: DateTime<Utc>) -> String {
        let Some(seen) = self.lookup(channel, nick, which) else {
            return format!("I have never seen {nick} before.");
        };

        let when = match which {
            Which::First => "first",
            Which::Last => "last",
        };
        let mut reply = format!(
            "{} was {when} seen {} ago ({}) in {}",
            seen.nick,
            ago(now.signed_duration_since(seen.at)),
            seen.at.format("%Y-%m-%d %H:%M UTC"),
            seen.channel,
        );
        if with_message {
            if seen.action {
                reply.push_str(&format!(": * {} {}", seen.nick, seen.text));
            } else {
                reply.push_str(&format!(": <{}> {}", seen.nick, seen.text));
            }
        }
        reply
    }
}

/// Coarse human duration: the two largest non-zero units.
fn ago(elapsed: chrono::Duration) -> String {
    let secs = elapsed.num_seconds().max(0);
    let units = [
        (secs / 86_400, "day"),
        (secs % 86_400 / 3_600, "hour"),
        (secs % 3_600 / 60, "minute"),
        (secs % 60, "second"),
    ];
    let parts: Vec<String> = units
        .iter()
        .filter(|(n, _)| *n > 0)
        .take(2)
        .map(|(n, unit)| if *n == 1 { format!("1 {unit}") } else { format!("{n} {unit}s") })
        .collect();
    if parts.is_empty() {
        "0 seconds".to_owned()
    } else {
        parts.join(" ")
    }
}

fn lookup_command(plugin: std::sync::Arc<SeenPlugin>, which: Which, about: &'static str) -> CommandSpec {
    CommandSpec::new(move |ctx, queue| {
        let nick = ctx
            .args
            .get_one::<String>("nick")
            .ok_or_else(|| HandlerError::InvalidArgument("nick is required".into()))?;
        let channel = ctx
            .message
            .destination()
            .is_channel()
            .then(|| ctx.message.destination().raw());
        if plugin.is_me(nick) {
            queue.add_message("I'm right here!");
            return Ok(());
        }
        let with_message = ctx.args.get_flag("message");
        queue.add_message(plugin.describe(channel, nick, which, with_message, Utc::now()));
        Ok(())
    })
    .about(about)
    .arg(Arg::new("nick").required(true))
    .arg(
        Arg::new("message")
            .long("message")
            .short('m')
            .action(ArgAction::SetTrue),
    )
}

pub fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    let listen = EventParams {
        command_ok: true,
        reply_ok: true,
        ..EventParams::default()
    };
    for kind in [EventKind::ChannelMessage, EventKind::ChannelAction] {
        registry.bind_event::<SeenPlugin, _, _>(kind, listen, |plugin| {
            move |ctx: &EventContext<'_>, _queue: &mut ResponseQueue| {
                if let Some(message) = ctx.event.message() {
                    plugin.record(message, Utc::now());
                }
                Ok(())
            }
        })?;
    }

    registry.bind_command::<SeenPlugin, _>("last", CommandParams::default(), |plugin| {
        lookup_command(plugin, Which::Last, "When a nick last spoke here")
    })?;
    registry.bind_command::<SeenPlugin, _>("first", CommandParams::default(), |plugin| {
        lookup_command(plugin, Which::First, "When a nick first spoke here")
    })
}
