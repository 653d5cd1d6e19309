//! `logger` plugin: writes channel traffic to the `firefly::chanlog` target.
//!
//! ```toml
//! [plugins.logger]
//! log_queries = true
//! ```

use std::sync::Arc;

use firefly_proto::MessageKind;
use serde::Deserialize;
use tracing::info;

use crate::dispatcher::{Event, EventContext, EventKind};
use crate::error::{HandlerError, RegistryError};
use crate::plugin::{Plugin, PluginHandle, PluginInit};
use crate::registry::{EventParams, Registry};
use crate::response::ResponseQueue;
use crate::transport::Target;

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggerSettings {
    /// Also log private messages and actions.
    pub log_queries: bool,
}

#[derive(Debug)]
pub struct LoggerPlugin {
    handle: PluginHandle,
    settings: LoggerSettings,
}

impl Plugin for LoggerPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn handle(&self) -> &PluginHandle {
        &self.handle
    }
}

impl PluginInit for LoggerPlugin {
    const NAME: &'static str = "logger";

    fn init(handle: PluginHandle) -> Result<Self, HandlerError> {
        let settings = handle.settings_as::<LoggerSettings>()?;
        Ok(Self { handle, settings })
    }
}

impl LoggerPlugin {
    pub fn settings(&self) -> &LoggerSettings {
        &self.settings
    }

    /// Render an event as a log line, or `None` if it isn't logged.
    pub fn format(&self, event: &Event) -> Option<(String, String)> {
        match event {
            Event::Message(message) => {
                let destination = message.destination();
                if destination.is_user() && !self.settings.log_queries {
                    return None;
                }
                let nick = message.source().target();
                let line = match message.kind() {
                    MessageKind::Action => format!("* {nick} {}", message.stripped()),
                    MessageKind::Notice => format!("-{nick}- {}", message.stripped()),
                    MessageKind::Message => format!("<{nick}> {}", message.stripped()),
                };
                let log = if destination.is_channel() { destination.raw() } else { nick };
                Some((log.to_owned(), line))
            }
            Event::Join { user, channel } => Some((
                channel.raw().to_owned(),
                format!("*** {} ({}) joined", user.target(), user.raw()),
            )),
            Event::Part { user, channel, reason } => Some((
                channel.raw().to_owned(),
                format!("*** {} left ({})", user.target(), reason.as_deref().unwrap_or("")),
            )),
            Event::Quit { user, reason } => Some((
                "*".to_owned(),
                format!("*** {} quit ({})", user.target(), reason.as_deref().unwrap_or("")),
            )),
            _ => None,
        }
    }
}

fn log_event(plugin: Arc<LoggerPlugin>) -> impl Fn(&EventContext<'_>, &mut ResponseQueue) -> Result<(), HandlerError> + Send + Sync + 'static {
    move |ctx, _queue| {
        if let Some((log, line)) = plugin.format(ctx.event) {
            info!(target: "firefly::chanlog", log = %log, "{line}");
        }
        Ok(())
    }
}

pub fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    let everything = EventParams {
        command_ok: true,
        reply_ok: true,
        ..EventParams::default()
    };
    for kind in [
        EventKind::ChannelMessage,
        EventKind::ChannelAction,
        EventKind::PrivateMessage,
        EventKind::PrivateAction,
        EventKind::Joined,
        EventKind::UserJoined,
        EventKind::Left,
        EventKind::UserLeft,
        EventKind::UserQuit,
    ] {
        registry.bind_event::<LoggerPlugin, _, _>(kind, everything, log_event)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use firefly_proto::{CapabilityTable, Destination, Hostmask, Message};

    use super::*;
    use crate::auth::SessionStore;

    fn plugin(settings: &str) -> LoggerPlugin {
        let auth = Arc::new(SessionStore::new(Duration::hours(1), true));
        let table: toml::Table = settings.parse().unwrap();
        LoggerPlugin::init(PluginHandle::new("logger", table, Arc::from(Vec::new()), auth)).unwrap()
    }

    fn message(target: &str, text: &str, kind: MessageKind) -> Event {
        let dest = Destination::classify(target, &CapabilityTable::new());
        Event::Message(Message::new(text, dest, Hostmask::parse("bob!u@h"), kind))
    }

    #[test]
    fn channel_lines() {
        let logger = plugin("");
        assert_eq!(
            logger.format(&message("#rust", "hi \x02all\x02", MessageKind::Message)),
            Some(("#rust".into(), "<bob> hi all".into()))
        );
        assert_eq!(
            logger.format(&message("#rust", "waves", MessageKind::Action)),
            Some(("#rust".into(), "* bob waves".into()))
        );
    }

    #[test]
    fn queries_need_opt_in() {
        assert!(plugin("").format(&message("firefly", "psst", MessageKind::Message)).is_none());

        let logger = plugin("log_queries = true");
        assert!(logger.settings().log_queries);
        assert_eq!(
            logger.format(&message("firefly", "psst", MessageKind::Message)),
            Some(("bob".into(), "<bob> psst".into()))
        );
    }

    #[test]
    fn bad_settings_fail_init() {
        let auth = Arc::new(SessionStore::new(Duration::hours(1), true));
        let table: toml::Table = "log_queries = \"yes\"".parse().unwrap();
        assert!(LoggerPlugin::init(PluginHandle::new("logger", table, Arc::from(Vec::new()), auth)).is_err());
    }

    #[test]
    fn membership_lines() {
        let logger = plugin("");
        let event = Event::Part {
            user: Hostmask::parse("bob!u@h"),
            channel: Destination::classify("#rust", &CapabilityTable::new()),
            reason: Some("bye".into()),
        };
        assert_eq!(logger.format(&event), Some(("#rust".into(), "*** bob left (bye)".into())));
    }
}
