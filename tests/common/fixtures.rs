//! Stand-in collaborators and a recording plugin.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use clap::{Arg, value_parser};
use firefly::auth::{Authenticator, Session};
use firefly::dispatcher::{DispatchSettings, Dispatcher, EventContext, EventKind};
use firefly::error::{HandlerError, LanguageError, RegistryError, TransportError};
use firefly::language::{Addressing, LanguageEngine, LanguageRequest};
use firefly::plugin::{Permission, Plugin, PluginHandle, PluginInit};
use firefly::registry::{CommandParams, CommandSpec, EventParams, Registry};
use firefly::response::ResponseQueue;
use firefly::transport::Transport;
use firefly_proto::Hostmask;
use parking_lot::Mutex;

/// A line that reached the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sent {
    Msg(String, String),
    Notice(String, String),
    Action(String, String),
}

/// Transport that records instead of sending.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingTransport {
    /// Everything sent so far, clearing the record.
    pub fn take(&self) -> Vec<Sent> {
        std::mem::take(&mut *self.sent.lock())
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn msg(&self, target: &str, text: &str) -> Result<(), TransportError> {
        self.sent.lock().push(Sent::Msg(target.into(), text.into()));
        Ok(())
    }

    async fn notice(&self, target: &str, text: &str) -> Result<(), TransportError> {
        self.sent.lock().push(Sent::Notice(target.into(), text.into()));
        Ok(())
    }

    async fn describe(&self, target: &str, text: &str) -> Result<(), TransportError> {
        self.sent.lock().push(Sent::Action(target.into(), text.into()));
        Ok(())
    }
}

/// Language engine with a canned reply that records every request.
#[derive(Debug, Default)]
pub struct StubLanguage {
    reply: Option<String>,
    requests: Mutex<Vec<(String, Addressing)>>,
}

impl StubLanguage {
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<(String, Addressing)> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl LanguageEngine for StubLanguage {
    async fn get_reply(&self, request: &LanguageRequest<'_>) -> Result<Option<String>, LanguageError> {
        self.requests
            .lock()
            .push((request.text.to_string(), request.addressing.clone()));
        Ok(self.reply.clone())
    }
}

/// Sessions keyed by lowercased nick.
#[derive(Debug, Default)]
pub struct StubAuth {
    sessions: HashMap<String, Session>,
}

impl StubAuth {
    pub fn with(mut self, nick: &str, group: &str) -> Self {
        self.sessions.insert(
            nick.to_lowercase(),
            Session {
                user: nick.to_string(),
                group: group.to_string(),
                host: "example.org".to_string(),
                expires: Utc::now() + Duration::hours(1),
            },
        );
        self
    }
}

impl Authenticator for StubAuth {
    fn check(&self, source: &Hostmask) -> Option<Session> {
        self.sessions
            .get(&source.nick_or_raw().to_lowercase())
            .cloned()
    }
}

/// What a [`PluginTest`] binding observed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Seen {
    pub label: &'static str,
    pub kind: EventKind,
    pub has_reply: bool,
    pub is_command: bool,
}

/// Plugin that records events and offers a few commands:
///
/// - `ping <times> [--message M]`: replies `M` (default `pong`) N times
/// - `secret`: admin only
/// - `fail`: always errors
#[derive(Debug)]
pub struct PluginTest {
    handle: PluginHandle,
    seen: Mutex<Vec<Seen>>,
}

impl Plugin for PluginTest {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn handle(&self) -> &PluginHandle {
        &self.handle
    }
}

impl PluginInit for PluginTest {
    const NAME: &'static str = "plugintest";

    fn init(handle: PluginHandle) -> Result<Self, HandlerError> {
        Ok(Self {
            handle,
            seen: Mutex::new(Vec::new()),
        })
    }
}

impl PluginTest {
    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().clone()
    }

    /// Observations for one label, in order.
    pub fn seen_by(&self, label: &str) -> Vec<Seen> {
        self.seen().into_iter().filter(|s| s.label == label).collect()
    }

    pub fn clear(&self) {
        self.seen.lock().clear();
    }

    fn record(&self, label: &'static str, ctx: &EventContext<'_>) {
        self.seen.lock().push(Seen {
            label,
            kind: ctx.kind,
            has_reply: ctx.has_reply,
            is_command: ctx.is_command,
        });
    }

    /// Bind the plugin's commands and recorders.
    pub fn register(registry: &mut Registry) -> Result<Arc<Self>, RegistryError> {
        registry.bind_command::<PluginTest, _>("ping", CommandParams::default(), |_| {
            CommandSpec::new(|ctx, queue| {
                let times = ctx.args.get_one::<u32>("times").copied().unwrap_or(1);
                let message = ctx
                    .args
                    .get_one::<String>("message")
                    .cloned()
                    .unwrap_or_default();
                queue.add_message(vec![message; times as usize].join(" "));
                Ok(())
            })
            .about("Reply with pong")
            .arg(Arg::new("times").required(true).value_parser(value_parser!(u32)))
            .arg(Arg::new("message").long("message").default_value("pong"))
        })?;

        let admin = CommandParams {
            permission: Some(Permission::Admin),
        };
        registry.bind_command::<PluginTest, _>("secret", admin, |_| {
            CommandSpec::new(|_, queue| {
                queue.add_message("classified");
                Ok(())
            })
        })?;

        registry.bind_command::<PluginTest, _>("fail", CommandParams::default(), |_| {
            CommandSpec::new(|_, queue| {
                queue.add_message("partial output");
                Err(HandlerError::Internal("boom".into()))
            })
        })?;

        let any = EventParams {
            command_ok: true,
            reply_ok: true,
            ..EventParams::default()
        };
        for kind in EventKind::ALL {
            registry.bind_event::<PluginTest, _, _>(*kind, any, |plugin| {
                move |ctx: &EventContext<'_>, _: &mut ResponseQueue| {
                    plugin.record("any", ctx);
                    Ok(())
                }
            })?;
        }

        registry.bind_event::<PluginTest, _, _>(EventKind::ChannelMessage, EventParams::default(), |plugin| {
            move |ctx: &EventContext<'_>, _: &mut ResponseQueue| {
                plugin.record("strict", ctx);
                Ok(())
            }
        })?;

        let admin_only = EventParams {
            permission: Some(Permission::Admin),
            ..any
        };
        registry.bind_event::<PluginTest, _, _>(EventKind::ChannelMessage, admin_only, |plugin| {
            move |ctx: &EventContext<'_>, _: &mut ResponseQueue| {
                plugin.record("admin", ctx);
                Ok(())
            }
        })?;

        for kind in [EventKind::ChannelNotice, EventKind::PrivateNotice] {
            registry.bind_event::<PluginTest, _, _>(kind, any, |_| {
                |_: &EventContext<'_>, queue: &mut ResponseQueue| {
                    queue.add_message("replying to a notice");
                    Ok(())
                }
            })?;
        }

        registry.plugin::<PluginTest>()
    }
}

/// A dispatcher wired to recording collaborators.
pub struct Harness {
    pub dispatcher: Dispatcher,
    pub transport: Arc<RecordingTransport>,
    pub language: Arc<StubLanguage>,
    pub plugin: Arc<PluginTest>,
}

impl Harness {
    pub fn new(language: StubLanguage, auth: StubAuth, public_errors: bool) -> Self {
        let auth = Arc::new(auth);
        let mut registry = Registry::new(HashMap::new(), vec!["firefly".to_string()], auth.clone());
        let plugin = PluginTest::register(&mut registry).expect("plugin registers");

        let settings = DispatchSettings {
            command_prefix: Some(">>>".to_string()),
            public_errors,
            identity: vec!["firefly".to_string(), "ff".to_string()],
            nick: "firefly".to_string(),
        };
        let transport = Arc::new(RecordingTransport::default());
        let language = Arc::new(language);
        let dispatcher = Dispatcher::new(registry, settings, transport.clone(), language.clone(), auth);
        Self {
            dispatcher,
            transport,
            language,
            plugin,
        }
    }

    pub fn quiet() -> Self {
        Self::new(StubLanguage::silent(), StubAuth::default(), false)
    }
}
