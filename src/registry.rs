//! Command and event bindings.
//!
//! Plugins are registered through an explicit startup table (see
//! [`plugins::register_all`](crate::plugins::register_all)) before the
//! connection processes any line. After that the registry is read-only.
//!
//! Commands are keyed by `(plugin, command)`; binding the same pair twice
//! is a startup error. Events are keyed by [`EventKind`] and accumulate in
//! registration order.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use clap::{ArgMatches, ColorChoice};
use firefly_proto::Message;
use tracing::{debug, info};

use crate::auth::{Authenticator, Session};
use crate::dispatcher::{EventContext, EventKind};
use crate::error::{HandlerResult, RegistryError};
use crate::plugin::{Permission, Plugin, PluginHandle, PluginInit, normalize_name};
use crate::response::ResponseQueue;

/// Boxed command handler.
pub type CommandFn = Box<dyn Fn(&CommandContext<'_>, &mut ResponseQueue) -> HandlerResult + Send + Sync>;

/// Boxed event handler.
pub type EventFn = Box<dyn Fn(&EventContext<'_>, &mut ResponseQueue) -> HandlerResult + Send + Sync>;

/// What a command handler sees.
pub struct CommandContext<'a> {
    /// The message that invoked the command.
    pub message: &'a Message,
    /// Arguments parsed against the command's schema.
    pub args: &'a ArgMatches,
    /// The caller's session, if they have one.
    pub session: Option<&'a Session>,
}

/// A command's argument schema and handler, produced by a plugin.
pub struct CommandSpec {
    schema: clap::Command,
    handler: CommandFn,
}

impl CommandSpec {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&CommandContext<'_>, &mut ResponseQueue) -> HandlerResult + Send + Sync + 'static,
    {
        let schema = clap::Command::new("command")
            .no_binary_name(true)
            .disable_help_flag(true)
            .disable_version_flag(true)
            .color(ColorChoice::Never);
        Self {
            schema,
            handler: Box::new(handler),
        }
    }

    /// One-line description shown with usage errors.
    pub fn about(mut self, text: &'static str) -> Self {
        self.schema = self.schema.about(text);
        self
    }

    pub fn arg(mut self, arg: clap::Arg) -> Self {
        self.schema = self.schema.arg(arg);
        self
    }
}

/// Options for [`Registry::bind_command`].
#[derive(Clone, Copy, Debug, Default)]
pub struct CommandParams {
    /// Required privilege; the plugin default when `None`.
    pub permission: Option<Permission>,
}

/// Options for [`Registry::bind_event`].
#[derive(Clone, Copy, Debug, Default)]
pub struct EventParams {
    /// Required privilege; the plugin default when `None`.
    pub permission: Option<Permission>,
    /// Also fire when the message triggered a command.
    pub command_ok: bool,
    /// Also fire when the language engine replied to the message.
    pub reply_ok: bool,
}

/// A bound command.
pub struct CommandEntry {
    plugin: Arc<dyn Plugin>,
    name: String,
    schema: clap::Command,
    handler: CommandFn,
    permission: Permission,
}

impl CommandEntry {
    pub fn plugin(&self) -> &Arc<dyn Plugin> {
        &self.plugin
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Argument schema, named after the command.
    pub fn schema(&self) -> &clap::Command {
        &self.schema
    }

    pub fn permission(&self) -> Permission {
        self.permission
    }

    /// Run the handler.
    pub fn call(&self, ctx: &CommandContext<'_>, queue: &mut ResponseQueue) -> HandlerResult {
        (self.handler)(ctx, queue)
    }
}

impl fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEntry")
            .field("plugin", &self.plugin.name())
            .field("name", &self.name)
            .field("permission", &self.permission)
            .finish_non_exhaustive()
    }
}

/// A bound event handler.
pub struct EventBinding {
    plugin: Arc<dyn Plugin>,
    handler: EventFn,
    permission: Permission,
    command_ok: bool,
    reply_ok: bool,
}

impl EventBinding {
    pub fn plugin(&self) -> &Arc<dyn Plugin> {
        &self.plugin
    }

    pub fn permission(&self) -> Permission {
        self.permission
    }

    /// Whether this binding wants an event with the given flags.
    pub fn accepts(&self, is_command: bool, has_reply: bool) -> bool {
        (self.command_ok || !is_command) && (self.reply_ok || !has_reply)
    }

    /// Run the handler.
    pub fn call(&self, ctx: &EventContext<'_>, queue: &mut ResponseQueue) -> HandlerResult {
        (self.handler)(ctx, queue)
    }
}

impl fmt::Debug for EventBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBinding")
            .field("plugin", &self.plugin.name())
            .field("permission", &self.permission)
            .field("command_ok", &self.command_ok)
            .field("reply_ok", &self.reply_ok)
            .finish_non_exhaustive()
    }
}

struct LoadedPlugin {
    instance: Arc<dyn Any + Send + Sync>,
    plugin: Arc<dyn Plugin>,
}

/// Registry of plugins, commands and event bindings.
pub struct Registry {
    settings: HashMap<String, toml::Table>,
    identity: Arc<[String]>,
    auth: Arc<dyn Authenticator>,
    plugins: HashMap<String, LoadedPlugin>,
    load_order: Vec<String>,
    commands: HashMap<(String, String), CommandEntry>,
    events: HashMap<EventKind, Vec<EventBinding>>,
}

impl Registry {
    /// Create an empty registry.
    ///
    /// `settings` holds per-plugin tables keyed by plugin name; `identity`
    /// and `auth` are handed to every plugin through its handle.
    pub fn new(
        settings: HashMap<String, toml::Table>,
        identity: Vec<String>,
        auth: Arc<dyn Authenticator>,
    ) -> Self {
        let settings = settings
            .into_iter()
            .map(|(name, table)| (normalize_name(&name), table))
            .collect();
        Self {
            settings,
            identity: identity.into(),
            auth,
            plugins: HashMap::new(),
            load_order: Vec::new(),
            commands: HashMap::new(),
            events: HashMap::new(),
        }
    }

    /// Fetch the singleton for `P`, constructing it on first use.
    pub fn plugin<P: PluginInit>(&mut self) -> Result<Arc<P>, RegistryError> {
        let name = normalize_name(P::NAME);
        let invalid = |reason: String| RegistryError::InvalidPlugin {
            plugin: P::NAME.to_owned(),
            reason,
        };
        if name.is_empty() {
            return Err(invalid("plugin name is empty".into()));
        }

        if let Some(loaded) = self.plugins.get(&name) {
            return Arc::clone(&loaded.instance)
                .downcast::<P>()
                .map_err(|_| invalid(format!("name {name:?} is taken by another plugin type")));
        }

        let handle = PluginHandle::new(
            name.clone(),
            self.settings.get(&name).cloned().unwrap_or_default(),
            Arc::clone(&self.identity),
            Arc::clone(&self.auth),
        );
        let plugin = P::init(handle).map_err(|e| invalid(e.to_string()))?;
        if normalize_name(plugin.name()) != name {
            return Err(invalid(format!("instance reports name {:?}", plugin.name())));
        }

        let plugin = Arc::new(plugin);
        self.plugins.insert(
            name.clone(),
            LoadedPlugin {
                instance: plugin.clone(),
                plugin: plugin.clone(),
            },
        );
        info!(plugin = %name, "plugin loaded");
        self.load_order.push(name);
        Ok(plugin)
    }

    /// Bind a command to a plugin.
    ///
    /// `factory` receives the plugin singleton and returns the command's
    /// argument schema and handler. Fails with
    /// [`RegistryError::DuplicateCommand`] if the plugin already has a
    /// command by that (normalized) name.
    pub fn bind_command<P, F>(&mut self, name: &str, params: CommandParams, factory: F) -> Result<(), RegistryError>
    where
        P: PluginInit,
        F: FnOnce(Arc<P>) -> CommandSpec,
    {
        let command = normalize_name(name);
        let plugin = self.plugin::<P>()?;
        let plugin_name = normalize_name(plugin.name());
        if command.is_empty() {
            return Err(RegistryError::InvalidPlugin {
                plugin: plugin_name,
                reason: "command name is empty".into(),
            });
        }

        let key = (plugin_name, command);
        if self.commands.contains_key(&key) {
            let (plugin, command) = key;
            return Err(RegistryError::DuplicateCommand { plugin, command });
        }

        let permission = params.permission.unwrap_or_else(|| plugin.default_permission());
        let spec = factory(Arc::clone(&plugin));
        let entry = CommandEntry {
            plugin,
            name: key.1.clone(),
            schema: spec.schema.name(key.1.clone()),
            handler: spec.handler,
            permission,
        };
        debug!(plugin = %key.0, command = %key.1, %permission, "command bound");
        self.commands.insert(key, entry);
        Ok(())
    }

    /// Bind an event handler to a plugin. Repeated bindings accumulate.
    pub fn bind_event<P, F, H>(&mut self, kind: EventKind, params: EventParams, factory: F) -> Result<(), RegistryError>
    where
        P: PluginInit,
        F: FnOnce(Arc<P>) -> H,
        H: Fn(&EventContext<'_>, &mut ResponseQueue) -> HandlerResult + Send + Sync + 'static,
    {
        let plugin = self.plugin::<P>()?;
        let permission = params.permission.unwrap_or_else(|| plugin.default_permission());
        let handler = factory(Arc::clone(&plugin));
        debug!(plugin = %plugin.name(), event = %kind, %permission, "event bound");

        self.events.entry(kind).or_default().push(EventBinding {
            plugin,
            handler: Box::new(handler),
            permission,
            command_ok: params.command_ok,
            reply_ok: params.reply_ok,
        });
        Ok(())
    }

    /// Look up a command; both names are matched after normalization.
    pub fn get_command(&self, plugin: &str, name: &str) -> Result<&CommandEntry, RegistryError> {
        let plugin = normalize_name(plugin);
        let command = normalize_name(name);
        if !self.plugins.contains_key(&plugin) {
            return Err(RegistryError::NoSuchPlugin(plugin));
        }
        match self.commands.get(&(plugin.clone(), command.clone())) {
            Some(entry) => Ok(entry),
            None => Err(RegistryError::NoSuchCommand { plugin, command }),
        }
    }

    /// Every binding for `kind`, in registration order.
    pub fn get_events(&self, kind: EventKind) -> &[EventBinding] {
        self.events.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    /// Loaded plugins in load order.
    pub fn plugins(&self) -> impl Iterator<Item = &Arc<dyn Plugin>> {
        self.load_order
            .iter()
            .filter_map(|name| self.plugins.get(name).map(|p| &p.plugin))
    }

    /// Commands bound under `plugin`, sorted by name.
    pub fn commands_for(&self, plugin: &str) -> Vec<&CommandEntry> {
        let plugin = normalize_name(plugin);
        let mut entries: Vec<_> = self
            .commands
            .iter()
            .filter(|((p, _), _)| *p == plugin)
            .map(|(_, e)| e)
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("plugins", &self.load_order)
            .field("commands", &self.commands.len())
            .field("events", &self.events.len())
            .finish_non_exhaustive()
    }
}
