//! `datetime` plugin: the bot's local date and time.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, SecondsFormat, TimeZone};
use clap::{Arg, ArgAction};

use crate::error::{HandlerError, RegistryError};
use crate::plugin::{Plugin, PluginHandle, PluginInit};
use crate::registry::{CommandParams, CommandSpec, Registry};

#[derive(Debug)]
pub struct DateTimePlugin {
    handle: PluginHandle,
}

impl Plugin for DateTimePlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn handle(&self) -> &PluginHandle {
        &self.handle
    }
}

impl PluginInit for DateTimePlugin {
    const NAME: &'static str = "datetime";

    fn init(handle: PluginHandle) -> Result<Self, HandlerError> {
        Ok(Self { handle })
    }
}

/// What a command renders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stamp {
    Date,
    Time,
    DateTime,
}

pub fn render<Tz: TimeZone>(now: &DateTime<Tz>, stamp: Stamp, iso: bool) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match (stamp, iso) {
        (Stamp::Date, true) => now.format("%Y-%m-%d").to_string(),
        (Stamp::Date, false) => now.format("%B %-d, %Y").to_string(),
        (Stamp::Time, true) => now.format("%H:%M:%S %:z").to_string(),
        (Stamp::Time, false) => now.format("%-I:%M %p %:z").to_string(),
        (Stamp::DateTime, true) => now.to_rfc3339_opts(SecondsFormat::Secs, false),
        (Stamp::DateTime, false) => now.format("%B %-d, %Y - %-I:%M %p %:z").to_string(),
    }
}

/// Format `now` with a user-supplied strftime pattern.
///
/// Returns `None` when the pattern has an unknown specifier.
pub fn render_custom<Tz: TimeZone>(now: &DateTime<Tz>, pattern: &str) -> Option<String>
where
    Tz::Offset: std::fmt::Display,
{
    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|i| matches!(i, Item::Error)) {
        return None;
    }
    Some(now.format_with_items(items.into_iter()).to_string())
}

fn stamp_command(stamp: Stamp, about: &'static str) -> CommandSpec {
    CommandSpec::new(move |ctx, queue| {
        let iso = ctx.args.get_flag("iso");
        queue.add_message(render(&Local::now(), stamp, iso));
        Ok(())
    })
    .about(about)
    .arg(
        Arg::new("iso")
            .long("iso")
            .action(ArgAction::SetTrue)
            .help("Use ISO-8601 format"),
    )
}

pub fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.bind_command::<DateTimePlugin, _>("date", CommandParams::default(), |_| {
        stamp_command(Stamp::Date, "Show the current date")
    })?;
    registry.bind_command::<DateTimePlugin, _>("time", CommandParams::default(), |_| {
        stamp_command(Stamp::Time, "Show the current time")
    })?;
    registry.bind_command::<DateTimePlugin, _>("datetime", CommandParams::default(), |_| {
        stamp_command(Stamp::DateTime, "Show the current date and time")
    })?;

    registry.bind_command::<DateTimePlugin, _>("format", CommandParams::default(), |_| {
        CommandSpec::new(|ctx, queue| {
            let pattern = ctx
                .args
                .get_one::<String>("pattern")
                .ok_or_else(|| HandlerError::InvalidArgument("pattern is required".into()))?;
            let text = render_custom(&Local::now(), pattern)
                .ok_or_else(|| HandlerError::InvalidArgument(format!("bad format pattern {pattern:?}")))?;
            if !text.is_empty() {
                queue.add_message(text);
            }
            Ok(())
        })
        .about("Show the current time in a strftime format")
        .arg(Arg::new("pattern").required(true))
    })
}
