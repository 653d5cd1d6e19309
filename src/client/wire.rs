//! Raw line parsing and translation into [`ProtocolEvent`]s.

use std::fmt;

use firefly_proto::{CapabilityTable, Destination};
use tracing::debug;

use crate::dispatcher::{CtcpQuery, ProtocolEvent};

const CTCP_DELIM: char = '\x01';

/// One parsed protocol line: `[@tags] [:prefix] COMMAND params [:trailing]`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Line {
    pub tags: Vec<(String, Option<String>)>,
    pub prefix: Option<String>,
    /// Upper-cased command or three-digit numeric.
    pub command: String,
    pub params: Vec<String>,
}

impl Line {
    /// Parse a line, without its terminator. Returns `None` when there is no command.
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']).trim_start_matches(' ');
        let mut parsed = Line::default();

        if let Some(tagged) = rest.strip_prefix('@') {
            let (tags, tail) = tagged.split_once(' ').unwrap_or((tagged, ""));
            parsed.tags = tags
                .split(';')
                .filter(|t| !t.is_empty())
                .map(|t| match t.split_once('=') {
                    Some((k, v)) => (k.to_owned(), Some(v.to_owned())),
                    None => (t.to_owned(), None),
                })
                .collect();
            rest = tail.trim_start_matches(' ');
        }

        if let Some(prefixed) = rest.strip_prefix(':') {
            let (prefix, tail) = prefixed.split_once(' ').unwrap_or((prefixed, ""));
            parsed.prefix = Some(prefix.to_owned());
            rest = tail.trim_start_matches(' ');
        }

        let (command, mut rest) = rest.split_once(' ').unwrap_or((rest, ""));
        if command.is_empty() {
            return None;
        }
        parsed.command = command.to_ascii_uppercase();

        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                parsed.params.push(trailing.to_owned());
                break;
            }
            let (param, tail) = rest.split_once(' ').unwrap_or((rest, ""));
            parsed.params.push(param.to_owned());
            rest = tail;
        }

        Some(parsed)
    }

    fn param(&self, index: usize) -> String {
        self.params.get(index).cloned().unwrap_or_default()
    }

    fn last(&self) -> String {
        self.params.last().cloned().unwrap_or_default()
    }

    fn source(&self) -> String {
        self.prefix.clone().unwrap_or_default()
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{prefix} ")?;
        }
        f.write_str(&self.command)?;
        if let Some((last, init)) = self.params.split_last() {
            for p in init {
                write!(f, " {p}")?;
            }
            write!(f, " :{last}")?;
        }
        Ok(())
    }
}

/// Split CTCP queries out of a message body.
///
/// Returns the queries and whatever plain text surrounds them.
pub fn ctcp_extract(text: &str) -> (Vec<CtcpQuery>, String) {
    let mut queries = Vec::new();
    let mut normal = String::new();
    for (i, segment) in text.split(CTCP_DELIM).enumerate() {
        if i % 2 == 0 {
            normal.push_str(segment);
        } else if !segment.is_empty() {
            let (tag, data) = match segment.split_once(' ') {
                Some((tag, data)) => (tag, Some(data.to_owned())),
                None => (segment, None),
            };
            queries.push(CtcpQuery {
                tag: tag.to_ascii_uppercase(),
                data,
            });
        }
    }
    (queries, normal)
}

/// Stateful line-to-event translation for one connection.
///
/// Keeps the partial MOTD and a copy of the server's capabilities, which
/// decide how MODE parameters are assigned.
#[derive(Debug, Default)]
pub struct Translator {
    motd: Option<Vec<String>>,
    caps: CapabilityTable,
}

impl Translator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn translate(&mut self, line: &Line) -> Vec<ProtocolEvent> {
        match line.command.as_str() {
            "001" => vec![ProtocolEvent::Welcome {
                server: line.source(),
                nick: line.param(0),
                text: line.last(),
            }],
            "005" if line.params.len() > 2 => {
                let tokens = line.params[1..line.params.len() - 1].to_vec();
                self.caps.apply(&tokens);
                vec![ProtocolEvent::ISupport { tokens }]
            }
            "375" => {
                self.motd = Some(Vec::new());
                Vec::new()
            }
            "372" => {
                let text = line.last();
                let text = text.strip_prefix("- ").unwrap_or(&text);
                self.motd.get_or_insert_with(Vec::new).push(text.to_owned());
                Vec::new()
            }
            "376" => {
                let lines = self.motd.take().unwrap_or_default();
                vec![ProtocolEvent::Motd { lines }]
            }
            "332" => vec![ProtocolEvent::Topic {
                source: line.source(),
                channel: line.param(1),
                topic: line.last(),
            }],
            "433" => vec![ProtocolEvent::NickInUse { nick: line.param(1) }],
            "PRIVMSG" if line.params.len() >= 2 => self.privmsg(line),
            "NOTICE" if line.params.len() >= 2 => {
                let (_, text) = ctcp_extract(&line.param(1));
                if text.is_empty() {
                    return Vec::new();
                }
                vec![ProtocolEvent::Notice {
                    source: line.source(),
                    target: line.param(0),
                    text,
                }]
            }
            "JOIN" if !line.params.is_empty() => vec![ProtocolEvent::Join {
                source: line.source(),
                channel: line.param(0),
            }],
            "PART" if !line.params.is_empty() => vec![ProtocolEvent::Part {
                source: line.source(),
                channel: line.param(0),
                reason: line.params.get(1).cloned(),
            }],
            "KICK" if line.params.len() >= 2 => vec![ProtocolEvent::Kick {
                source: line.source(),
                channel: line.param(0),
                kicked: line.param(1),
                reason: line.params.get(2).cloned(),
            }],
            "QUIT" => vec![ProtocolEvent::Quit {
                source: line.source(),
                reason: line.params.first().cloned(),
            }],
            "NICK" if !line.params.is_empty() => vec![ProtocolEvent::Nick {
                source: line.source(),
                nick: line.param(0),
            }],
            "MODE" if line.params.len() >= 2 => self.mode(line),
            "TOPIC" if line.params.len() >= 2 => vec![ProtocolEvent::Topic {
                source: line.source(),
                channel: line.param(0),
                topic: line.last(),
            }],
            _ => vec![ProtocolEvent::Unknown {
                source: line.prefix.clone(),
                command: line.command.clone(),
                params: line.params.clone(),
            }],
        }
    }

    fn privmsg(&self, line: &Line) -> Vec<ProtocolEvent> {
        let source = line.source();
        let target = line.param(0);
        let text = line.param(1);
        if !text.contains(CTCP_DELIM) {
            return vec![ProtocolEvent::Privmsg { source, target, text }];
        }

        let (queries, normal) = ctcp_extract(&text);
        let mut events = Vec::new();
        let mut others = Vec::new();
        for query in queries {
            if query.tag == "ACTION" {
                events.push(ProtocolEvent::Action {
                    source: source.clone(),
                    target: target.clone(),
                    text: query.data.unwrap_or_default(),
                });
            } else {
                others.push(query);
            }
        }
        if !others.is_empty() {
            events.push(ProtocolEvent::CtcpQuery {
                source: source.clone(),
                target: target.clone(),
                queries: others,
            });
        }
        if !normal.trim().is_empty() {
            events.push(ProtocolEvent::Privmsg { source, target, text: normal });
        }
        events
    }

    /// Split a MODE line into one event per `+`/`-` run.
    fn mode(&self, line: &Line) -> Vec<ProtocolEvent> {
        let source = line.source();
        let target = line.param(0);
        let is_channel = Destination::classify(&target, &self.caps).is_channel();
        let mut args = line.params[2..].iter();

        let mut events: Vec<ProtocolEvent> = Vec::new();
        let mut set = true;
        let mut modes = String::new();
        let mut run_args = Vec::new();
        for c in line.params[1].chars() {
            match c {
                '+' | '-' => {
                    if !modes.is_empty() {
                        events.push(ProtocolEvent::Mode {
                            source: source.clone(),
                            target: target.clone(),
                            set,
                            modes: std::mem::take(&mut modes),
                            args: std::mem::take(&mut run_args),
                        });
                    }
                    set = c == '+';
                }
                mode => {
                    modes.push(mode);
                    if is_channel && self.takes_arg(mode, set) {
                        match args.next() {
                            Some(arg) => run_args.push(arg.clone()),
                            None => debug!(mode = %mode, "mode is missing its parameter"),
                        }
                    }
                }
            }
        }
        if !modes.is_empty() {
            events.push(ProtocolEvent::Mode { source, target, set, modes, args: run_args });
        }
        events
    }

    fn takes_arg(&self, mode: char, set: bool) -> bool {
        if self.caps.prefix_for_mode(mode).is_some() {
            return true;
        }
        match self.caps.channel_modes() {
            Some(groups) => {
                groups.a.contains(&mode) || groups.b.contains(&mode) || (set && groups.c.contains(&mode))
            }
            None => matches!(mode, 'o' | 'v' | 'b' | 'e' | 'I' | 'k') || (set && mode == 'l'),
        }
    }
}
