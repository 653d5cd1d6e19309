//! Typed inbound messages and the command-line grammar.
//!
//! A command line looks like
//! `<prefix><plugin> <command> [shell-tokenized args...]`, for example
//! `>>> seen "Some Nick"`.

use crate::destination::Destination;
use crate::error::CommandError;
use crate::format::strip_style;
use crate::hostmask::Hostmask;

/// The protocol verb a message arrived through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// PRIVMSG
    Message,
    /// NOTICE
    Notice,
    /// CTCP ACTION (`/me`)
    Action,
}

/// The pieces of a command invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandParts {
    /// Plugin name, as typed.
    pub plugin: String,
    /// Command name, as typed.
    pub command: String,
    /// Remaining tokens after shell-style splitting.
    pub args: Vec<String>,
}

/// A message, notice or action received from the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    raw: String,
    stripped: String,
    destination: Destination,
    source: Hostmask,
    kind: MessageKind,
}

impl Message {
    /// Build a message, trimming the text and computing its unstyled form.
    pub fn new(text: &str, destination: Destination, source: Hostmask, kind: MessageKind) -> Self {
        Message {
            raw: text.trim().to_owned(),
            stripped: strip_style(text).trim().to_owned(),
            destination,
            source,
            kind,
        }
    }

    /// Text as received, trimmed.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Text with formatting codes removed, trimmed.
    pub fn stripped(&self) -> &str {
        &self.stripped
    }

    /// Where the message was sent.
    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Who sent it.
    pub fn source(&self) -> &Hostmask {
        &self.source
    }

    /// Message, notice or action.
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// True if `prefix` is configured and the stripped text starts with it.
    ///
    /// An empty prefix counts as unconfigured.
    pub fn is_command(&self, prefix: Option<&str>) -> bool {
        match prefix {
            Some(p) if !p.is_empty() => self.stripped.starts_with(p),
            _ => false,
        }
    }

    /// Split a command line into plugin, command and arguments.
    ///
    /// The text after the prefix is tokenized with shell quoting rules and
    /// must hold at least a plugin and a command name. `#` has no special
    /// meaning, so channel names pass through as ordinary words.
    ///
    /// ```
    /// use firefly_proto::{CommandError, Destination, Hostmask, Message, MessageKind};
    ///
    /// let msg = Message::new(
    ///     r#">>> seen lookup "Some Nick""#,
    ///     Destination::user("bot"),
    ///     Hostmask::parse("a!b@c"),
    ///     MessageKind::Message,
    /// );
    /// let parts = msg.command_parts(Some(">>>")).unwrap();
    /// assert_eq!(parts.args, vec!["Some Nick".to_string()]);
    ///
    /// let short = Message::new(">>> seen", Destination::user("bot"), Hostmask::parse("a!b@c"), MessageKind::Message);
    /// assert_eq!(short.command_parts(Some(">>>")), Err(CommandError::Malformed(1)));
    /// ```
    pub fn command_parts(&self, prefix: Option<&str>) -> Result<CommandParts, CommandError> {
        let rest = match prefix {
            Some(p) if self.is_command(prefix) => self.stripped[p.len()..].trim(),
            _ => return Err(CommandError::NotACommand),
        };

        let tokens = split_words(rest).ok_or_else(|| CommandError::Tokenize(rest.to_owned()))?;
        let mut tokens = tokens.into_iter();
        match (tokens.next(), tokens.next()) {
            (Some(plugin), Some(command)) => Ok(CommandParts {
                plugin,
                command,
                args: tokens.collect(),
            }),
            (first, _) => Err(CommandError::Malformed(usize::from(first.is_some()))),
        }
    }
}

/// Split `text` into words using POSIX shell quoting, without comments.
///
/// Single quotes are literal. Inside double quotes a backslash escapes only
/// `"` and `\`. Outside quotes a backslash escapes any character. Returns
/// `None` on an unterminated quote or a trailing backslash.
fn split_words(text: &str) -> Option<Vec<String>> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next()? {
                        '\'' => break,
                        c => word.push(c),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next()? {
                        '"' => break,
                        '\\' => match chars.next()? {
                            c @ ('"' | '\\') => word.push(c),
                            c => {
                                word.push('\\');
                                word.push(c);
                            }
                        },
                        c => word.push(c),
                    }
                }
            }
            '\\' => {
                in_word = true;
                word.push(chars.next()?);
            }
            c => {
                in_word = true;
                word.push(c);
            }
        }
    }

    if in_word {
        words.push(word);
    }
    Some(words)
}
