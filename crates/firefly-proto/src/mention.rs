//! Detection of nick mentions in message text.
//!
//! A mention decides whether channel chatter is addressed to the bot:
//! `Bot: hello`, `hello there Bot,` or anything containing `Bot` as a word.
//! Absence of a mention is an ordinary `None`.

use regex::{Regex, RegexBuilder};
use tracing::warn;

/// Where in the message the nick must appear.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MentionLocation {
    /// `NICK[sep] message`
    Start,
    /// `message[sep] NICK[ender]`
    End,
    /// `NICK` as a whole word anywhere in the text.
    Anywhere,
}

/// A successful mention match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mention {
    /// The nick as written in the message.
    pub nick: String,
    /// The remaining text with separators and surrounding whitespace removed.
    /// For [`MentionLocation::Anywhere`] this is the whole message.
    pub message: String,
    /// Which pattern matched.
    pub location: MentionLocation,
}

/// A compiled mention pattern for a fixed set of nicks.
#[derive(Clone, Debug)]
pub struct MentionMatcher {
    regex: Option<Regex>,
    location: MentionLocation,
}

impl MentionMatcher {
    /// Compile a matcher for `nicks`.
    ///
    /// Nicks are matched case-insensitively and escaped before use, so
    /// `[bot]` only matches itself. An empty nick list yields a matcher that
    /// never matches.
    pub fn new<S: AsRef<str>>(nicks: &[S], location: MentionLocation) -> Result<Self, regex::Error> {
        let mut escaped: Vec<String> = nicks
            .iter()
            .map(|n| n.as_ref().trim())
            .filter(|n| !n.is_empty())
            .map(regex::escape)
            .collect();
        if escaped.is_empty() {
            return Ok(Self::empty(location));
        }
        // Alternation is leftmost-first; longer nicks must win over their prefixes.
        escaped.sort_by_key(|n| std::cmp::Reverse(n.len()));
        let nicks = escaped.join("|");

        let pattern = match location {
            MentionLocation::Start => {
                format!(r"^(?P<nick>{nicks})(?P<separator>[^\w\s])?\s*(?P<message>.*)$")
            }
            MentionLocation::End => format!(
                r"^(?P<message>.+?)(?:(?P<separator>[^\w\s])\s*)*?(?P<nick>{nicks})(?P<ender>[^\w\s])?$"
            ),
            MentionLocation::Anywhere => format!(r"\b(?P<nick>{nicks})\b"),
        };

        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()?;
        Ok(Self {
            regex: Some(regex),
            location,
        })
    }

    /// A matcher that never matches.
    pub fn empty(location: MentionLocation) -> Self {
        Self { regex: None, location }
    }

    /// Where this matcher looks for the nick.
    pub fn location(&self) -> MentionLocation {
        self.location
    }

    /// Match `text`, returning the nick and the remaining message.
    pub fn detect(&self, text: &str) -> Option<Mention> {
        let caps = self.regex.as_ref()?.captures(text)?;
        let nick = caps.name("nick")?.as_str().to_owned();
        let message = match self.location {
            MentionLocation::Anywhere => text.trim(),
            _ => caps.name("message").map_or("", |m| m.as_str().trim()),
        };

        Some(Mention {
            nick,
            message: message.to_owned(),
            location: self.location,
        })
    }
}

/// One-shot mention detection.
///
/// ```
/// use firefly_proto::{detect_mention, MentionLocation};
///
/// let m = detect_mention("Bob: hello there", &["Bob"], MentionLocation::Start).unwrap();
/// assert_eq!(m.nick, "Bob");
/// assert_eq!(m.message, "hello there");
///
/// let m = detect_mention("hello there Bob,", &["bob"], MentionLocation::End).unwrap();
/// assert_eq!(m.message, "hello there");
/// ```
pub fn detect_mention<S: AsRef<str>>(text: &str, nicks: &[S], location: MentionLocation) -> Option<Mention> {
    match MentionMatcher::new(nicks, location) {
        Ok(matcher) => matcher.detect(text),
        Err(e) => {
            warn!(error = %e, "failed to compile mention pattern");
            None
        }
    }
}
