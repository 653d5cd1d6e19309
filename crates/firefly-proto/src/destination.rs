//! Channel vs. user classification of message targets.

use std::fmt;

use crate::isupport::CapabilityTable;

/// Channel-type prefixes assumed before the server has sent `CHANTYPES`.
pub const DEFAULT_CHANNEL_TYPES: &[char] = &['#'];

/// What a destination addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DestinationKind {
    /// A channel, e.g. `#rust`.
    Channel,
    /// A single user (a query).
    User,
}

/// A classified message target.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Destination {
    raw: String,
    kind: DestinationKind,
    prefix: Option<char>,
    name: String,
}

impl Destination {
    /// Classify `raw` against the channel types the server advertised.
    ///
    /// Prefixes are tried in declaration order and the first match wins.
    /// Every leading copy of the matched prefix is removed to form the name,
    /// so `##foo` becomes `foo`.
    ///
    /// ```
    /// use firefly_proto::{CapabilityTable, Destination, DestinationKind};
    ///
    /// let caps = CapabilityTable::new();
    /// let dest = Destination::classify("##foo", &caps);
    /// assert_eq!(dest.kind(), DestinationKind::Channel);
    /// assert_eq!(dest.name(), "foo");
    /// ```
    pub fn classify(raw: &str, caps: &CapabilityTable) -> Self {
        let types = match caps.channel_types() {
            [] => DEFAULT_CHANNEL_TYPES,
            types => types,
        };

        match types.iter().copied().find(|&t| raw.starts_with(t)) {
            Some(prefix) => Destination {
                raw: raw.to_owned(),
                kind: DestinationKind::Channel,
                prefix: Some(prefix),
                name: raw.trim_start_matches(prefix).to_owned(),
            },
            None => Destination::user(raw),
        }
    }

    /// A user destination, bypassing classification.
    pub fn user(raw: &str) -> Self {
        Destination {
            raw: raw.to_owned(),
            kind: DestinationKind::User,
            prefix: None,
            name: raw.to_owned(),
        }
    }

    /// The string as it appeared on the wire.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Channel or user.
    pub fn kind(&self) -> DestinationKind {
        self.kind
    }

    /// The matched channel-type prefix; `None` for users.
    pub fn prefix(&self) -> Option<char> {
        self.prefix
    }

    /// The raw string with its channel prefix stripped.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True for channel destinations.
    pub fn is_channel(&self) -> bool {
        self.kind == DestinationKind::Channel
    }

    /// True for user destinations.
    pub fn is_user(&self) -> bool {
        self.kind == DestinationKind::User
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(tokens: &[&str]) -> CapabilityTable {
        let mut caps = CapabilityTable::new();
        caps.apply(tokens);
        caps
    }

    #[test]
    fn default_types_before_isupport() {
        let dest = Destination::classify("#rust", &CapabilityTable::new());
        assert!(dest.is_channel());
        assert_eq!(dest.prefix(), Some('#'));
        assert_eq!(dest.name(), "rust");
        assert_eq!(dest.raw(), "#rust");
    }

    #[test]
    fn strips_every_leading_prefix() {
        let dest = Destination::classify("##foo", &caps(&["CHANTYPES=#"]));
        assert!(dest.is_channel());
        assert_eq!(dest.name(), "foo");
    }

    #[test]
    fn only_matched_prefix_is_stripped() {
        let dest = Destination::classify("&#mixed", &caps(&["CHANTYPES=#&"]));
        assert_eq!(dest.prefix(), Some('&'));
        assert_eq!(dest.name(), "#mixed");
    }

    #[test]
    fn user_keeps_raw_name() {
        let dest = Destination::classify("Bob", &caps(&["CHANTYPES=#&"]));
        assert_eq!(dest.kind(), DestinationKind::User);
        assert_eq!(dest.prefix(), None);
        assert_eq!(dest.name(), "Bob");
    }

    #[test]
    fn advertised_types_replace_default() {
        let dest = Destination::classify("#rust", &caps(&["CHANTYPES=&"]));
        assert!(dest.is_user());
    }
}
