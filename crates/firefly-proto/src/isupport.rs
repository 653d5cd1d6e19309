//! ISUPPORT (RPL_ISUPPORT / 005) capability table.
//!
//! Servers advertise their limits and protocol features as `KEY` or
//! `KEY=VALUE` tokens, usually spread over several 005 lines. The
//! [`CapabilityTable`] is created once per connection and merges every batch
//! as it arrives.
//!
//! # Reference
//! - Modern IRC documentation: <https://modern.ircdocs.horse/isupport.html>

use std::collections::BTreeSet;
use std::num::ParseIntError;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

static PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^\(([^)]+)\)(.+)$").unwrap()
});

/// Why a single recognised token could not be applied.
#[derive(Debug, Error)]
enum ValueError {
    #[error("invalid integer: {0}")]
    Int(#[from] ParseIntError),
    #[error("expected `prefixes:count`, got {0:?}")]
    LimitShape(String),
}

/// Channel modes grouped by parameter behaviour (`CHANMODES=A,B,C,D`).
///
/// - **A**: list modes, always take a parameter (e.g. `b`)
/// - **B**: settings that always take a parameter (e.g. `k`)
/// - **C**: settings that take a parameter only when set (e.g. `l`)
/// - **D**: settings that never take a parameter (e.g. `n`)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChanModes {
    /// Type A list modes.
    pub a: BTreeSet<char>,
    /// Type B modes.
    pub b: BTreeSet<char>,
    /// Type C modes.
    pub c: BTreeSet<char>,
    /// Type D modes.
    pub d: BTreeSet<char>,
}

impl ChanModes {
    /// Parse a `CHANMODES` value like `beI,k,l,imnpst`.
    ///
    /// Missing trailing groups are empty; groups past the fourth are ignored,
    /// as servers may append categories older clients don't know about.
    pub fn parse(value: &str) -> Self {
        let mut groups = value.split(',').map(|g| g.chars().collect::<BTreeSet<_>>());
        let mut next = || groups.next().unwrap_or_default();
        let (a, b, c, d) = (next(), next(), next(), next());
        ChanModes { a, b, c, d }
    }
}

/// Server capabilities learnt from ISUPPORT.
///
/// # Example
///
/// ```
/// use firefly_proto::CapabilityTable;
///
/// let mut caps = CapabilityTable::new();
/// caps.apply(["NETWORK=TestNet", "CHANTYPES=#&"]);
/// caps.apply(["PREFIX=(ov)@+", "NICKLEN=30"]);
///
/// assert_eq!(caps.network(), Some("TestNet"));
/// assert_eq!(caps.channel_types(), &['#', '&']);
/// assert_eq!(caps.prefixes(), &[('o', '@'), ('v', '+')]);
/// assert_eq!(caps.max_nick_length(), Some(30));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CapabilityTable {
    network: Option<String>,
    supports: Vec<(String, String)>,
    channel_modes: Option<ChanModes>,
    prefixes: Vec<(char, char)>,
    channel_types: Vec<char>,
    channel_limits: Vec<(Option<char>, usize)>,
    max_nick_length: Option<usize>,
    max_channel_length: Option<usize>,
    max_topic_length: Option<usize>,
    max_kick_length: Option<usize>,
    max_away_length: Option<usize>,
}

impl CapabilityTable {
    /// Create an empty table; nothing is known until the first 005 arrives.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a batch of raw ISUPPORT tokens into the table.
    ///
    /// Bare `KEY` tokens carry no state here and are skipped. A token whose
    /// value fails to parse is logged and skipped; the rest of the batch and
    /// later batches are still applied.
    pub fn apply<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for token in tokens {
            let token = token.as_ref();
            let Some((key, value)) = token.split_once('=') else {
                continue;
            };

            self.supports.push((key.to_owned(), value.to_owned()));
            if let Err(e) = self.apply_single(key, value) {
                warn!(key, value, error = %e, "failed to parse ISUPPORT entry");
            }
        }
    }

    fn apply_single(&mut self, key: &str, value: &str) -> Result<(), ValueError> {
        match key {
            "NETWORK" => {
                self.network = Some(value.to_owned());
                debug!(network = value, "network name set");
            }
            "CHANMODES" => {
                let modes = ChanModes::parse(value);
                debug!(?modes, "channel modes set");
                self.channel_modes = Some(modes);
            }
            "PREFIX" => {
                let Some(caps) = PREFIX_RE.captures(value) else {
                    debug!(value, "ignoring unrecognised PREFIX value");
                    return Ok(());
                };
                self.prefixes = caps[1].chars().zip(caps[2].chars()).collect();
                debug!(prefixes = ?self.prefixes, "prefixes set");
            }
            "CHANTYPES" => {
                self.channel_types = value.chars().collect();
                debug!(types = ?self.channel_types, "channel types set");
            }
            "CHANLIMIT" => {
                let mut parsed = Vec::new();
                for limit in value.split(',') {
                    let (prefixes, count) = limit
                        .split_once(':')
                        .ok_or_else(|| ValueError::LimitShape(limit.to_owned()))?;
                    let count: usize = count.parse()?;
                    parsed.extend(prefixes.chars().map(|p| (Some(p), count)));
                }
                self.channel_limits.extend(parsed);
                debug!(limits = ?self.channel_limits, "channel limits set");
            }
            "MAXCHANNELS" => {
                self.channel_limits.push((None, value.parse()?));
                debug!(limits = ?self.channel_limits, "channel limits set");
            }
            "NICKLEN" => self.max_nick_length = Some(value.parse()?),
            "CHANNELLEN" => self.max_channel_length = Some(value.parse()?),
            "TOPICLEN" => self.max_topic_length = Some(value.parse()?),
            "KICKLEN" => self.max_kick_length = Some(value.parse()?),
            "AWAYLEN" => self.max_away_length = Some(value.parse()?),
            _ => {}
        }
        Ok(())
    }

    /// The advertised network name.
    pub fn network(&self) -> Option<&str> {
        self.network.as_deref()
    }

    /// Every `KEY=VALUE` token seen so far, in arrival order.
    pub fn supports(&self) -> &[(String, String)] {
        &self.supports
    }

    /// Latest raw value for a key, matched case-insensitively.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.supports
            .iter()
            .rfind(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Channel mode groups, once `CHANMODES` has been seen.
    pub fn channel_modes(&self) -> Option<&ChanModes> {
        self.channel_modes.as_ref()
    }

    /// `(mode, prefix)` pairs, most to least powerful.
    pub fn prefixes(&self) -> &[(char, char)] {
        &self.prefixes
    }

    /// Prefix symbol for a membership mode, e.g. `o` -> `@`.
    pub fn prefix_for_mode(&self, mode: char) -> Option<char> {
        self.prefixes.iter().find(|(m, _)| *m == mode).map(|(_, p)| *p)
    }

    /// Membership mode for a prefix symbol, e.g. `+` -> `v`.
    pub fn mode_for_prefix(&self, prefix: char) -> Option<char> {
        self.prefixes.iter().find(|(_, p)| *p == prefix).map(|(m, _)| *m)
    }

    /// Channel-type prefixes in declaration order; empty until `CHANTYPES` arrives.
    pub fn channel_types(&self) -> &[char] {
        &self.channel_types
    }

    /// `(prefix, count)` join limits; `None` prefix comes from legacy `MAXCHANNELS`.
    pub fn channel_limits(&self) -> &[(Option<char>, usize)] {
        &self.channel_limits
    }

    /// Maximum nickname length.
    pub fn max_nick_length(&self) -> Option<usize> {
        self.max_nick_length
    }

    /// Maximum channel name length.
    pub fn max_channel_length(&self) -> Option<usize> {
        self.max_channel_length
    }

    /// Maximum topic length.
    pub fn max_topic_length(&self) -> Option<usize> {
        self.max_topic_length
    }

    /// Maximum kick comment length.
    pub fn max_kick_length(&self) -> Option<usize> {
        self.max_kick_length
    }

    /// Maximum away message length.
    pub fn max_away_length(&self) -> Option<usize> {
        self.max_away_length
    }
}
