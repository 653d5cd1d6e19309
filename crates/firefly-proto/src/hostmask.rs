//! `nick!user@host` parsing and cached host resolution.

use std::fmt;
use std::net::IpAddr;
use std::sync::LazyLock;

use parking_lot::Mutex;
use regex::Regex;
use tracing::debug;

#[cfg(feature = "resolve")]
use crate::error::ResolveError;

static HOSTMASK_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^(?P<nick>[^!]+)!(?P<user>[^@]+)@(?P<host>.+)$").unwrap()
});

/// Cached outcome of resolving a hostmask's host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Resolution {
    /// No lookup attempted yet.
    #[default]
    Unresolved,
    /// The host resolved to this address.
    Resolved(IpAddr),
    /// A previous lookup failed.
    Failed,
}

/// An IRC user identity as sent in message prefixes.
///
/// Unparseable input is not an error: the raw string is kept and the
/// `nick`, `user` and `host` components are all `None`. Servers also send
/// bare server names as prefixes, which take this path.
#[derive(Debug)]
pub struct Hostmask {
    raw: String,
    nick: Option<String>,
    user: Option<String>,
    host: Option<String>,
    resolution: Mutex<Resolution>,
}

impl Hostmask {
    /// Parse a `nick!user@host` string.
    ///
    /// ```
    /// use firefly_proto::Hostmask;
    ///
    /// let mask = Hostmask::parse("Nick!~user@example.org");
    /// assert_eq!(mask.nick(), Some("Nick"));
    /// assert_eq!(mask.user(), Some("~user"));
    /// assert_eq!(mask.host(), Some("example.org"));
    ///
    /// let server = Hostmask::parse("irc.example.org");
    /// assert_eq!(server.nick(), None);
    /// ```
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let (nick, user, host) = match HOSTMASK_RE.captures(raw) {
            Some(caps) => (
                Some(caps["nick"].to_owned()),
                Some(caps["user"].to_owned()),
                Some(caps["host"].to_owned()),
            ),
            None => {
                debug!(hostmask = raw, "unparseable hostmask");
                (None, None, None)
            }
        };

        Hostmask {
            raw: raw.to_owned(),
            nick,
            user,
            host,
            resolution: Mutex::new(Resolution::Unresolved),
        }
    }

    /// The prefix as received.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Nickname component.
    pub fn nick(&self) -> Option<&str> {
        self.nick.as_deref()
    }

    /// Username (ident) component.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Host component.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Nickname if parsed, otherwise the raw string.
    pub fn nick_or_raw(&self) -> &str {
        self.nick.as_deref().unwrap_or(&self.raw)
    }

    /// Current cached resolution state.
    pub fn resolution(&self) -> Resolution {
        *self.resolution.lock()
    }

    /// Resolve the host to an IP address.
    ///
    /// The outcome is cached on this hostmask for its lifetime. A cached
    /// failure answers `Ok(None)` without another lookup unless
    /// `ignore_cache` is set. A fresh failure is cached too; it is reported
    /// as `Ok(None)` when `ignore_errors` is set, otherwise as an error.
    #[cfg(feature = "resolve")]
    pub async fn resolve_host(
        &self,
        ignore_errors: bool,
        ignore_cache: bool,
    ) -> Result<Option<IpAddr>, ResolveError> {
        if !ignore_cache {
            match self.resolution() {
                Resolution::Resolved(ip) => return Ok(Some(ip)),
                Resolution::Failed => return Ok(None),
                Resolution::Unresolved => {}
            }
        }

        let outcome = match self.host.as_deref() {
            Some(host) => lookup(host).await,
            None => Err(ResolveError::NoHost(self.raw.clone())),
        };

        match outcome {
            Ok(ip) => {
                *self.resolution.lock() = Resolution::Resolved(ip);
                Ok(Some(ip))
            }
            Err(e) => {
                *self.resolution.lock() = Resolution::Failed;
                debug!(hostmask = %self.raw, error = %e, "host resolution failed");
                if ignore_errors { Ok(None) } else { Err(e) }
            }
        }
    }
}

/// Process-wide resolver, built from the system configuration on first use.
#[cfg(feature = "resolve")]
static RESOLVER: LazyLock<hickory_resolver::TokioResolver> = LazyLock::new(|| {
    use hickory_resolver::TokioResolver;
    use hickory_resolver::config::ResolverConfig;
    use hickory_resolver::name_server::TokioConnectionProvider;

    TokioResolver::builder_tokio()
        .map(|b| b.build())
        .unwrap_or_else(|_| {
            TokioResolver::builder_with_config(
                ResolverConfig::default(),
                TokioConnectionProvider::default(),
            )
            .build()
        })
});

#[cfg(feature = "resolve")]
fn resolver() -> &'static hickory_resolver::TokioResolver {
    &RESOLVER
}

#[cfg(feature = "resolve")]
async fn lookup(host: &str) -> Result<IpAddr, ResolveError> {
    let response = resolver()
        .lookup_ip(host)
        .await
        .map_err(|e| ResolveError::Lookup {
            host: host.to_owned(),
            reason: e.to_string(),
        })?;

    response
        .iter()
        .next()
        .ok_or_else(|| ResolveError::NoAddress(host.to_owned()))
}

impl Clone for Hostmask {
    fn clone(&self) -> Self {
        Hostmask {
            raw: self.raw.clone(),
            nick: self.nick.clone(),
            user: self.user.clone(),
            host: self.host.clone(),
            resolution: Mutex::new(self.resolution()),
        }
    }
}

/// Hostmasks compare by their raw text; the resolution cache is ignored.
impl PartialEq for Hostmask {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Hostmask {}

impl fmt::Display for Hostmask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
