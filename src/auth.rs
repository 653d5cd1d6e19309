//! Caller authentication.
//!
//! Commands and events above guest level require the caller to hold an
//! active session. [`SessionStore`] checks passwords against the configured
//! `[auth.users]` accounts and keeps sessions in memory, keyed by host, until
//! they expire.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use firefly_proto::Hostmask;
use tracing::{debug, info};

use crate::config::{AuthConfig, UserBlock};
use crate::error::AuthError;

/// An authenticated caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    /// Account name.
    pub user: String,
    /// Account group, e.g. `admin` or `user`.
    pub group: String,
    /// Host the session is bound to.
    pub host: String,
    /// When the session lapses unless refreshed.
    pub expires: DateTime<Utc>,
}

impl Session {
    /// Members of the `admin` group may run admin-level commands.
    pub fn is_admin(&self) -> bool {
        self.group.eq_ignore_ascii_case("admin")
    }
}

/// Resolves a caller to their session.
pub trait Authenticator: Send + Sync {
    /// The caller's active session, if any.
    fn check(&self, source: &Hostmask) -> Option<Session>;

    /// Every active session.
    fn sessions(&self) -> Vec<Session> {
        Vec::new()
    }

    /// Log the caller's host in to `user`.
    fn attempt(&self, _source: &Hostmask, _user: &str, _password: &str) -> Result<Session, AuthError> {
        Err(AuthError::Unsupported)
    }

    /// End the caller's session; returns whether one existed.
    fn logout(&self, _source: &Hostmask) -> bool {
        false
    }
}

/// In-memory, expiring sessions keyed by host.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    /// Accounts keyed by lowercased name.
    users: HashMap<String, UserBlock>,
    lifetime: Duration,
    refresh_on_access: bool,
}

impl SessionStore {
    pub fn new(lifetime: Duration, refresh_on_access: bool) -> Self {
        Self {
            sessions: DashMap::new(),
            users: HashMap::new(),
            lifetime,
            refresh_on_access,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        let hours = i64::try_from(config.session_hours).unwrap_or(i64::MAX);
        let lifetime = Duration::try_hours(hours).unwrap_or(Duration::MAX);
        Self::new(lifetime, config.refresh_on_access).with_users(config.users.clone())
    }

    /// Replace the known accounts.
    pub fn with_users(mut self, users: HashMap<String, UserBlock>) -> Self {
        self.users = users
            .into_iter()
            .map(|(name, block)| (name.trim().to_lowercase(), block))
            .collect();
        self
    }

    /// Start (or replace) the session for the caller's host without a password check.
    pub fn start(&self, source: &Hostmask, user: &str, group: &str) -> Session {
        let host = session_key(source);
        let session = Session {
            user: user.to_owned(),
            group: group.to_lowercase(),
            host: host.clone(),
            expires: self.expiry_from(Utc::now()),
        };
        info!(user, host = %host, group, "session started");
        self.sessions.insert(host, session.clone());
        session
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.lifetime)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn check_at(&self, source: &Hostmask, now: DateTime<Utc>) -> Option<Session> {
        let key = session_key(source);
        let mut entry = self.sessions.get_mut(&key)?;
        if entry.expires <= now {
            drop(entry);
            self.sessions.remove(&key);
            debug!(host = %key, "session expired");
            return None;
        }
        if self.refresh_on_access {
            entry.expires = self.expiry_from(now);
        }
        Some(entry.value().clone())
    }
}

impl Authenticator for SessionStore {
    fn check(&self, source: &Hostmask) -> Option<Session> {
        self.check_at(source, Utc::now())
    }

    fn sessions(&self) -> Vec<Session> {
        let now = Utc::now();
        self.sessions.retain(|_, s| s.expires > now);
        let mut sessions: Vec<Session> = self.sessions.iter().map(|s| s.value().clone()).collect();
        sessions.sort_by(|a, b| a.user.cmp(&b.user));
        sessions
    }

    fn attempt(&self, source: &Hostmask, user: &str, password: &str) -> Result<Session, AuthError> {
        if let Some(active) = self.check(source) {
            debug!(host = %active.host, user = %active.user, "already logged in");
            return Err(AuthError::AlreadyLoggedIn(active.user));
        }

        let name = user.trim().to_lowercase();
        let Some(block) = self.users.get(&name) else {
            info!(user = %name, "login for unknown account");
            return Err(AuthError::NoSuchUser(name));
        };
        if !block.verify_password(password) {
            info!(user = %name, host = %session_key(source), "bad password");
            return Err(AuthError::BadLogin(name));
        }
        Ok(self.start(source, &name, &block.group))
    }

    fn logout(&self, source: &Hostmask) -> bool {
        let removed = self.sessions.remove(&session_key(source)).is_some();
        if removed {
            info!(host = %session_key(source), "session ended");
        }
        removed
    }
}

fn session_key(source: &Hostmask) -> String {
    source.host().unwrap_or(source.raw()).to_lowercase()
}
