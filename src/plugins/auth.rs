//! `auth` plugin: logging in and out, and session introspection.
//!
//! Replies always go to the caller by notice, so a login attempted in a
//! channel does not echo the outcome there.

use chrono::Utc;
use clap::Arg;
use firefly_proto::format::color::BOLD;

use crate::auth::Session;
use crate::error::{AuthError, HandlerError, RegistryError};
use crate::plugin::{Permission, Plugin, PluginHandle, PluginInit};
use crate::registry::{CommandParams, CommandSpec, Registry};
use crate::response::Route;

#[derive(Debug)]
pub struct AuthPlugin {
    handle: PluginHandle,
}

impl Plugin for AuthPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn handle(&self) -> &PluginHandle {
        &self.handle
    }
}

impl PluginInit for AuthPlugin {
    const NAME: &'static str = "auth";

    fn init(handle: PluginHandle) -> Result<Self, HandlerError> {
        Ok(Self { handle })
    }
}

fn describe(session: Option<&Session>) -> String {
    match session {
        None => "You are not logged in.".to_owned(),
        Some(s) => format!(
            "You are logged in as {} (group {}) until {}.",
            s.user,
            s.group,
            s.expires.format("%Y-%m-%d %H:%M UTC")
        ),
    }
}

fn login_reply(outcome: Result<Session, AuthError>) -> String {
    match outcome {
        Ok(session) => format!("You have successfully logged in as {BOLD}{}{BOLD}.", session.user),
        Err(AuthError::AlreadyLoggedIn(_)) => "You are already logged in to an account.".to_owned(),
        Err(AuthError::Unsupported) => "Logins are not available.".to_owned(),
        Err(AuthError::NoSuchUser(_) | AuthError::BadLogin(_)) => {
            "Login failed; an invalid account name or password was provided.".to_owned()
        }
    }
}

pub fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.bind_command::<AuthPlugin, _>("status", CommandParams::default(), |_| {
        CommandSpec::new(|ctx, queue| {
            queue.add_notice_to(describe(ctx.session), Route::User);
            Ok(())
        })
        .about("Show your authentication status")
    })?;

    registry.bind_command::<AuthPlugin, _>("login", CommandParams::default(), |plugin| {
        CommandSpec::new(move |ctx, queue| {
            let account = ctx
                .args
                .get_one::<String>("account")
                .ok_or_else(|| HandlerError::InvalidArgument("account is required".into()))?;
            let password = ctx
                .args
                .get_one::<String>("password")
                .ok_or_else(|| HandlerError::InvalidArgument("password is required".into()))?;
            let outcome = plugin
                .handle()
                .auth()
                .attempt(ctx.message.source(), account, password);
            queue.add_notice_to(login_reply(outcome), Route::User);
            Ok(())
        })
        .about("Authenticate your current host")
        .arg(Arg::new("account").required(true))
        .arg(Arg::new("password").required(true))
    })?;

    registry.bind_command::<AuthPlugin, _>("logout", CommandParams::default(), |plugin| {
        CommandSpec::new(move |ctx, queue| {
            let reply = if plugin.handle().auth().logout(ctx.message.source()) {
                "You have been logged out successfully."
            } else {
                "You are not logged in."
            };
            queue.add_notice_to(reply, Route::User);
            Ok(())
        })
        .about("End the session for your host")
    })?;

    let admin = CommandParams {
        permission: Some(Permission::Admin),
    };
    registry.bind_command::<AuthPlugin, _>("sessions", admin, |plugin| {
        CommandSpec::new(move |_ctx, queue| {
            let sessions = plugin.handle().auth().sessions();
            if sessions.is_empty() {
                queue.add_notice_to("No active sessions.", Route::User);
                return Ok(());
            }
            let now = Utc::now();
            for s in sessions {
                let left = s.expires.signed_duration_since(now).num_minutes().max(0);
                queue.add_notice_to(
                    format!("{} ({}) from {}, {left} minutes left", s.user, s.group, s.host),
                    Route::User,
                );
            }
            Ok(())
        })
        .about("List active sessions")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_session_state() {
        assert_eq!(describe(None), "You are not logged in.");
        let session = Session {
            user: "alice".into(),
            group: "admin".into(),
            host: "example.org".into(),
            expires: "2030-01-02T03:04:05Z".parse().unwrap(),
        };
        assert_eq!(
            describe(Some(&session)),
            "You are logged in as alice (group admin) until 2030-01-02 03:04 UTC."
        );
    }

    #[test]
    fn login_replies() {
        let session = Session {
            user: "alice".into(),
            group: "admin".into(),
            host: "example.org".into(),
            expires: Utc::now(),
        };
        assert_eq!(
            login_reply(Ok(session)),
            "You have successfully logged in as \x02alice\x02."
        );
        assert_eq!(
            login_reply(Err(AuthError::NoSuchUser("x".into()))),
            login_reply(Err(AuthError::BadLogin("x".into())))
        );
        assert_eq!(
            login_reply(Err(AuthError::AlreadyLoggedIn("alice".into()))),
            "You are already logged in to an account."
        );
    }
}
