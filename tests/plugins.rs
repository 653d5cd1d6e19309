//! Built-in plugins driven through the dispatcher.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::{RecordingTransport, Sent, StubLanguage};
use firefly::auth::SessionStore;
use firefly::config::{AuthConfig, UserBlock};
use firefly::dispatcher::{DispatchSettings, Dispatcher, ProtocolEvent};
use firefly::registry::Registry;

const ALICE: &str = "alice!a@home.example";
const BOB: &str = "bob!b@work.example";

fn privmsg(source: &str, target: &str, text: &str) -> ProtocolEvent {
    ProtocolEvent::Privmsg {
        source: source.into(),
        target: target.into(),
        text: text.into(),
    }
}

fn setup() -> (Dispatcher, Arc<RecordingTransport>) {
    let mut auth = AuthConfig::default();
    auth.users.insert(
        "alice".into(),
        UserBlock {
            password: "hunter2".into(),
            group: "admin".into(),
        },
    );
    auth.users.insert(
        "bob".into(),
        UserBlock {
            password: bcrypt::hash("correct horse", 4).unwrap(),
            group: "user".into(),
        },
    );
    let store = Arc::new(SessionStore::from_config(&auth));

    let mut registry = Registry::new(HashMap::new(), vec!["firefly".into()], store.clone());
    firefly::plugins::register_all(&mut registry).unwrap();

    let settings = DispatchSettings {
        command_prefix: Some(">>>".into()),
        public_errors: false,
        identity: vec!["firefly".into()],
        nick: "firefly".into(),
    };
    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = Dispatcher::new(
        registry,
        settings,
        transport.clone(),
        Arc::new(StubLanguage::silent()),
        store,
    );
    (dispatcher, transport)
}

fn notice_texts(sent: Vec<Sent>, to: &str) -> Vec<String> {
    sent.into_iter()
        .map(|s| match s {
            Sent::Notice(target, text) if target == to => text,
            other => panic!("unexpected delivery {other:?}"),
        })
        .collect()
}

#[tokio::test]
async fn login_unlocks_admin_commands() {
    let (mut d, transport) = setup();

    d.dispatch(privmsg(ALICE, "firefly", ">>> auth sessions")).await;
    assert!(transport.take().is_empty());

    d.dispatch(privmsg(ALICE, "firefly", ">>> auth login alice wrong")).await;
    assert_eq!(
        notice_texts(transport.take(), "alice"),
        vec!["Login failed; an invalid account name or password was provided."]
    );

    d.dispatch(privmsg(ALICE, "firefly", ">>> auth login alice hunter2")).await;
    assert_eq!(
        notice_texts(transport.take(), "alice"),
        vec!["You have successfully logged in as \x02alice\x02."]
    );

    d.dispatch(privmsg(ALICE, "#chan", ">>> auth sessions")).await;
    let lines = notice_texts(transport.take(), "alice");
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("alice (admin) from home.example, "), "{}", lines[0]);

    d.dispatch(privmsg(ALICE, "firefly", ">>> auth logout")).await;
    assert_eq!(
        notice_texts(transport.take(), "alice"),
        vec!["You have been logged out successfully."]
    );
    d.dispatch(privmsg(ALICE, "firefly", ">>> auth sessions")).await;
    assert!(transport.take().is_empty());
}

#[tokio::test]
async fn bcrypt_accounts_log_in_without_admin_rights() {
    let (mut d, transport) = setup();

    d.dispatch(privmsg(BOB, "firefly", r#">>> auth login bob "correct horse""#)).await;
    assert_eq!(
        notice_texts(transport.take(), "bob"),
        vec!["You have successfully logged in as \x02bob\x02."]
    );

    d.dispatch(privmsg(BOB, "#chan", ">>> auth status")).await;
    let status = notice_texts(transport.take(), "bob");
    assert!(status[0].starts_with("You are logged in as bob (group user) until "), "{}", status[0]);

    d.dispatch(privmsg(BOB, "#chan", ">>> auth sessions")).await;
    assert!(transport.take().is_empty());

    d.dispatch(privmsg(BOB, "firefly", ">>> auth login bob x")).await;
    assert_eq!(
        notice_texts(transport.take(), "bob"),
        vec!["You are already logged in to an account."]
    );
}

#[tokio::test]
async fn datetime_iso_date() {
    let (mut d, transport) = setup();
    d.dispatch(privmsg(BOB, "#chan", ">>> datetime date --iso")).await;

    let sent = transport.take();
    let [Sent::Msg(target, text)] = &sent[..] else {
        panic!("unexpected deliveries {sent:?}");
    };
    assert_eq!(target, "#chan");
    assert_eq!(text.len(), 10);
    assert_eq!(text.matches('-').count(), 2);
}
