//! Dispatcher behaviour against recording collaborators.

mod common;

use common::{Harness, Sent, StubAuth, StubLanguage};
use firefly::dispatcher::{EventKind, ProtocolEvent};
use firefly::language::Addressing;

fn privmsg(source: &str, target: &str, text: &str) -> ProtocolEvent {
    ProtocolEvent::Privmsg {
        source: source.into(),
        target: target.into(),
        text: text.into(),
    }
}

const BOB: &str = "bob!~bob@example.org";

#[tokio::test]
async fn command_replies_once_in_channel() {
    let mut h = Harness::quiet();
    h.dispatcher
        .dispatch(privmsg(BOB, "#chan", ">>> plugintest ping 3"))
        .await;

    assert_eq!(
        h.transport.take(),
        vec![Sent::Msg("#chan".into(), "pong pong pong".into())]
    );
    assert!(h.language.requests().is_empty());

    let any = h.plugin.seen_by("any");
    let kinds: Vec<EventKind> = any.iter().map(|s| s.kind).collect();
    assert_eq!(kinds, vec![EventKind::Message, EventKind::ChannelMessage]);
    assert!(any.iter().all(|s| s.is_command && !s.has_reply));
    assert!(h.plugin.seen_by("strict").is_empty());
}

#[tokio::test]
async fn command_options_are_parsed() {
    let mut h = Harness::quiet();
    h.dispatcher
        .dispatch(privmsg(BOB, "#chan", r#">>> PluginTest PING 2 --message "hi there""#))
        .await;

    assert_eq!(
        h.transport.take(),
        vec![Sent::Msg("#chan".into(), "hi there hi there".into())]
    );
}

#[tokio::test]
async fn plain_channel_chatter_reaches_strict_bindings() {
    let mut h = Harness::quiet();
    h.dispatcher.dispatch(privmsg(BOB, "#chan", "nice weather")).await;

    assert!(h.transport.take().is_empty());
    let strict = h.plugin.seen_by("strict");
    assert_eq!(strict.len(), 1);
    assert!(!strict[0].is_command && !strict[0].has_reply);
    assert_eq!(
        h.language.requests(),
        vec![("nice weather".to_string(), Addressing::Public)]
    );
}

#[tokio::test]
async fn malformed_command_degrades_to_chatter() {
    let mut h = Harness::quiet();
    h.dispatcher.dispatch(privmsg(BOB, "#chan", ">>> plugintest")).await;

    assert!(h.transport.take().is_empty());
    assert_eq!(h.plugin.seen_by("strict").len(), 1);
    assert_eq!(h.language.requests().len(), 1);
}

#[tokio::test]
async fn unknown_commands_do_nothing_visible() {
    let mut h = Harness::quiet();
    h.dispatcher.dispatch(privmsg(BOB, "#chan", ">>> nosuch thing")).await;
    h.dispatcher.dispatch(privmsg(BOB, "#chan", ">>> plugintest nosuch")).await;

    assert!(h.transport.take().is_empty());
    assert!(h.plugin.seen_by("any").iter().all(|s| s.is_command));
}

#[tokio::test]
async fn private_query_gets_language_reply() {
    let mut h = Harness::new(StubLanguage::replying("hi bob"), StubAuth::default(), false);
    h.dispatcher.dispatch(privmsg(BOB, "firefly", "  hello  ")).await;

    assert_eq!(h.transport.take(), vec![Sent::Msg("bob".into(), "hi bob".into())]);
    assert_eq!(
        h.language.requests(),
        vec![("hello".to_string(), Addressing::Private)]
    );

    let specific: Vec<_> = h
        .plugin
        .seen_by("any")
        .into_iter()
        .filter(|s| s.kind == EventKind::PrivateMessage)
        .collect();
    assert_eq!(specific.len(), 1);
    assert!(specific[0].has_reply);
}

#[tokio::test]
async fn private_commands_still_consult_language() {
    let mut h = Harness::new(StubLanguage::replying("ok"), StubAuth::default(), false);
    h.dispatcher
        .dispatch(privmsg(BOB, "firefly", ">>> plugintest ping 1"))
        .await;

    assert_eq!(
        h.transport.take(),
        vec![
            Sent::Msg("bob".into(), "pong".into()),
            Sent::Msg("bob".into(), "ok".into()),
        ]
    );
}

#[tokio::test]
async fn mentions_are_classified() {
    let mut h = Harness::new(StubLanguage::replying("yes?"), StubAuth::default(), false);
    h.dispatcher.dispatch(privmsg(BOB, "#chan", "Firefly: how are you")).await;
    h.dispatcher.dispatch(privmsg(BOB, "#chan", "how are you, ff?")).await;
    h.dispatcher.dispatch(privmsg(BOB, "#chan", "the weather is nice")).await;

    assert_eq!(
        h.language.requests(),
        vec![
            ("how are you".to_string(), Addressing::Mentioned("Firefly".into())),
            ("how are you".to_string(), Addressing::Mentioned("ff".into())),
            ("the weather is nice".to_string(), Addressing::Public),
        ]
    );
    let sent = h.transport.take();
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|s| *s == Sent::Msg("#chan".into(), "yes?".into())));

    // Bindings that don't accept replies were skipped.
    assert!(h.plugin.seen_by("strict").is_empty());
}

#[tokio::test]
async fn usage_errors_go_by_notice_in_channels() {
    let mut h = Harness::quiet();
    h.dispatcher
        .dispatch(privmsg(BOB, "#chan", ">>> plugintest ping nope"))
        .await;

    let sent = h.transport.take();
    assert_eq!(sent.len(), 2, "{sent:?}");
    match &sent[..] {
        [Sent::Notice(t1, first), Sent::Notice(t2, usage)] => {
            assert_eq!(t1, "bob");
            assert_eq!(t2, "bob");
            assert!(first.starts_with("Invalid value 'nope'"), "{first}");
            assert!(usage.starts_with("(\x02"), "{usage}");
            assert!(usage.contains("<times>"), "{usage}");
            assert!(usage.ends_with("\x02) -- Reply with pong"), "{usage}");
        }
        other => panic!("unexpected delivery: {other:?}"),
    }
}

#[tokio::test]
async fn usage_errors_public_when_configured() {
    let mut h = Harness::new(StubLanguage::silent(), StubAuth::default(), true);
    h.dispatcher.dispatch(privmsg(BOB, "#chan", ">>> plugintest ping")).await;

    let sent = h.transport.take();
    assert_eq!(sent.len(), 2, "{sent:?}");
    assert!(sent.iter().all(|s| matches!(s, Sent::Msg(t, _) if t == "#chan")));
}

#[tokio::test]
async fn usage_errors_in_queries_are_private_messages() {
    let mut h = Harness::quiet();
    h.dispatcher
        .dispatch(privmsg(BOB, "firefly", ">>> plugintest ping x"))
        .await;

    let sent = h.transport.take();
    assert_eq!(sent.len(), 2, "{sent:?}");
    assert!(sent.iter().all(|s| matches!(s, Sent::Msg(t, _) if t == "bob")));
}

#[tokio::test]
async fn admin_command_needs_admin_session() {
    let mut h = Harness::quiet();
    h.dispatcher.dispatch(privmsg(BOB, "#chan", ">>> plugintest secret")).await;
    assert!(h.transport.take().is_empty());

    let mut h = Harness::new(StubLanguage::silent(), StubAuth::default().with("bob", "user"), false);
    h.dispatcher.dispatch(privmsg(BOB, "#chan", ">>> plugintest secret")).await;
    assert!(h.transport.take().is_empty());

    let mut h = Harness::new(StubLanguage::silent(), StubAuth::default().with("bob", "admin"), false);
    h.dispatcher.dispatch(privmsg(BOB, "#chan", ">>> plugintest secret")).await;
    assert_eq!(
        h.transport.take(),
        vec![Sent::Msg("#chan".into(), "classified".into())]
    );
}

#[tokio::test]
async fn admin_event_bindings_are_filtered() {
    let mut h = Harness::quiet();
    h.dispatcher.dispatch(privmsg(BOB, "#chan", "hello")).await;
    assert!(h.plugin.seen_by("admin").is_empty());

    let mut h = Harness::new(StubLanguage::silent(), StubAuth::default().with("bob", "admin"), false);
    h.dispatcher.dispatch(privmsg(BOB, "#chan", "hello")).await;
    assert_eq!(h.plugin.seen_by("admin").len(), 1);
}

#[tokio::test]
async fn failing_handler_sends_nothing_and_dispatch_continues() {
    let mut h = Harness::quiet();
    h.dispatcher.dispatch(privmsg(BOB, "#chan", ">>> plugintest fail")).await;
    assert!(h.transport.take().is_empty());

    h.dispatcher
        .dispatch(privmsg(BOB, "#chan", ">>> plugintest ping 1"))
        .await;
    assert_eq!(h.transport.take(), vec![Sent::Msg("#chan".into(), "pong".into())]);
}

#[tokio::test]
async fn notice_replies_are_discarded() {
    let mut h = Harness::new(StubLanguage::replying("never"), StubAuth::default(), false);
    h.dispatcher
        .dispatch(ProtocolEvent::Notice {
            source: BOB.into(),
            target: "#chan".into(),
            text: ">>> plugintest ping 2".into(),
        })
        .await;

    assert!(h.transport.take().is_empty());
    assert!(h.language.requests().is_empty());
    let kinds: Vec<EventKind> = h.plugin.seen_by("any").iter().map(|s| s.kind).collect();
    assert_eq!(kinds, vec![EventKind::Notice, EventKind::ChannelNotice]);
}

#[tokio::test]
async fn actions_fire_generic_then_specific() {
    let mut h = Harness::quiet();
    h.dispatcher
        .dispatch(ProtocolEvent::Action {
            source: BOB.into(),
            target: "firefly".into(),
            text: "waves".into(),
        })
        .await;

    let kinds: Vec<EventKind> = h.plugin.seen_by("any").iter().map(|s| s.kind).collect();
    assert_eq!(kinds, vec![EventKind::Action, EventKind::PrivateAction]);
}

#[tokio::test]
async fn membership_events_split_self_and_others() {
    let mut h = Harness::quiet();
    let join = |source: &str| ProtocolEvent::Join {
        source: source.into(),
        channel: "#chan".into(),
    };

    h.dispatcher
        .dispatch(ProtocolEvent::Welcome {
            server: "irc.example.net".into(),
            nick: "FireFly".into(),
            text: "Welcome".into(),
        })
        .await;
    assert_eq!(h.dispatcher.nickname(), "FireFly");

    h.dispatcher.dispatch(join("firefly!bot@host")).await;
    h.dispatcher.dispatch(join(BOB)).await;
    h.dispatcher
        .dispatch(ProtocolEvent::Nick {
            source: "firefly!bot@host".into(),
            nick: "firefly2".into(),
        })
        .await;
    h.dispatcher.dispatch(join("firefly2!bot@host")).await;
    h.dispatcher
        .dispatch(ProtocolEvent::Nick {
            source: BOB.into(),
            nick: "robert".into(),
        })
        .await;
    h.dispatcher
        .dispatch(ProtocolEvent::Kick {
            source: BOB.into(),
            channel: "#chan".into(),
            kicked: "FIREFLY2".into(),
            reason: None,
        })
        .await;

    assert_eq!(h.dispatcher.nickname(), "firefly2");
    let kinds: Vec<EventKind> = h.plugin.seen_by("any").iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::ServerWelcome,
            EventKind::SignedOn,
            EventKind::Joined,
            EventKind::UserJoined,
            EventKind::NickChanged,
            EventKind::Joined,
            EventKind::UserRenamed,
            EventKind::KickedFrom,
        ]
    );
}

#[tokio::test]
async fn new_nick_is_used_for_mentions() {
    let mut h = Harness::new(StubLanguage::replying("hm"), StubAuth::default(), false);
    h.dispatcher
        .dispatch(ProtocolEvent::Nick {
            source: "firefly!bot@host".into(),
            nick: "glowbug".into(),
        })
        .await;
    h.dispatcher.dispatch(privmsg(BOB, "#chan", "glowbug: hi")).await;

    assert_eq!(
        h.language.requests(),
        vec![("hi".to_string(), Addressing::Mentioned("glowbug".into()))]
    );
}

#[tokio::test]
async fn isupport_changes_channel_classification() {
    let mut h = Harness::quiet();
    h.dispatcher.dispatch(privmsg(BOB, "&local", "hello")).await;
    h.dispatcher
        .dispatch(ProtocolEvent::ISupport {
            tokens: vec!["CHANTYPES=#&".into(), "NETWORK=Test".into()],
        })
        .await;
    h.dispatcher.dispatch(privmsg(BOB, "&local", "hello")).await;

    assert_eq!(h.dispatcher.capabilities().network(), Some("Test"));
    let kinds: Vec<EventKind> = h
        .plugin
        .seen_by("any")
        .iter()
        .map(|s| s.kind)
        .filter(|k| matches!(k, EventKind::ChannelMessage | EventKind::PrivateMessage))
        .collect();
    assert_eq!(kinds, vec![EventKind::PrivateMessage, EventKind::ChannelMessage]);
}
