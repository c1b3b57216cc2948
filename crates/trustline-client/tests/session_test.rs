//! End-to-end session scenarios.
//!
//! Drives a [`Session`] through scripted transport frames and collaborator
//! completions, the way the runtime would, and checks the resulting state.

use std::time::Duration;

use chrono::{DateTime, Utc};
use trustline_client::{
    ChatFrame, ConnectionConfig, ConnectionState, Credential, Environment, Identity, SendError,
    Session, SessionAction, SessionError, SessionEvent, Verdict, VerificationTicket,
};
use trustline_core::GateError;

#[derive(Clone)]
struct TestEnv;

impl Environment for TestEnv {
    type Instant = Duration;

    fn now(&self) -> Duration {
        Duration::ZERO
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        DateTime::UNIX_EPOCH
    }
}

fn id(name: &str) -> Identity {
    Identity::new(name).expect("valid identity")
}

fn connected(name: &str) -> Session<TestEnv> {
    let mut session = Session::new(TestEnv, id(name), ConnectionConfig::default());
    session.handle(SessionEvent::Connect).expect("connect");
    session.handle(SessionEvent::TransportOpened { attempt: 1 }).expect("open");
    assert_eq!(session.connection_state(), ConnectionState::Open);
    session
}

fn frame(session: &mut Session<TestEnv>, text: &str) -> Vec<SessionAction> {
    session.handle(SessionEvent::FrameReceived(text.to_string())).expect("frames never error")
}

fn begin_unlock(session: &mut Session<TestEnv>, secret: &str) -> VerificationTicket {
    let actions = session
        .handle(SessionEvent::BeginReauthentication { credential: Credential::new(secret) })
        .expect("session is frozen");
    match actions.as_slice() {
        [SessionAction::VerifyCredential { ticket, credential }] => {
            assert_eq!(credential.expose(), secret);
            *ticket
        },
        other => panic!("expected verification request, got {other:?}"),
    }
}

/// Send and report the frame accepted by the transport, as the runtime does.
fn send_accepted(session: &mut Session<TestEnv>, partner: &str, content: &str) {
    let event = SessionEvent::SendMessage { partner: id(partner), content: content.to_string() };
    let actions = session.handle(event).expect("send allowed");
    let [SessionAction::Transmit { echo, .. }] = actions.as_slice() else {
        panic!("expected transmit, got {actions:?}");
    };
    session.handle(SessionEvent::TransmitAccepted { echo: echo.clone() }).expect("commit echo");
}

fn history(partner: &str, contents: &[&str]) -> Vec<ChatFrame> {
    contents
        .iter()
        .map(|c| ChatFrame {
            sender: id(partner),
            content: (*c).to_string(),
            timestamp: Some(DateTime::UNIX_EPOCH),
            receiver: None,
        })
        .collect()
}

fn fetch_generation(actions: &[SessionAction]) -> u64 {
    match actions {
        [SessionAction::FetchHistory { generation, .. }] => *generation,
        other => panic!("expected history fetch, got {other:?}"),
    }
}

#[test]
fn inbound_message_lands_in_sender_conversation() {
    let mut session = connected("alice");

    let actions = frame(&mut session, r#"{"sender":"bob","content":"hi","receiver":"alice"}"#);

    assert!(matches!(
        actions.as_slice(),
        [SessionAction::MessagesChanged { partner }] if *partner == id("bob")
    ));
    let conversation = session.conversation(&id("bob"));
    assert_eq!(conversation.len(), 1);
    assert_eq!(conversation[0].sender, id("bob"));
    assert_eq!(conversation[0].content, "hi");
}

#[test]
fn update_without_score_keeps_previous_score() {
    let mut session = connected("alice");

    frame(&mut session, r#"{"type":"SECURITY_UPDATE","count":3,"score":0.92}"#);
    frame(&mut session, r#"{"type":"SECURITY_UPDATE","count":4}"#);

    assert_eq!(session.security().message_window(), 4);
    assert_eq!(session.security().trust_score(), 0.92);
    assert!(!session.security().is_frozen());
}

#[test]
fn freeze_blocks_send_until_verified() {
    let mut session = connected("alice");

    let actions = frame(&mut session, r#"{"type":"SECURITY_FREEZE","score":0.4}"#);
    assert!(matches!(actions.as_slice(), [SessionAction::SecurityChanged]));
    assert!(session.security().is_frozen());

    // Send is refused: nothing transmitted, nothing echoed.
    let result =
        session.handle(SessionEvent::SendMessage { partner: id("bob"), content: "x".into() });
    assert_eq!(result.unwrap_err(), SessionError::Send(SendError::Frozen));
    assert!(session.conversation(&id("bob")).is_empty());

    // Wrong credential keeps the freeze.
    let ticket = begin_unlock(&mut session, "0000");
    let before = session.security().clone();
    let result = session
        .handle(SessionEvent::VerificationCompleted { ticket, outcome: Ok(Verdict::Rejected) });
    assert_eq!(result.unwrap_err(), SessionError::Gate(GateError::Rejected));
    assert_eq!(*session.security(), before);
    assert_eq!(session.failed_unlock_attempts(), 1);

    // Right credential clears it.
    let ticket = begin_unlock(&mut session, "123456");
    session
        .handle(SessionEvent::VerificationCompleted { ticket, outcome: Ok(Verdict::Verified) })
        .expect("verified");
    assert!(!session.security().is_frozen());
    assert_eq!(session.security().trust_score(), 1.0);
    assert_eq!(session.security().message_window(), 0);
    assert_eq!(session.failed_unlock_attempts(), 0);

    send_accepted(&mut session, "bob", "x");
    assert_eq!(session.conversation(&id("bob")).len(), 1);
}

#[test]
fn verification_for_older_freeze_is_superseded() {
    let mut session = connected("alice");
    frame(&mut session, r#"{"type":"SECURITY_FREEZE","score":0.4}"#);
    let stale = begin_unlock(&mut session, "123456");

    frame(&mut session, r#"{"type":"SECURITY_FREEZE","score":0.1}"#);
    let result = session.handle(SessionEvent::VerificationCompleted {
        ticket: stale,
        outcome: Ok(Verdict::Verified),
    });

    assert_eq!(result.unwrap_err(), SessionError::Gate(GateError::Superseded));
    assert!(session.security().is_frozen());
    assert_eq!(session.security().trust_score(), 0.1);
}

#[test]
fn switching_partner_discards_pending_fetch() {
    let mut session = connected("alice");

    let bob_gen = fetch_generation(
        &session.handle(SessionEvent::SelectPartner { partner: id("bob") }).expect("select"),
    );
    let carol_gen = fetch_generation(
        &session.handle(SessionEvent::SelectPartner { partner: id("carol") }).expect("select"),
    );

    // Bob's fetch completes after the switch: dropped.
    let actions = session
        .handle(SessionEvent::HistoryLoaded {
            partner: id("bob"),
            generation: bob_gen,
            messages: history("bob", &["old"]),
        })
        .expect("history");
    assert!(actions.is_empty());
    assert!(!session.store().contains(&id("bob")));
    assert!(session.conversation(&id("carol")).is_empty());

    // Carol's fetch applies to carol only.
    session
        .handle(SessionEvent::HistoryLoaded {
            partner: id("carol"),
            generation: carol_gen,
            messages: history("carol", &["c1", "c2"]),
        })
        .expect("history");
    let contents: Vec<_> =
        session.conversation(&id("carol")).iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, ["c1", "c2"]);
    assert!(!session.store().contains(&id("bob")));
}

#[test]
fn stale_fetch_for_reselected_partner_cannot_clobber_newer_appends() {
    let mut session = connected("alice");

    let first = fetch_generation(
        &session.handle(SessionEvent::SelectPartner { partner: id("bob") }).expect("select"),
    );
    session.handle(SessionEvent::SelectPartner { partner: id("carol") }).expect("select");
    let second = fetch_generation(
        &session.handle(SessionEvent::SelectPartner { partner: id("bob") }).expect("select"),
    );

    session
        .handle(SessionEvent::HistoryLoaded {
            partner: id("bob"),
            generation: second,
            messages: history("bob", &["h1"]),
        })
        .expect("history");
    frame(&mut session, r#"{"sender":"bob","content":"live"}"#);

    // The first fetch finally completes with stale data.
    session
        .handle(SessionEvent::HistoryLoaded {
            partner: id("bob"),
            generation: first,
            messages: history("bob", &["stale"]),
        })
        .expect("history");

    let contents: Vec<_> =
        session.conversation(&id("bob")).iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, ["h1", "live"]);
}

#[test]
fn malformed_frames_change_nothing() {
    let mut session = connected("alice");
    frame(&mut session, r#"{"sender":"bob","content":"hi"}"#);
    let security = session.security().clone();

    let garbage = [
        "",
        "not json",
        "[1,2]",
        r#"{"type":"SECURITY_UPDATE","count":99}"#,
        r#"{"sender":"bob"}"#,
    ];
    for text in garbage {
        assert!(frame(&mut session, text).is_empty(), "frame {text:?} produced actions");
    }

    assert_eq!(*session.security(), security);
    assert_eq!(session.conversation(&id("bob")).len(), 1);
    assert_eq!(session.store().len(), 1);
}

#[test]
fn transport_close_leaves_session_disconnected() {
    let mut session = connected("alice");

    let actions = session
        .handle(SessionEvent::TransportClosed { attempt: 1, reason: "reset by peer".into() })
        .expect("close");
    assert!(matches!(
        actions.as_slice(),
        [SessionAction::ConnectionChanged(ConnectionState::Disconnected)]
    ));
    assert_eq!(session.last_close_reason(), Some("reset by peer"));

    let result =
        session.handle(SessionEvent::SendMessage { partner: id("bob"), content: "x".into() });
    assert_eq!(result.unwrap_err(), SessionError::Send(SendError::NotConnected));

    // Reconnect is explicit.
    let actions = session.handle(SessionEvent::Connect).expect("connect");
    assert!(matches!(actions.first(), Some(SessionAction::OpenTransport { attempt: 2, .. })));
}

#[test]
fn late_reports_from_replaced_link_are_ignored() {
    let mut session = Session::new(TestEnv, id("alice"), ConnectionConfig::default());
    session.handle(SessionEvent::Connect).expect("connect");
    session.handle(SessionEvent::Disconnect).expect("disconnect");
    session.handle(SessionEvent::Connect).expect("reconnect");

    // First link finished its handshake just before it was dropped.
    let actions = session.handle(SessionEvent::TransportOpened { attempt: 1 }).expect("open");
    assert!(actions.is_empty());
    assert_eq!(session.connection_state(), ConnectionState::Connecting);

    let result =
        session.handle(SessionEvent::SendMessage { partner: id("bob"), content: "x".into() });
    assert_eq!(result.unwrap_err(), SessionError::Send(SendError::NotConnected));
    assert!(session.store().is_empty());

    // Second link opens; a late close from the first one must not tear it down.
    session.handle(SessionEvent::TransportOpened { attempt: 2 }).expect("open");
    session
        .handle(SessionEvent::TransportClosed { attempt: 1, reason: "old link reset".into() })
        .expect("close");
    assert_eq!(session.connection_state(), ConnectionState::Open);

    session
        .handle(SessionEvent::TransportClosed { attempt: 2, reason: "reset by peer".into() })
        .expect("close");
    assert_eq!(session.connection_state(), ConnectionState::Disconnected);
    assert!(session.store().is_empty());
}

#[test]
fn unaccepted_transmit_leaves_no_echo() {
    let mut session = connected("alice");

    let actions = session
        .handle(SessionEvent::SendMessage { partner: id("bob"), content: "lost".into() })
        .expect("send");
    assert!(matches!(actions.as_slice(), [SessionAction::Transmit { .. }]));

    // Transport refused the frame; the echo is dropped with the action.
    drop(actions);
    assert!(session.conversation(&id("bob")).is_empty());
    assert!(!session.store().contains(&id("bob")));
}

#[test]
fn disconnect_is_idempotent() {
    let mut session = connected("alice");

    let first = session.handle(SessionEvent::Disconnect).expect("disconnect");
    assert!(matches!(first.as_slice(), [
        SessionAction::CloseTransport { .. },
        SessionAction::ConnectionChanged(ConnectionState::Disconnected)
    ]));
    assert!(session.handle(SessionEvent::Disconnect).expect("disconnect").is_empty());
}

#[test]
fn handshake_timeout_on_tick() {
    let mut session = Session::new(TestEnv, id("alice"), ConnectionConfig::default());
    session.handle(SessionEvent::Connect).expect("connect");

    let actions = session
        .handle(SessionEvent::Tick { now: Duration::from_secs(60) })
        .expect("tick");
    assert!(matches!(actions.as_slice(), [
        SessionAction::CloseTransport { .. },
        SessionAction::ConnectionChanged(ConnectionState::Disconnected)
    ]));
}

#[test]
fn own_echo_from_server_is_not_deduplicated() {
    let mut session = connected("alice");
    send_accepted(&mut session, "bob", "hey");

    frame(&mut session, r#"{"sender":"alice","receiver":"bob","content":"hey"}"#);

    assert_eq!(session.conversation(&id("bob")).len(), 2);
}
