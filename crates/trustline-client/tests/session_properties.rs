//! Property-based tests for the session send gate.

use std::time::Duration;

use chrono::{DateTime, Utc};
use proptest::prelude::*;
use trustline_client::{
    ConnectionConfig, Environment, Identity, SendError, Session, SessionAction, SessionError,
    SessionEvent,
};

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

fn partner_strategy() -> impl Strategy<Value = Identity> {
    prop_oneof![Just(id("bob")), Just(id("carol")), Just(id("dave"))]
}

/// Frames a server might send, excluding anything that could unfreeze.
fn frame_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,6}".prop_map(|c| format!(r#"{{"sender":"bob","content":"{c}"}}"#)),
        (0u8..=5, 0.0f64..=1.0)
            .prop_map(|(n, s)| format!(r#"{{"type":"SECURITY_UPDATE","count":{n},"score":{s}}}"#)),
        (0.0f64..=1.0).prop_map(|s| format!(r#"{{"type":"SECURITY_FREEZE","score":{s}}}"#)),
        Just(r#"{"type":"CONTACT_ADDED"}"#.to_string()),
        ".{0,16}",
    ]
}

#[derive(Debug, Clone)]
enum Step {
    Frame(String),
    Send(Identity, String),
    SendToActive(String),
    Select(Identity),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        2 => frame_strategy().prop_map(Step::Frame),
        3 => (partner_strategy(), ".{0,12}").prop_map(|(p, c)| Step::Send(p, c)),
        1 => ".{0,12}".prop_map(Step::SendToActive),
        1 => partner_strategy().prop_map(Step::Select),
    ]
}

fn to_event(step: Step) -> SessionEvent<Duration> {
    match step {
        Step::Frame(text) => SessionEvent::FrameReceived(text),
        Step::Send(partner, content) => SessionEvent::SendMessage { partner, content },
        Step::SendToActive(content) => SessionEvent::SendToActive { content },
        Step::Select(partner) => SessionEvent::SelectPartner { partner },
    }
}

proptest! {
    #[test]
    fn prop_frozen_session_never_transmits_or_echoes(
        score in 0.0f64..=1.0,
        steps in prop::collection::vec(step_strategy(), 0..50),
    ) {
        let mut session = Session::new(TestEnv, id("alice"), ConnectionConfig::default());
        session.handle(SessionEvent::Connect).expect("connect");
        session.handle(SessionEvent::TransportOpened { attempt: 1 }).expect("open");
        session
            .handle(SessionEvent::FrameReceived(format!(
                r#"{{"type":"SECURITY_FREEZE","score":{score}}}"#
            )))
            .expect("freeze");

        for step in steps {
            let is_send = matches!(step, Step::Send(..) | Step::SendToActive(_));
            let own_before: usize = session
                .store()
                .partners()
                .map(|p| session.conversation(p).iter().filter(|m| m.sender == id("alice")).count())
                .sum();

            let result = session.handle(to_event(step));

            prop_assert!(session.security().is_frozen());
            if is_send {
                prop_assert!(matches!(
                    result,
                    Err(SessionError::Send(SendError::Frozen) | SessionError::NoActivePartner)
                ));
            }
            let actions = result.unwrap_or_default();
            let transmitted = actions.iter().any(|a| matches!(a, SessionAction::Transmit { .. }));
            prop_assert!(!transmitted);

            let own_after: usize = session
                .store()
                .partners()
                .map(|p| session.conversation(p).iter().filter(|m| m.sender == id("alice")).count())
                .sum();
            prop_assert_eq!(own_before, own_after);
        }
    }

    #[test]
    fn prop_connect_is_idempotent(repeats in 1usize..10) {
        let mut session = Session::new(TestEnv, id("alice"), ConnectionConfig::default());
        let mut opens = 0;
        for _ in 0..repeats {
            let actions = session.handle(SessionEvent::Connect).expect("connect");
            opens += actions
                .iter()
                .filter(|a| matches!(a, SessionAction::OpenTransport { .. }))
                .count();
        }
        prop_assert_eq!(opens, 1);
    }
}
