//! Fuzz target for Session event sequences
//!
//! Drives a session with arbitrary interleavings of transport lifecycle,
//! frames, sends, partner switches and history completions. Checks after
//! every step:
//! - A frozen session never emits a transmit
//! - Sends leave the store untouched until the transmit is accepted

#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use chrono::{DateTime, Utc};
use libfuzzer_sys::fuzz_target;
use trustline_client::{
    ChatFrame, ConnectionConfig, Environment, Identity, Session, SessionAction, SessionEvent,
};

#[derive(Clone)]
struct FuzzEnv;

impl Environment for FuzzEnv {
    type Instant = Duration;

    fn now(&self) -> Duration {
        Duration::ZERO
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        DateTime::UNIX_EPOCH
    }
}

#[derive(Debug, Arbitrary)]
enum Op {
    Connect,
    Disconnect,
    Opened { attempt: u8 },
    Closed { attempt: u8 },
    Frame(String),
    Freeze,
    Send { partner: u8, content: String },
    Select { partner: u8 },
    History { partner: u8, generation: u8, count: u8, stamped: bool },
    Tick { secs: u8 },
}

fn partner(n: u8) -> Identity {
    let name = ["bob", "carol", "dave", "alice"][usize::from(n % 4)];
    Identity::new(name).unwrap_or_else(|_| unreachable!())
}

fn to_event(op: Op) -> SessionEvent<Duration> {
    match op {
        Op::Connect => SessionEvent::Connect,
        Op::Disconnect => SessionEvent::Disconnect,
        Op::Opened { attempt } => SessionEvent::TransportOpened { attempt: u64::from(attempt) },
        Op::Closed { attempt } => SessionEvent::TransportClosed {
            attempt: u64::from(attempt),
            reason: "fuzz".to_string(),
        },
        Op::Frame(text) => SessionEvent::FrameReceived(text),
        Op::Freeze => {
            SessionEvent::FrameReceived(r#"{"type":"SECURITY_FREEZE","score":0.1}"#.to_string())
        },
        Op::Send { partner: p, content } => {
            SessionEvent::SendMessage { partner: partner(p), content }
        },
        Op::Select { partner: p } => SessionEvent::SelectPartner { partner: partner(p) },
        Op::History { partner: p, generation, count, stamped } => SessionEvent::HistoryLoaded {
            partner: partner(p),
            generation: u64::from(generation),
            messages: (0..count % 8)
                .map(|i| ChatFrame {
                    sender: partner(p),
                    content: i.to_string(),
                    timestamp: stamped.then_some(DateTime::UNIX_EPOCH),
                    receiver: None,
                })
                .collect(),
        },
        Op::Tick { secs } => SessionEvent::Tick { now: Duration::from_secs(u64::from(secs)) },
    }
}

fuzz_target!(|ops: Vec<Op>| {
    let Ok(local) = Identity::new("alice") else {
        return;
    };
    let mut session = Session::new(FuzzEnv, local, ConnectionConfig::default());

    for op in ops {
        let is_send = matches!(op, Op::Send { .. });
        let was_frozen = session.security().is_frozen();
        let messages_before = session.store().message_count();

        let result = session.handle(to_event(op));

        match result {
            Ok(actions) => {
                if was_frozen {
                    assert!(!actions.iter().any(|a| matches!(a, SessionAction::Transmit { .. })));
                }
                if is_send {
                    assert_eq!(session.store().message_count(), messages_before);
                }
                // Accept every transmit, as a driver with room in its queue would.
                for action in actions {
                    if let SessionAction::Transmit { echo, .. } = action {
                        let accepted = session.handle(SessionEvent::TransmitAccepted { echo });
                        assert!(accepted.is_ok());
                        assert_eq!(session.store().message_count(), messages_before + 1);
                    }
                }
            },
            Err(_) if is_send => assert_eq!(session.store().message_count(), messages_before),
            Err(_) => {},
        }
    }
});
