//! Fuzz target for InboundEvent::decode
//!
//! Feeds arbitrary text through frame classification and routing:
//! - Malformed JSON
//! - Type confusion (wrong field types for a discriminant)
//! - Out-of-range scores and counts
//!
//! The fuzzer should NEVER panic, and a classified event must never push the
//! security state outside its bounds.

#![no_main]

use chrono::DateTime;
use libfuzzer_sys::fuzz_target;
use trustline_core::{EventRouter, Identity, MessageStore, SecurityState};
use trustline_proto::{ANALYSIS_WINDOW, InboundEvent};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(event) = InboundEvent::decode(text) else {
        return;
    };

    let Ok(local) = Identity::new("alice") else {
        return;
    };
    let router = EventRouter::new(local);
    let mut store = MessageStore::new();
    let mut security = SecurityState::new();
    router.route(event, DateTime::UNIX_EPOCH, &mut store, &mut security);

    assert!((0.0..=1.0).contains(&security.trust_score()));
    assert!(security.message_window() <= ANALYSIS_WINDOW);
});
