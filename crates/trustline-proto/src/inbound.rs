//! Inbound frame classification.
//!
//! The server mixes three kinds of traffic on one connection: chat messages
//! (no discriminant, identified by `sender` + `content`), security telemetry
//! (`SECURITY_UPDATE`, `SECURITY_FREEZE`) and directory notifications
//! (`CONTACT_ADDED`, `SYSTEM_NOTIFICATION`).
//!
//! # Invariants
//!
//! - Every JSON value classifies into exactly one [`InboundEvent`] variant.
//! - A classified `SecurityUpdate` has `count <= ANALYSIS_WINDOW` and a score
//!   in `[0, 1]`; a `SecurityFreeze` has a score in `[0, 1]`. Frames outside
//!   these ranges are `Unrecognized`, so applying an event can never break the
//!   security state bounds.
//! - Empty `sender` or `content` strings count as missing.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use crate::{
    ANALYSIS_WINDOW, Identity, MetaStats,
    error::{ProtocolError, Result},
};

/// Discriminant field name.
const TYPE_FIELD: &str = "type";

/// Format used by the server for naive UTC timestamps.
const NAIVE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Why the contact directory should be refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactsChangeReason {
    /// Another user added us as a contact (`CONTACT_ADDED`).
    ContactAdded,
    /// Generic server notice (`SYSTEM_NOTIFICATION`).
    SystemNotification,
}

/// A chat message as delivered by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatFrame {
    /// Author of the message.
    pub sender: Identity,
    /// Message text. Never empty.
    pub content: String,
    /// Server-assigned time. `None` if absent or unparsable.
    pub timestamp: Option<DateTime<Utc>>,
    /// Addressee. Usually absent on frames delivered to the receiver.
    pub receiver: Option<Identity>,
}

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// Chat message for some conversation.
    NormalMessage(ChatFrame),

    /// Contact directory changed server-side.
    ContactsChanged {
        /// Which notification triggered the refresh.
        reason: ContactsChangeReason,
        /// Human-readable notice, if the server sent one.
        note: Option<String>,
    },

    /// Analysis window progress, optionally with a fresh trust score.
    SecurityUpdate {
        /// Messages accumulated in the current analysis window.
        count: u8,
        /// New trust score. `None` means unchanged.
        score: Option<f64>,
    },

    /// Server suspended sending until re-authentication.
    SecurityFreeze {
        /// Trust score that triggered the freeze.
        score: f64,
        /// Session fingerprint at freeze time, if reported.
        meta: Option<MetaStats>,
    },

    /// Valid JSON that matches no known frame shape.
    Unrecognized,
}

impl InboundEvent {
    /// Decode and classify a raw text frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Malformed` if `text` is not valid JSON
    pub fn decode(text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
        Ok(Self::classify(&value))
    }

    /// Classify an already parsed JSON value.
    pub fn classify(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::Unrecognized;
        };

        match object.get(TYPE_FIELD) {
            None | Some(Value::Null) => classify_chat(object),
            Some(Value::String(kind)) => match kind.as_str() {
                "CONTACT_ADDED" => contacts_changed(object, ContactsChangeReason::ContactAdded),
                "SYSTEM_NOTIFICATION" => {
                    contacts_changed(object, ContactsChangeReason::SystemNotification)
                },
                "SECURITY_UPDATE" => classify_update(object),
                "SECURITY_FREEZE" => classify_freeze(object),
                _ => Self::Unrecognized,
            },
            Some(_) => Self::Unrecognized,
        }
    }

    /// Short label for logging. Never includes message content.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NormalMessage(_) => "normal_message",
            Self::ContactsChanged { .. } => "contacts_changed",
            Self::SecurityUpdate { .. } => "security_update",
            Self::SecurityFreeze { .. } => "security_freeze",
            Self::Unrecognized => "unrecognized",
        }
    }
}

/// Parse a server timestamp: RFC 3339, or naive ISO-8601 interpreted as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, NAIVE_TIMESTAMP_FORMAT).ok().map(|naive| naive.and_utc())
}

fn non_empty_str<'a>(object: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    object.get(field).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn unit_score(value: &Value) -> Option<f64> {
    value.as_f64().filter(|s| (0.0..=1.0).contains(s))
}

fn classify_chat(object: &Map<String, Value>) -> InboundEvent {
    let (Some(sender), Some(content)) =
        (non_empty_str(object, "sender"), non_empty_str(object, "content"))
    else {
        return InboundEvent::Unrecognized;
    };
    let Ok(sender) = Identity::new(sender) else {
        return InboundEvent::Unrecognized;
    };

    let receiver = non_empty_str(object, "receiver").and_then(|r| Identity::new(r).ok());
    let timestamp = non_empty_str(object, "timestamp").and_then(parse_timestamp);

    InboundEvent::NormalMessage(ChatFrame {
        sender,
        content: content.to_string(),
        timestamp,
        receiver,
    })
}

fn contacts_changed(object: &Map<String, Value>, reason: ContactsChangeReason) -> InboundEvent {
    let note = non_empty_str(object, "message").map(str::to_string);
    InboundEvent::ContactsChanged { reason, note }
}

fn classify_update(object: &Map<String, Value>) -> InboundEvent {
    let Some(count) = object
        .get("count")
        .and_then(Value::as_u64)
        .filter(|c| *c <= u64::from(ANALYSIS_WINDOW))
    else {
        return InboundEvent::Unrecognized;
    };

    let score = match object.get("score") {
        None | Some(Value::Null) => None,
        Some(raw) => match unit_score(raw) {
            Some(score) => Some(score),
            None => return InboundEvent::Unrecognized,
        },
    };

    InboundEvent::SecurityUpdate { count: count as u8, score }
}

fn classify_freeze(object: &Map<String, Value>) -> InboundEvent {
    let Some(score) = object.get("score").and_then(unit_score) else {
        return InboundEvent::Unrecognized;
    };

    // A bad fingerprint must not cost us the freeze itself.
    let meta = object
        .get("meta")
        .and_then(|raw| serde_json::from_value::<MetaStats>(raw.clone()).ok())
        .map(MetaStats::clamped);

    InboundEvent::SecurityFreeze { score, meta }
}
