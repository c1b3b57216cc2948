//! Inbound event routing.
//!
//! The [`EventRouter`] is the only component that applies server events to
//! the [`MessageStore`] and [`SecurityState`]. Events are applied in the
//! order they are handed in; the router never reorders, deduplicates or
//! coalesces.
//!
//! # Routing table
//!
//! | event              | effect                                         |
//! |--------------------|------------------------------------------------|
//! | `NormalMessage`    | append to the partner's conversation           |
//! | `ContactsChanged`  | none (reported to the caller)                  |
//! | `SecurityUpdate`   | set window, set score only if present          |
//! | `SecurityFreeze`   | freeze, set score, replace meta if present     |
//! | `Unrecognized`     | none                                           |

use chrono::{DateTime, Utc};
use trustline_proto::{ChatFrame, ContactsChangeReason, Identity, InboundEvent};

use crate::{Message, MessageStore, SecurityState};

/// Why an event produced no state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Chat message where neither sender nor receiver is a remote user.
    NoPartner,
    /// Frame did not match any known shape.
    Unrecognized,
}

/// Result of routing one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Message appended to the conversation with `partner`.
    Appended {
        /// Conversation the message landed in.
        partner: Identity,
    },
    /// The contact directory should refresh. Neither store changed.
    ContactsChanged {
        /// Notification kind.
        reason: ContactsChangeReason,
        /// Server notice, if any.
        note: Option<String>,
    },
    /// Analysis window (and maybe score) updated.
    SecurityUpdated,
    /// Sending suspended.
    Frozen,
    /// Nothing changed.
    Dropped(DropReason),
}

/// Applies classified events for one local identity.
#[derive(Debug, Clone)]
pub struct EventRouter {
    local: Identity,
}

impl EventRouter {
    /// Create a router for the given local user.
    pub fn new(local: Identity) -> Self {
        Self { local }
    }

    /// Local user this router routes for.
    pub fn local(&self) -> &Identity {
        &self.local
    }

    /// Apply one event.
    ///
    /// `now` stamps chat messages that arrived without a usable timestamp.
    pub fn route(
        &self,
        event: InboundEvent,
        now: DateTime<Utc>,
        store: &mut MessageStore,
        security: &mut SecurityState,
    ) -> RouteOutcome {
        match event {
            InboundEvent::NormalMessage(frame) => self.route_chat(frame, now, store),
            InboundEvent::ContactsChanged { reason, note } => {
                RouteOutcome::ContactsChanged { reason, note }
            },
            InboundEvent::SecurityUpdate { count, score } => {
                security.apply_update(count, score);
                tracing::debug!(count, score = ?score, "security window updated");
                RouteOutcome::SecurityUpdated
            },
            InboundEvent::SecurityFreeze { score, meta } => {
                security.apply_freeze(score, meta);
                tracing::info!(score, epoch = security.freeze_epoch(), "sending frozen by server");
                RouteOutcome::Frozen
            },
            InboundEvent::Unrecognized => {
                tracing::debug!("dropping unrecognized frame");
                RouteOutcome::Dropped(DropReason::Unrecognized)
            },
        }
    }

    /// Conversation partner for a chat frame: whichever of sender and
    /// receiver is not the local user.
    pub fn partner_for(&self, frame: &ChatFrame) -> Option<Identity> {
        if frame.sender != self.local {
            return Some(frame.sender.clone());
        }
        frame.receiver.as_ref().filter(|receiver| **receiver != self.local).cloned()
    }

    fn route_chat(
        &self,
        frame: ChatFrame,
        now: DateTime<Utc>,
        store: &mut MessageStore,
    ) -> RouteOutcome {
        let Some(partner) = self.partner_for(&frame) else {
            tracing::debug!("dropping chat frame without a remote partner");
            return RouteOutcome::Dropped(DropReason::NoPartner);
        };

        let timestamp = frame.timestamp.unwrap_or(now);
        store.append(partner.clone(), Message::new(frame.sender, frame.content, timestamp));
        RouteOutcome::Appended { partner }
    }
}
