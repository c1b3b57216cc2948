//! Connection lifecycle state machine.
//!
//! Owns at most one connection for the active identity. Uses the action
//! pattern: methods take time as input and return actions for the driver to
//! execute. Establishment is asynchronous, so `connect` only asks the driver
//! to open a transport; the driver reports back with `on_opened` or
//! `on_closed`.
//!
//! # State Machine
//!
//! ```text
//! ┌──────────────┐  connect   ┌────────────┐  on_opened  ┌──────┐
//! │ Disconnected │───────────>│ Connecting │────────────>│ Open │
//! └──────────────┘            └────────────┘             └──────┘
//!        ^                          │                        │
//!        │   timeout / on_closed /  │                        │
//!        └──────── disconnect ──────┴────────────────────────┘
//! ```
//!
//! There is no automatic reconnection: after a close the manager stays
//! `Disconnected` until `connect` is called again.
//!
//! Every `connect` starts a new attempt. Transport reports carry the attempt
//! they belong to; reports for any other attempt are ignored, so a late
//! report from a link that was already replaced cannot move the state.

use std::{ops::Sub, time::Duration};

use trustline_core::SecurityState;
use trustline_proto::{Identity, InboundEvent, OutboundMessage};

use crate::error::SendError;

/// Time allowed for the transport to report the connection as open.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Actions returned by the connection state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Open a transport for this identity. The credential is attached by the
    /// transport during its handshake.
    Open {
        /// Identity the channel is addressed by.
        identity: Identity,
        /// Attempt number to stamp on every report about this transport.
        attempt: u64,
    },

    /// Close the transport.
    Close {
        /// Reason for closing.
        reason: String,
    },
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport.
    Disconnected,
    /// Transport requested, not yet open.
    Connecting,
    /// Transport open; frames flow both ways.
    Open,
}

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Timeout for the transport to open.
    pub handshake_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self { handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT }
    }
}

/// Connection state machine.
///
/// Pure state machine: no I/O, time passed in. Generic over `I` so tests can
/// drive virtual time.
#[derive(Debug, Clone)]
pub struct ConnectionManager<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    state: ConnectionState,
    config: ConnectionConfig,
    /// When the pending open was requested. `None` unless connecting.
    connecting_since: Option<I>,
    /// Attempt number of the most recent `connect`. Zero before the first.
    attempt: u64,
    /// Why the last connection ended. `None` before the first close.
    last_close_reason: Option<String>,
}

impl<I> ConnectionManager<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Create a disconnected manager.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            config,
            connecting_since: None,
            attempt: 0,
            last_close_reason: None,
        }
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether frames can be transmitted right now.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Attempt number of the most recent `connect`.
    #[must_use]
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// Why the last connection ended. `None` if it never did.
    #[must_use]
    pub fn last_close_reason(&self) -> Option<&str> {
        self.last_close_reason.as_deref()
    }

    /// Request a connection for `identity`.
    ///
    /// Idempotent: returns no actions if a connection is already open or
    /// being opened.
    pub fn connect(&mut self, identity: &Identity, now: I) -> Vec<ConnectionAction> {
        if self.state != ConnectionState::Disconnected {
            tracing::debug!(state = ?self.state, "connect ignored, connection already exists");
            return Vec::new();
        }

        self.attempt += 1;
        self.state = ConnectionState::Connecting;
        self.connecting_since = Some(now);
        tracing::info!(%identity, attempt = self.attempt, "connecting");
        vec![ConnectionAction::Open { identity: identity.clone(), attempt: self.attempt }]
    }

    /// Transport for `attempt` reports the connection as open.
    ///
    /// Reports for an earlier attempt are ignored. An open report for the
    /// current attempt that arrives after `disconnect` (or a timeout) is for
    /// a transport nobody wants any more; it is closed again.
    pub fn on_opened(&mut self, attempt: u64) -> Vec<ConnectionAction> {
        if attempt != self.attempt {
            tracing::debug!(
                attempt,
                current = self.attempt,
                "ignoring open report for old attempt"
            );
            return Vec::new();
        }

        match self.state {
            ConnectionState::Connecting => {
                self.state = ConnectionState::Open;
                self.connecting_since = None;
                tracing::info!("connection open");
                Vec::new()
            },
            ConnectionState::Open => {
                tracing::debug!("duplicate open report ignored");
                Vec::new()
            },
            ConnectionState::Disconnected => {
                tracing::debug!("open report after disconnect, closing");
                vec![ConnectionAction::Close { reason: "stale transport".to_string() }]
            },
        }
    }

    /// Transport for `attempt` closed or failed. No retry is scheduled.
    ///
    /// Reports for an earlier attempt are ignored.
    pub fn on_closed(&mut self, attempt: u64, reason: impl Into<String>) {
        let reason = reason.into();
        if attempt != self.attempt {
            tracing::debug!(
                attempt,
                current = self.attempt,
                %reason,
                "ignoring close of old attempt"
            );
            return;
        }
        self.mark_closed(reason);
    }

    fn mark_closed(&mut self, reason: String) {
        if self.state != ConnectionState::Disconnected {
            tracing::warn!(%reason, "connection closed");
        }
        self.state = ConnectionState::Disconnected;
        self.connecting_since = None;
        self.last_close_reason = Some(reason);
    }

    /// Close the connection and clear the handle so a later `connect`
    /// succeeds.
    ///
    /// Idempotent: returns no actions when already disconnected.
    pub fn disconnect(&mut self) -> Vec<ConnectionAction> {
        if self.state == ConnectionState::Disconnected {
            return Vec::new();
        }

        let reason = "disconnect requested".to_string();
        self.mark_closed(reason.clone());
        vec![ConnectionAction::Close { reason }]
    }

    /// Elapsed time since the open was requested, if the handshake timeout
    /// is exceeded. `None` otherwise.
    #[must_use]
    pub fn check_timeout(&self, now: I) -> Option<Duration> {
        let since = self.connecting_since?;
        let elapsed = now - since;
        if elapsed > self.config.handshake_timeout { Some(elapsed) } else { None }
    }

    /// Process periodic maintenance (handshake timeout).
    pub fn tick(&mut self, now: I) -> Vec<ConnectionAction> {
        let Some(elapsed) = self.check_timeout(now) else {
            return Vec::new();
        };

        let reason = format!("handshake timeout after {elapsed:?}");
        self.mark_closed(reason.clone());
        vec![ConnectionAction::Close { reason }]
    }

    /// Parse and classify a received text frame.
    ///
    /// Malformed frames, and frames that arrive while the connection is not
    /// open, are dropped with no state change.
    pub fn receive(&mut self, text: &str) -> Option<InboundEvent> {
        if self.state != ConnectionState::Open {
            tracing::debug!(state = ?self.state, "dropping frame received while not open");
            return None;
        }

        match InboundEvent::decode(text) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::debug!(error = %e, len = text.len(), "dropping malformed frame");
                None
            },
        }
    }

    /// Encode the text frame for a message.
    ///
    /// Nothing is sent here: the caller hands the frame to the transport.
    ///
    /// # Errors
    ///
    /// - `SendError::Frozen` if the security gate is frozen (checked first)
    /// - `SendError::EmptyContent` if `content` is blank
    /// - `SendError::NotConnected` if the connection is not open
    pub fn send(
        &self,
        security: &SecurityState,
        partner: &Identity,
        content: &str,
    ) -> Result<String, SendError> {
        if !security.can_send() {
            return Err(SendError::Frozen);
        }
        if content.trim().is_empty() {
            return Err(SendError::EmptyContent);
        }
        if self.state != ConnectionState::Open {
            return Err(SendError::NotConnected);
        }

        OutboundMessage::new(partner.clone(), content)
            .encode()
            .map_err(|e| SendError::Encode(e.to_string()))
    }
}
