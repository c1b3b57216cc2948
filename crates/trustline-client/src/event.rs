//! Session events and actions.

use trustline_core::{Credential, Message, Verdict, VerificationTicket};
use trustline_proto::{ChatFrame, ContactsChangeReason, Identity};

use crate::ConnectionState;

/// Events the caller feeds into the session.
///
/// The caller is responsible for:
/// - Reporting transport lifecycle and received frames
/// - Driving time forward via ticks
/// - Forwarding user intents (send, select partner, unlock)
/// - Reporting completions of the collaborator calls the session asked for
///
/// Generic over `I` (Instant type) to support both production
/// (`std::time::Instant`) and virtual time in tests.
#[derive(Debug, Clone)]
pub enum SessionEvent<I = std::time::Instant> {
    /// Open the connection for the session identity. No-op if one exists.
    Connect,

    /// Close the connection. No-op if already disconnected.
    Disconnect,

    /// Transport finished its handshake.
    TransportOpened {
        /// Attempt from the originating [`SessionAction::OpenTransport`].
        attempt: u64,
    },

    /// Transport closed or failed.
    TransportClosed {
        /// Attempt from the originating [`SessionAction::OpenTransport`].
        attempt: u64,
        /// Human-readable cause.
        reason: String,
    },

    /// Text frame received from the server.
    FrameReceived(String),

    /// Time tick for timeout processing.
    Tick {
        /// Current time from the environment.
        now: I,
    },

    /// User wants to send a message to a specific partner.
    SendMessage {
        /// Recipient.
        partner: Identity,
        /// Message text, sent as typed.
        content: String,
    },

    /// User wants to send a message to the active partner.
    SendToActive {
        /// Message text, sent as typed.
        content: String,
    },

    /// Transport accepted the frame of a [`SessionAction::Transmit`]. Commits
    /// the local echo.
    TransmitAccepted {
        /// Echo from the originating action.
        echo: PendingEcho,
    },

    /// User opened a conversation.
    SelectPartner {
        /// Conversation to make active.
        partner: Identity,
    },

    /// History fetch requested by [`SessionAction::FetchHistory`] finished.
    HistoryLoaded {
        /// Partner the fetch was for.
        partner: Identity,
        /// Generation from the originating action.
        generation: u64,
        /// Authoritative history, oldest first. Entries without a timestamp
        /// are stamped with the local wall clock.
        messages: Vec<ChatFrame>,
    },

    /// History fetch requested by [`SessionAction::FetchHistory`] failed.
    HistoryFailed {
        /// Partner the fetch was for.
        partner: Identity,
        /// Generation from the originating action.
        generation: u64,
        /// Human-readable cause.
        reason: String,
    },

    /// User submitted a credential to unlock a frozen session.
    BeginReauthentication {
        /// PIN or password.
        credential: Credential,
    },

    /// Credential check requested by [`SessionAction::VerifyCredential`]
    /// finished.
    VerificationCompleted {
        /// Ticket from the originating action.
        ticket: VerificationTicket,
        /// Verifier verdict, or why no verdict was obtained.
        outcome: Result<Verdict, String>,
    },
}

/// Actions the session asks the caller to perform.
#[derive(Debug, Clone)]
pub enum SessionAction {
    /// Open a transport addressed by `identity`.
    OpenTransport {
        /// Local identity.
        identity: Identity,
        /// Attempt number to stamp on the open and close reports.
        attempt: u64,
    },

    /// Close the transport.
    CloseTransport {
        /// Reason for closing.
        reason: String,
    },

    /// Send a text frame to the server. If the transport accepts it, report
    /// back with [`SessionEvent::TransmitAccepted`] so the echo is stored;
    /// otherwise drop `echo`.
    Transmit {
        /// Encoded payload.
        frame: String,
        /// Local copy to store once the frame is accepted.
        echo: PendingEcho,
    },

    /// Fetch authoritative history for `partner` and report it back with
    /// [`SessionEvent::HistoryLoaded`] or [`SessionEvent::HistoryFailed`].
    FetchHistory {
        /// Conversation to fetch.
        partner: Identity,
        /// Generation to echo back.
        generation: u64,
    },

    /// Verify `credential` server-side and report back with
    /// [`SessionEvent::VerificationCompleted`].
    VerifyCredential {
        /// Ticket to echo back.
        ticket: VerificationTicket,
        /// Secret to verify.
        credential: Credential,
    },

    /// Contact directory should refresh.
    RefreshContacts {
        /// Notification kind.
        reason: ContactsChangeReason,
        /// Server notice, if any.
        note: Option<String>,
    },

    /// Conversation with `partner` was replaced by fetched history.
    HistoryReplaced {
        /// Conversation that was replaced.
        partner: Identity,
    },

    /// Conversation with `partner` changed.
    MessagesChanged {
        /// Conversation that changed.
        partner: Identity,
    },

    /// Security state changed.
    SecurityChanged,

    /// Connection state changed.
    ConnectionChanged(ConnectionState),
}

/// Local copy of an outgoing message, held until the transport accepts the
/// frame.
#[derive(Debug, Clone)]
pub struct PendingEcho {
    partner: Identity,
    message: Message,
}

impl PendingEcho {
    pub(crate) fn new(partner: Identity, message: Message) -> Self {
        Self { partner, message }
    }

    /// Conversation the message belongs to.
    pub fn partner(&self) -> &Identity {
        &self.partner
    }

    /// The message as it will be stored.
    pub fn message(&self) -> &Message {
        &self.message
    }

    pub(crate) fn into_parts(self) -> (Identity, Message) {
        (self.partner, self.message)
    }
}
