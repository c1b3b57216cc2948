//! Error types for the client.

use thiserror::Error;
use trustline_core::GateError;

/// Reasons a send was refused. Nothing was transmitted and nothing was
/// echoed into the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// Sending is suspended until re-authentication.
    #[error("sending is frozen pending re-authentication")]
    Frozen,

    /// Content is empty after trimming.
    #[error("message content is empty")]
    EmptyContent,

    /// No open connection.
    #[error("not connected")]
    NotConnected,

    /// Transport did not accept the frame (queue full or link gone).
    #[error("transport did not accept the message")]
    Dropped,

    /// Payload could not be serialized.
    #[error("encode failed: {0}")]
    Encode(String),
}

/// Errors surfaced by [`crate::Session::handle`].
///
/// All of them are precondition failures: the session state is unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Send refused.
    #[error(transparent)]
    Send(#[from] SendError),

    /// Re-authentication failed or was not applicable.
    #[error(transparent)]
    Gate(#[from] GateError),

    /// Operation needs an active conversation partner and none is selected.
    #[error("no active conversation partner")]
    NoActivePartner,
}

/// Errors from external collaborators (history fetch, credential check).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// Collaborator could not be reached or answered with a server error.
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    /// Session credential was refused by the collaborator.
    #[error("unauthorized")]
    Unauthorized,

    /// Response could not be decoded.
    #[error("decode failed: {0}")]
    Decode(String),
}

impl CollaboratorError {
    /// Returns true if the same request may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
