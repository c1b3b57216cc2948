//! Outbound chat payload.

use serde::{Deserialize, Serialize};

use crate::{
    Identity,
    error::{ProtocolError, Result},
};

/// Payload the client transmits to post a message.
///
/// The sender is implied by the authenticated connection and is never part
/// of the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Addressee.
    pub receiver: Identity,
    /// Message text.
    pub content: String,
}

impl OutboundMessage {
    /// Create a payload.
    pub fn new(receiver: Identity, content: impl Into<String>) -> Self {
        Self { receiver, content: content.into() }
    }

    /// Serialize into a text frame.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }
}
