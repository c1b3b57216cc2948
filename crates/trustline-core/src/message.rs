//! Chat messages.

use chrono::{DateTime, Utc};
use trustline_proto::Identity;

/// A message in a conversation.
///
/// Immutable once created. Position in the conversation is arrival order;
/// `timestamp` is display metadata and never used for ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Author.
    pub sender: Identity,
    /// Text body.
    pub content: String,
    /// Server- or client-assigned time.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a message.
    pub fn new(sender: Identity, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self { sender, content: content.into(), timestamp }
    }
}
