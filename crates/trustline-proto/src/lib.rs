//! Trustline wire protocol
//!
//! Typed representation of the text frames exchanged over the chat
//! connection. Every inbound frame is a JSON object; the `type` field is the
//! discriminant for control traffic and chat messages carry no discriminant
//! at all.
//!
//! # Components
//!
//! - [`InboundEvent`]: Classified inbound frame (see [`InboundEvent::decode`])
//! - [`OutboundMessage`]: Payload sent when the local user posts a message
//! - [`Identity`]: Validated user identifier
//! - [`MetaStats`]: Stylometric fingerprint reported by the server
//!
//! Decoding never panics. Invalid JSON is a [`ProtocolError`]; valid JSON that
//! does not match any known shape classifies as [`InboundEvent::Unrecognized`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod identity;
mod inbound;
mod meta;
mod outbound;

pub use error::{ProtocolError, Result};
pub use identity::Identity;
pub use inbound::{ChatFrame, ContactsChangeReason, InboundEvent, parse_timestamp};
pub use meta::MetaStats;
pub use outbound::OutboundMessage;

/// Number of messages the server accumulates before it evaluates the trust
/// score. `SECURITY_UPDATE.count` never exceeds this.
pub const ANALYSIS_WINDOW: u8 = 5;
