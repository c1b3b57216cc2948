//! Trustline core
//!
//! Pure data structures and state machines for the client side of a chat
//! session guarded by a server-side trust monitor. Nothing in this crate
//! performs I/O; callers feed it decoded events and read back state.
//!
//! # Components
//!
//! - [`MessageStore`]: Ordered, append-only message log per conversation
//! - [`SecurityState`]: Trust score, analysis window and freeze flag
//! - [`SecurityGate`]: Re-authentication workflow that clears a freeze
//! - [`EventRouter`]: Single writer applying inbound events to both stores
//! - [`Environment`]: Clock abstraction for deterministic tests
//!
//! # Write discipline
//!
//! [`MessageStore::append`] and [`MessageStore::replace`] are public because
//! the session layer owns optimistic echo and history sync. [`SecurityState`]
//! exposes no public mutators: only the router (server events) and the gate
//! (verified re-authentication) can change it.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;
mod error;
mod gate;
mod message;
mod router;
mod security;
mod store;

pub use error::GateError;
pub use gate::{Credential, SecurityGate, Verdict, VerificationTicket};
pub use message::Message;
pub use router::{DropReason, EventRouter, RouteOutcome};
pub use security::{GateState, SecurityState};
pub use store::MessageStore;
pub use trustline_proto::{Identity, MetaStats};
