//! Client
//!
//! Action-based session state machine for one logged-in identity. Owns the
//! connection, the message store and the security state, and is the only
//! place where inbound frames, user intents and collaborator completions meet.
//!
//! # Architecture
//!
//! The client follows the Sans-IO pattern of [`trustline_core`]. It receives
//! events ([`SessionEvent`]), processes them through pure state machine
//! logic, and returns actions ([`SessionAction`]) for the caller to execute.
//! Asynchronous work (history fetch, credential verification) leaves the
//! session as an action and comes back as an event, so the session never
//! holds its turn across I/O.
//!
//! # Components
//!
//! - [`Session`]: Everything owned by one logged-in identity
//! - [`ConnectionManager`]: Single connection lifecycle and send gating
//! - [`SessionEvent`]: Events fed into the session
//! - [`SessionAction`]: Actions produced by the session
//! - [`CredentialVerifier`], [`HistoryFetcher`], [`DirectoryObserver`]:
//!   external collaborators the runtime calls on the session's behalf
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::connect`]: WebSocket connection authenticated by cookie
//! - [`rest::RestCollaborators`]: HTTP history fetch and credential check

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod collaborators;
mod connection;
mod error;
mod event;
mod history;
mod session;
mod system_env;

#[cfg(feature = "transport")]
pub mod rest;
#[cfg(feature = "transport")]
pub mod transport;

pub use collaborators::{CredentialVerifier, DirectoryObserver, HistoryFetcher};
pub use connection::{
    ConnectionAction, ConnectionConfig, ConnectionManager, ConnectionState,
    DEFAULT_HANDSHAKE_TIMEOUT,
};
pub use error::{CollaboratorError, SendError, SessionError};
pub use event::{PendingEcho, SessionAction, SessionEvent};
pub use history::HistorySync;
pub use session::Session;
pub use system_env::SystemEnv;
pub use trustline_core::{
    Credential, GateState, Identity, Message, MessageStore, SecurityState, Verdict,
    VerificationTicket, env::Environment,
};
pub use trustline_proto::{ChatFrame, ContactsChangeReason};
