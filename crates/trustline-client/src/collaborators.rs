//! External collaborators.
//!
//! The session never calls these itself. It emits actions; the runtime calls
//! the collaborator off the processing turn and feeds the completion back as
//! an event.

use async_trait::async_trait;
use trustline_core::{Credential, Verdict};
use trustline_proto::{ChatFrame, ContactsChangeReason, Identity};

use crate::CollaboratorError;

/// Server-side credential check used to clear a freeze.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Check that `credential` belongs to `identity`.
    ///
    /// A wrong credential is `Ok(Verdict::Rejected)`, not an error.
    async fn verify(
        &self,
        identity: &Identity,
        credential: &Credential,
    ) -> Result<Verdict, CollaboratorError>;
}

/// Source of authoritative conversation history.
#[async_trait]
pub trait HistoryFetcher: Send + Sync {
    /// Full history with `partner`, oldest first. Entries without a
    /// timestamp are stamped by the session.
    async fn fetch_history(
        &self,
        partner: &Identity,
    ) -> Result<Vec<ChatFrame>, CollaboratorError>;
}

/// Contact directory that wants to hear about server-side changes.
pub trait DirectoryObserver: Send + Sync {
    /// The directory is stale and should be reloaded.
    fn contacts_changed(&self, reason: ContactsChangeReason, note: Option<&str>);
}
