//! Notices from the runtime to the driver.

use trustline_client::{ConnectionState, SessionError};
use trustline_proto::{ContactsChangeReason, Identity};

/// Something the user may want to see.
///
/// The driver receives the session alongside each notice and reads whatever
/// state it renders from there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Conversation with `partner` changed.
    MessagesChanged {
        /// Conversation that changed.
        partner: Identity,
    },
    /// Conversation with `partner` was replaced by fetched history. Anything
    /// shown for it before is stale.
    HistoryReplaced {
        /// Conversation that was replaced.
        partner: Identity,
    },
    /// Trust score, window or freeze flag changed.
    SecurityChanged,
    /// Connection state changed.
    ConnectionChanged(ConnectionState),
    /// Contact directory was asked to refresh.
    ContactsChanged {
        /// Notification kind.
        reason: ContactsChangeReason,
        /// Server notice, if any.
        note: Option<String>,
    },
    /// A request was refused. Session state is unchanged.
    Refused(SessionError),
}
