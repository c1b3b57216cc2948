//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the runtime from specific I/O
//! implementations. Each frontend implements the trait to provide
//! platform-specific I/O, while the generic [`crate::Runtime`] handles all
//! orchestration.

use std::{future::Future, ops::Sub, time::Duration};

use trustline_client::{Environment, Session};
use trustline_proto::Identity;

use crate::{Input, Notice};

/// Outcome of [`Driver::transmit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Frame is queued on the open transport.
    Queued,
    /// Frame was not taken (no transport, or its queue is full).
    Dropped,
}

/// Abstracts I/O operations for the runtime.
///
/// Every method except [`Driver::next_input`] is called while the runtime
/// holds its processing turn and must not wait on I/O. Opening a transport
/// therefore only starts the attempt; the driver reports the result later as
/// [`Input::Opened`] or [`Input::Closed`].
///
/// # Implementations
///
/// - **CLI**: stdin lines for commands, WebSocket transport
/// - **Tests**: channels fed by the test body
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Time instant type. Enables virtual time in tests.
    type Instant: Copy + Ord + Send + Sync + Sub<Output = Duration>;

    /// Wait for the next input.
    ///
    /// Returns `None` when no more input will arrive. Must be cancel-safe: the
    /// runtime drops the future whenever a collaborator completes first.
    fn next_input(
        &mut self,
    ) -> impl Future<Output = Result<Option<Input<Self::Instant>>, Self::Error>> + Send;

    /// Start opening a transport for `identity`, replacing any previous one.
    ///
    /// Every [`Input::Opened`] and [`Input::Closed`] about this transport
    /// carries `attempt`.
    ///
    /// # Errors
    ///
    /// Returns an error only for unrecoverable failures. Connection failures
    /// are reported as [`Input::Closed`].
    fn open(&mut self, identity: &Identity, attempt: u64) -> Result<(), Self::Error>;

    /// Queue a text frame on the open transport without waiting.
    ///
    /// Returns [`Delivery::Queued`] only if the transport took the frame.
    ///
    /// # Errors
    ///
    /// Returns an error only for unrecoverable failures. A dead transport is
    /// reported as [`Input::Closed`].
    fn transmit(&mut self, frame: String) -> Result<Delivery, Self::Error>;

    /// Close the transport, if any.
    fn close(&mut self);

    /// Show a notice. `session` is the state after the step that caused it.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn notify<E>(&mut self, session: &Session<E>, notice: Notice) -> Result<(), Self::Error>
    where
        E: Environment<Instant = Self::Instant>;
}
