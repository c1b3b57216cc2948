//! Generic runtime for session orchestration.
//!
//! The Runtime is the single event-processing context. It waits on two
//! sources at once:
//! - [`Driver`]: user commands, transport lifecycle, frames and ticks
//! - Collaborator calls in flight (history fetch, credential verification)
//!
//! Whichever is ready is fed into the [`Session`]; the resulting actions are
//! executed before the next wait. Collaborator completions are preferred over
//! new input so a result never sits behind a burst of frames.

use std::{future::Future, pin::Pin, sync::Arc};

use futures_util::{StreamExt, stream::FuturesUnordered};
use trustline_client::{
    ConnectionConfig, CredentialVerifier, DirectoryObserver, Environment, HistoryFetcher,
    SendError, Session, SessionAction, SessionError, SessionEvent,
};
use trustline_proto::Identity;

use crate::{Command, Delivery, Driver, Input, Notice};

type Completion<I> = Pin<Box<dyn Future<Output = SessionEvent<I>> + Send>>;

/// External services the runtime calls on the session's behalf.
#[derive(Clone)]
pub struct Collaborators {
    /// Authoritative conversation history.
    pub history: Arc<dyn HistoryFetcher>,
    /// Server-side credential check.
    pub verifier: Arc<dyn CredentialVerifier>,
    /// Contact directory.
    pub directory: Arc<dyn DirectoryObserver>,
}

/// Why [`Runtime::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// User logged out.
    LoggedOut,
    /// User quit.
    Quit,
    /// Driver has no more input.
    InputClosed,
}

/// Generic runtime that orchestrates a Session, its collaborators and a
/// Driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
/// - `E`: Environment for time
pub struct Runtime<D, E>
where
    D: Driver<Instant = E::Instant>,
    E: Environment,
{
    driver: D,
    session: Session<E>,
    collaborators: Collaborators,
    pending: FuturesUnordered<Completion<E::Instant>>,
}

impl<D, E> Runtime<D, E>
where
    D: Driver<Instant = E::Instant>,
    E: Environment,
{
    /// Create a runtime with a fresh session for `identity`.
    pub fn new(
        driver: D,
        env: E,
        identity: Identity,
        config: ConnectionConfig,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            driver,
            session: Session::new(env, identity, config),
            collaborators,
            pending: FuturesUnordered::new(),
        }
    }

    /// Session driven by this runtime.
    pub fn session(&self) -> &Session<E> {
        &self.session
    }

    /// Run the event loop until logout, quit or end of input.
    ///
    /// On return the session has been logged out: the transport is closed,
    /// in-flight collaborator calls are abandoned and all session state is
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an unrecoverable I/O error.
    pub async fn run(mut self) -> Result<Exit, D::Error> {
        let exit = loop {
            let event = tokio::select! {
                biased;

                Some(event) = self.pending.next(), if !self.pending.is_empty() => event,
                input = self.driver.next_input() => match input? {
                    Some(input) => match self.translate(input) {
                        Ok(event) => event,
                        Err(exit) => break exit,
                    },
                    None => break Exit::InputClosed,
                },
            };

            self.dispatch(event)?;
        };

        tracing::info!(?exit, "runtime stopping");
        let Self { mut driver, session, .. } = self;
        for action in session.logout() {
            if let SessionAction::CloseTransport { .. } = action {
                driver.close();
            }
        }
        Ok(exit)
    }

    /// Map driver input to a session event, or to an exit.
    fn translate(&self, input: Input<E::Instant>) -> Result<SessionEvent<E::Instant>, Exit> {
        let event = match input {
            Input::Opened { attempt } => SessionEvent::TransportOpened { attempt },
            Input::Closed { attempt, reason } => SessionEvent::TransportClosed { attempt, reason },
            Input::Frame(text) => SessionEvent::FrameReceived(text),
            Input::Tick(now) => SessionEvent::Tick { now },
            Input::Command(command) => match command {
                Command::Connect => SessionEvent::Connect,
                Command::Disconnect => SessionEvent::Disconnect,
                Command::Send { partner, content } => {
                    SessionEvent::SendMessage { partner, content }
                },
                Command::SendToActive { content } => SessionEvent::SendToActive { content },
                Command::Select { partner } => SessionEvent::SelectPartner { partner },
                Command::Unlock(credential) => SessionEvent::BeginReauthentication { credential },
                Command::Logout => return Err(Exit::LoggedOut),
                Command::Quit => return Err(Exit::Quit),
            },
        };
        Ok(event)
    }

    /// Feed one event to the session and execute the resulting actions.
    ///
    /// Session errors are refusals, not failures: they are shown to the user
    /// and the loop continues.
    fn dispatch(&mut self, event: SessionEvent<E::Instant>) -> Result<(), D::Error> {
        match self.session.handle(event) {
            Ok(actions) => self.execute(actions),
            Err(e) => {
                tracing::debug!(error = %e, "request refused");
                self.driver.notify(&self.session, Notice::Refused(e))
            },
        }
    }

    fn execute(&mut self, actions: Vec<SessionAction>) -> Result<(), D::Error> {
        for action in actions {
            match action {
                SessionAction::OpenTransport { identity, attempt } => {
                    self.driver.open(&identity, attempt)?;
                },
                SessionAction::CloseTransport { reason } => {
                    tracing::debug!(%reason, "closing transport");
                    self.driver.close();
                },
                SessionAction::Transmit { frame, echo } => match self.driver.transmit(frame)? {
                    Delivery::Queued => self.dispatch(SessionEvent::TransmitAccepted { echo })?,
                    Delivery::Dropped => {
                        tracing::warn!(partner = %echo.partner(), "transport dropped message");
                        let refusal = SessionError::Send(SendError::Dropped);
                        self.driver.notify(&self.session, Notice::Refused(refusal))?;
                    },
                },
                SessionAction::FetchHistory { partner, generation } => {
                    let history = Arc::clone(&self.collaborators.history);
                    self.pending.push(Box::pin(async move {
                        match history.fetch_history(&partner).await {
                            Ok(messages) => {
                                SessionEvent::HistoryLoaded { partner, generation, messages }
                            },
                            Err(e) => SessionEvent::HistoryFailed {
                                partner,
                                generation,
                                reason: e.to_string(),
                            },
                        }
                    }));
                },
                SessionAction::VerifyCredential { ticket, credential } => {
                    let verifier = Arc::clone(&self.collaborators.verifier);
                    let identity = self.session.identity().clone();
                    self.pending.push(Box::pin(async move {
                        let outcome = verifier
                            .verify(&identity, &credential)
                            .await
                            .map_err(|e| e.to_string());
                        SessionEvent::VerificationCompleted { ticket, outcome }
                    }));
                },
                SessionAction::RefreshContacts { reason, note } => {
                    self.collaborators.directory.contacts_changed(reason, note.as_deref());
                    self.driver.notify(&self.session, Notice::ContactsChanged { reason, note })?;
                },
                SessionAction::MessagesChanged { partner } => {
                    self.driver.notify(&self.session, Notice::MessagesChanged { partner })?;
                },
                SessionAction::HistoryReplaced { partner } => {
                    self.driver.notify(&self.session, Notice::HistoryReplaced { partner })?;
                },
                SessionAction::SecurityChanged => {
                    self.driver.notify(&self.session, Notice::SecurityChanged)?;
                },
                SessionAction::ConnectionChanged(state) => {
                    self.driver.notify(&self.session, Notice::ConnectionChanged(state))?;
                },
            }
        }
        Ok(())
    }
}
