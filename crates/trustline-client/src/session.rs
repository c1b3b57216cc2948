//! Session state machine.
//!
//! A `Session` is everything owned by one logged-in identity: the connection,
//! the message store, the security state and gate, the active conversation
//! and its history-fetch bookkeeping. It is constructed on login and consumed
//! by [`Session::logout`]; there is no process-wide state.

use trustline_core::{
    Credential, EventRouter, GateError, Message, MessageStore, RouteOutcome, SecurityGate,
    SecurityState, Verdict, VerificationTicket, env::Environment,
};
use trustline_proto::{ChatFrame, Identity};

use crate::{
    ConnectionAction, ConnectionConfig, ConnectionManager, ConnectionState, HistorySync,
    PendingEcho, SessionAction, SessionError, SessionEvent,
};

/// Chat session for one identity.
pub struct Session<E: Environment> {
    /// Environment for time.
    env: E,

    /// Single connection owned by this session.
    connection: ConnectionManager<E::Instant>,

    /// Only writer of the store and security state for server events.
    router: EventRouter,

    /// Conversations keyed by partner.
    store: MessageStore,

    /// Trust score, analysis window and freeze flag.
    security: SecurityState,

    /// Re-authentication workflow.
    gate: SecurityGate,

    /// Conversation currently open in the UI.
    active_partner: Option<Identity>,

    /// Fetch generations per partner.
    history: HistorySync,
}

impl<E: Environment> Session<E> {
    /// Create a disconnected session for `identity` with a fully trusted
    /// security state and an empty store.
    pub fn new(env: E, identity: Identity, config: ConnectionConfig) -> Self {
        Self {
            env,
            connection: ConnectionManager::new(config),
            router: EventRouter::new(identity),
            store: MessageStore::new(),
            security: SecurityState::new(),
            gate: SecurityGate::new(),
            active_partner: None,
            history: HistorySync::new(),
        }
    }

    /// Local identity.
    pub fn identity(&self) -> &Identity {
        self.router.local()
    }

    /// Message store.
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Messages exchanged with `partner`, in arrival order.
    pub fn conversation(&self, partner: &Identity) -> &[Message] {
        self.store.conversation(partner)
    }

    /// Security state.
    pub fn security(&self) -> &SecurityState {
        &self.security
    }

    /// Rejected re-authentication attempts since the last unlock.
    pub fn failed_unlock_attempts(&self) -> u32 {
        self.gate.failed_attempts()
    }

    /// Connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Why the last connection ended, if it did.
    pub fn last_close_reason(&self) -> Option<&str> {
        self.connection.last_close_reason()
    }

    /// Conversation currently open.
    pub fn active_partner(&self) -> Option<&Identity> {
        self.active_partner.as_ref()
    }

    /// Process an event and return resulting actions.
    ///
    /// # Errors
    ///
    /// Errors are precondition failures (send refused, credential rejected,
    /// no active partner). The store, security state and connection are
    /// unchanged when one is returned; a rejected credential is only counted
    /// in [`Session::failed_unlock_attempts`].
    pub fn handle(
        &mut self,
        event: SessionEvent<E::Instant>,
    ) -> Result<Vec<SessionAction>, SessionError> {
        let before = self.connection.state();

        let mut actions = match event {
            SessionEvent::Connect => {
                let now = self.env.now();
                let identity = self.router.local().clone();
                Self::lift(self.connection.connect(&identity, now))
            },
            SessionEvent::Disconnect => Self::lift(self.connection.disconnect()),
            SessionEvent::TransportOpened { attempt } => {
                Self::lift(self.connection.on_opened(attempt))
            },
            SessionEvent::TransportClosed { attempt, reason } => {
                self.connection.on_closed(attempt, reason);
                Vec::new()
            },
            SessionEvent::TransmitAccepted { echo } => self.commit_echo(echo),
            SessionEvent::FrameReceived(text) => self.handle_frame(&text),
            SessionEvent::Tick { now } => Self::lift(self.connection.tick(now)),
            SessionEvent::SendMessage { partner, content } => self.send(partner, &content)?,
            SessionEvent::SendToActive { content } => {
                let partner = self.active_partner.clone().ok_or(SessionError::NoActivePartner)?;
                self.send(partner, &content)?
            },
            SessionEvent::SelectPartner { partner } => self.select_partner(partner),
            SessionEvent::HistoryLoaded { partner, generation, messages } => {
                self.handle_history_loaded(partner, generation, messages)
            },
            SessionEvent::HistoryFailed { partner, generation, reason } => {
                tracing::warn!(%partner, generation, %reason, "history fetch failed");
                Vec::new()
            },
            SessionEvent::BeginReauthentication { credential } => {
                self.begin_reauthentication(credential)?
            },
            SessionEvent::VerificationCompleted { ticket, outcome } => {
                self.complete_reauthentication(ticket, outcome)?
            },
        };

        let after = self.connection.state();
        if after != before {
            actions.push(SessionAction::ConnectionChanged(after));
        }
        Ok(actions)
    }

    /// End the session.
    ///
    /// Closes the transport if one is open and drops the store and security
    /// state with the session.
    pub fn logout(mut self) -> Vec<SessionAction> {
        tracing::info!(identity = %self.router.local(), "logging out");
        Self::lift(self.connection.disconnect())
    }

    fn handle_frame(&mut self, text: &str) -> Vec<SessionAction> {
        let Some(event) = self.connection.receive(text) else {
            return Vec::new();
        };

        let kind = event.kind();
        let now = self.env.wall_clock();
        match self.router.route(event, now, &mut self.store, &mut self.security) {
            RouteOutcome::Appended { partner } => vec![SessionAction::MessagesChanged { partner }],
            RouteOutcome::ContactsChanged { reason, note } => {
                vec![SessionAction::RefreshContacts { reason, note }]
            },
            RouteOutcome::SecurityUpdated | RouteOutcome::Frozen => {
                vec![SessionAction::SecurityChanged]
            },
            RouteOutcome::Dropped(reason) => {
                tracing::debug!(kind, ?reason, "frame produced no change");
                Vec::new()
            },
        }
    }

    /// The echo travels with the transmit action and is stored only when the
    /// transport reports the frame accepted. Nothing is returned on refusal.
    fn send(
        &mut self,
        partner: Identity,
        content: &str,
    ) -> Result<Vec<SessionAction>, SessionError> {
        let frame = self.connection.send(&self.security, &partner, content)?;

        let message = Message::new(self.router.local().clone(), content, self.env.wall_clock());
        let echo = PendingEcho::new(partner, message);
        Ok(vec![SessionAction::Transmit { frame, echo }])
    }

    fn commit_echo(&mut self, echo: PendingEcho) -> Vec<SessionAction> {
        let (partner, message) = echo.into_parts();
        self.store.append(partner.clone(), message);
        vec![SessionAction::MessagesChanged { partner }]
    }

    fn select_partner(&mut self, partner: Identity) -> Vec<SessionAction> {
        if self.active_partner.as_ref() == Some(&partner) {
            return Vec::new();
        }

        let generation = self.history.start(&partner);
        tracing::debug!(%partner, generation, "active conversation changed");
        self.active_partner = Some(partner.clone());
        vec![SessionAction::FetchHistory { partner, generation }]
    }

    fn handle_history_loaded(
        &mut self,
        partner: Identity,
        generation: u64,
        frames: Vec<ChatFrame>,
    ) -> Vec<SessionAction> {
        let is_active = self.active_partner.as_ref() == Some(&partner);
        if !is_active || !self.history.is_current(&partner, generation) {
            tracing::debug!(%partner, generation, is_active, "discarding superseded history");
            return Vec::new();
        }

        let now = self.env.wall_clock();
        let messages = frames
            .into_iter()
            .map(|f| Message::new(f.sender, f.content, f.timestamp.unwrap_or(now)))
            .collect();
        self.store.replace(partner.clone(), messages);
        vec![SessionAction::HistoryReplaced { partner }]
    }

    fn begin_reauthentication(
        &mut self,
        credential: Credential,
    ) -> Result<Vec<SessionAction>, SessionError> {
        let ticket = self.gate.begin(&self.security)?;
        Ok(vec![SessionAction::VerifyCredential { ticket, credential }])
    }

    fn complete_reauthentication(
        &mut self,
        ticket: VerificationTicket,
        outcome: Result<Verdict, String>,
    ) -> Result<Vec<SessionAction>, SessionError> {
        let verdict = outcome.map_err(GateError::Verifier)?;
        self.gate.complete(&mut self.security, ticket, verdict)?;
        Ok(vec![SessionAction::SecurityChanged])
    }

    fn lift(actions: Vec<ConnectionAction>) -> Vec<SessionAction> {
        actions
            .into_iter()
            .map(|action| match action {
                ConnectionAction::Open { identity, attempt } => {
                    SessionAction::OpenTransport { identity, attempt }
                },
                ConnectionAction::Close { reason } => SessionAction::CloseTransport { reason },
            })
            .collect()
    }
}
