//! Plain-text rendering of session notices.

use std::{collections::HashMap, io::Write};

use trustline_app::Notice;
use trustline_client::{
    ConnectionState, Environment, GateState, Identity, Message, SecurityState, Session,
};
use trustline_proto::ANALYSIS_WINDOW;

/// Writes notices as lines, remembering how much of each conversation has
/// been shown.
#[derive(Debug, Default)]
pub struct Renderer {
    shown: HashMap<Identity, usize>,
}

impl Renderer {
    /// Render `notice` against the current session state.
    pub fn render<E, W>(
        &mut self,
        out: &mut W,
        session: &Session<E>,
        notice: &Notice,
    ) -> std::io::Result<()>
    where
        E: Environment,
        W: Write,
    {
        match notice {
            Notice::MessagesChanged { partner } => {
                self.show_new(out, partner, session.conversation(partner))?;
            },
            Notice::HistoryReplaced { partner } => {
                writeln!(out, "* history for {partner}")?;
                self.shown.remove(partner);
                self.show_new(out, partner, session.conversation(partner))?;
            },
            Notice::SecurityChanged => writeln!(out, "{}", security_line(session.security()))?,
            Notice::ConnectionChanged(state) => writeln!(out, "* {}", connection_label(*state))?,
            Notice::ContactsChanged { note, .. } => match note {
                Some(note) => writeln!(out, "* contacts changed: {note}")?,
                None => writeln!(out, "* contacts changed")?,
            },
            Notice::Refused(e) => writeln!(out, "! {e}")?,
        }
        out.flush()
    }

    /// Print the part of `conversation` not yet shown.
    fn show_new<W: Write>(
        &mut self,
        out: &mut W,
        partner: &Identity,
        conversation: &[Message],
    ) -> std::io::Result<()> {
        let shown = self.shown.entry(partner.clone()).or_insert(0);
        let start = (*shown).min(conversation.len());
        for message in &conversation[start..] {
            writeln!(out, "{}", message_line(partner, message))?;
        }
        *shown = conversation.len();
        Ok(())
    }
}

fn message_line(partner: &Identity, message: &Message) -> String {
    format!(
        "[{partner}] {} {}: {}",
        message.timestamp.format("%H:%M"),
        message.sender,
        message.content
    )
}

fn security_line(security: &SecurityState) -> String {
    let status = format!(
        "* trust {:.2} | window {}/{}",
        security.trust_score(),
        security.message_window(),
        ANALYSIS_WINDOW
    );
    match security.gate_state() {
        GateState::Frozen => {
            format!("{status} | FROZEN: sending disabled, /unlock <pin> to continue")
        },
        GateState::Trusted => status,
    }
}

fn connection_label(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Disconnected => "disconnected (/connect to retry)",
        ConnectionState::Connecting => "connecting",
        ConnectionState::Open => "connected",
    }
}
