//! Re-authentication workflow.
//!
//! The gate never decides whether a credential is valid. A caller obtains a
//! [`VerificationTicket`] with [`SecurityGate::begin`], hands the credential
//! to a server-side verifier, then reports the outcome with
//! [`SecurityGate::complete`]. The ticket pins the freeze epoch so a verdict
//! for an older freeze cannot clear a newer one.
//!
//! The gate does not touch the network and does not block sends itself; the
//! session checks [`crate::SecurityState::can_send`] before transmitting.

use std::fmt;

use zeroize::Zeroizing;

use crate::{GateError, SecurityState};

/// Secret submitted to unlock a frozen session (PIN or password).
///
/// Zeroed on drop and redacted from `Debug` output.
#[derive(Clone)]
pub struct Credential(Zeroizing<String>);

impl Credential {
    /// Wrap a secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    /// The secret, for handing to a verifier.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Outcome reported by the verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Credential belongs to the account owner.
    Verified,
    /// Credential is wrong.
    Rejected,
}

/// Proof that a verification was started while a given freeze was active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationTicket {
    freeze_epoch: u64,
}

impl VerificationTicket {
    /// Freeze epoch the verification belongs to.
    pub fn freeze_epoch(&self) -> u64 {
        self.freeze_epoch
    }
}

/// Freeze-clearing state machine.
#[derive(Debug, Clone, Default)]
pub struct SecurityGate {
    failed_attempts: u32,
}

impl SecurityGate {
    /// Create a gate with no recorded failures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejected attempts since the last successful unlock.
    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    /// Start a verification for the current freeze.
    ///
    /// # Errors
    ///
    /// - `GateError::NotFrozen` if sending is not suspended
    pub fn begin(&self, state: &SecurityState) -> Result<VerificationTicket, GateError> {
        if !state.is_frozen() {
            return Err(GateError::NotFrozen);
        }
        Ok(VerificationTicket { freeze_epoch: state.freeze_epoch() })
    }

    /// Apply a verifier outcome.
    ///
    /// On success the state is reset to `{is_frozen: false, trust_score: 1.0,
    /// message_window: 0}`. On any error the state is untouched.
    ///
    /// A `Verified` verdict for the current epoch when the freeze was already
    /// cleared (by a parallel attempt) succeeds without changes.
    ///
    /// # Errors
    ///
    /// - `GateError::Superseded` if a newer freeze arrived since `begin`
    /// - `GateError::Rejected` if the verifier rejected the credential
    pub fn complete(
        &mut self,
        state: &mut SecurityState,
        ticket: VerificationTicket,
        verdict: Verdict,
    ) -> Result<(), GateError> {
        if ticket.freeze_epoch != state.freeze_epoch() {
            tracing::debug!(
                ticket_epoch = ticket.freeze_epoch,
                current_epoch = state.freeze_epoch(),
                "verification superseded by newer freeze"
            );
            return Err(GateError::Superseded);
        }

        match verdict {
            Verdict::Verified => {
                if state.is_frozen() {
                    state.clear_freeze();
                    tracing::info!(
                        failed_attempts = self.failed_attempts,
                        "freeze cleared by re-authentication"
                    );
                }
                self.failed_attempts = 0;
                Ok(())
            },
            Verdict::Rejected => {
                self.failed_attempts = self.failed_attempts.saturating_add(1);
                tracing::warn!(
                    failed_attempts = self.failed_attempts,
                    "re-authentication rejected"
                );
                Err(GateError::Rejected)
            },
        }
    }
}
