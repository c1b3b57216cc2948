//! Error types for the security gate.

use thiserror::Error;

/// Errors surfaced by the re-authentication workflow.
///
/// None of these change [`crate::SecurityState`]; the caller may retry
/// indefinitely.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// Re-authentication requested while sending is not suspended.
    #[error("security gate is not frozen")]
    NotFrozen,

    /// Verifier rejected the submitted credential.
    #[error("credential rejected")]
    Rejected,

    /// A newer freeze arrived while the verification was in flight.
    #[error("verification superseded by a newer freeze")]
    Superseded,

    /// Verifier could not be reached or returned garbage.
    #[error("verifier unavailable: {0}")]
    Verifier(String),
}

impl GateError {
    /// Returns true if submitting the same credential again may succeed.
    ///
    /// A rejection is final for that credential; the other failures are not
    /// a judgement on it.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Superseded | Self::Verifier(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_is_not_transient() {
        assert!(!GateError::Rejected.is_transient());
        assert!(!GateError::NotFrozen.is_transient());
        assert!(GateError::Superseded.is_transient());
        assert!(GateError::Verifier("timeout".into()).is_transient());
    }
}
