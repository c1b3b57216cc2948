//! Security state.
//!
//! Tracks the server's view of whether the person typing is the account
//! owner. Every field except the freeze epoch comes from the server; nothing
//! here is computed locally.
//!
//! # State Machine
//!
//! ```text
//!               SecurityFreeze
//! ┌─────────┐ ───────────────> ┌────────┐ ──┐ SecurityFreeze
//! │ Trusted │                  │ Frozen │ <─┘ (new epoch)
//! └─────────┘ <─────────────── └────────┘
//!               verified re-authentication
//! ```
//!
//! `SecurityUpdate` events never move between states.

use trustline_proto::MetaStats;

/// Coarse gate state derived from [`SecurityState::is_frozen`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Sending allowed.
    Trusted,
    /// Sending suspended until re-authentication succeeds.
    Frozen,
}

/// Trust score, analysis window, freeze flag and stylometric vectors.
///
/// # Invariants
///
/// - `trust_score` in `[0, 1]` and `message_window <= ANALYSIS_WINDOW`,
///   guaranteed because inbound classification rejects out-of-range frames.
/// - `is_frozen` implies sending is disallowed, whatever the score.
/// - `is_frozen` becomes true only through a `SecurityFreeze` event and false
///   only through verified re-authentication, which also resets the score and
///   window.
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityState {
    trust_score: f64,
    message_window: u8,
    is_frozen: bool,
    current_meta: MetaStats,
    owner_baseline: MetaStats,
    /// Incremented on every freeze so a verification started before a newer
    /// freeze cannot clear it.
    freeze_epoch: u64,
}

impl SecurityState {
    /// Fully trusted default used at session start.
    pub fn new() -> Self {
        Self {
            trust_score: 1.0,
            message_window: 0,
            is_frozen: false,
            current_meta: MetaStats::ZERO,
            owner_baseline: MetaStats::OWNER_BASELINE,
            freeze_epoch: 0,
        }
    }

    /// Server confidence that the current typist is the owner, in `[0, 1]`.
    pub fn trust_score(&self) -> f64 {
        self.trust_score
    }

    /// Messages accumulated in the current analysis window.
    pub fn message_window(&self) -> u8 {
        self.message_window
    }

    /// Whether sending is suspended.
    pub fn is_frozen(&self) -> bool {
        self.is_frozen
    }

    /// Latest session fingerprint reported by the server.
    pub fn current_meta(&self) -> &MetaStats {
        &self.current_meta
    }

    /// Reference fingerprint of the verified owner.
    pub fn owner_baseline(&self) -> &MetaStats {
        &self.owner_baseline
    }

    /// Number of freezes received this session.
    pub fn freeze_epoch(&self) -> u64 {
        self.freeze_epoch
    }

    /// Coarse gate state.
    pub fn gate_state(&self) -> GateState {
        if self.is_frozen { GateState::Frozen } else { GateState::Trusted }
    }

    /// Whether the gate currently allows sending.
    pub fn can_send(&self) -> bool {
        !self.is_frozen
    }

    pub(crate) fn apply_update(&mut self, count: u8, score: Option<f64>) {
        self.message_window = count;
        if let Some(score) = score {
            self.trust_score = score;
        }
    }

    pub(crate) fn apply_freeze(&mut self, score: f64, meta: Option<MetaStats>) {
        self.is_frozen = true;
        self.trust_score = score;
        self.freeze_epoch += 1;
        if let Some(meta) = meta {
            self.current_meta = meta;
        }
    }

    pub(crate) fn clear_freeze(&mut self) {
        self.is_frozen = false;
        self.trust_score = 1.0;
        self.message_window = 0;
    }
}

impl Default for SecurityState {
    fn default() -> Self {
        Self::new()
    }
}
