//! History fetch generations.
//!
//! Every fetch is tagged with a generation number. Only the most recent
//! generation started for a partner may be applied; anything older completed
//! after the user moved on and would overwrite newer appends with stale data.

use std::collections::HashMap;

use trustline_proto::Identity;

/// Tracks the latest fetch generation per partner.
#[derive(Debug, Clone, Default)]
pub struct HistorySync {
    latest: HashMap<Identity, u64>,
    next_generation: u64,
}

impl HistorySync {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fetch for `partner`, superseding any fetch in flight for it.
    ///
    /// Generations are unique across partners and strictly increasing.
    pub fn start(&mut self, partner: &Identity) -> u64 {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.latest.insert(partner.clone(), generation);
        generation
    }

    /// Whether `generation` is the latest fetch started for `partner`.
    pub fn is_current(&self, partner: &Identity, generation: u64) -> bool {
        self.latest.get(partner) == Some(&generation)
    }
}
