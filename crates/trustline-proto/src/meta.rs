//! Stylometric fingerprint.

use serde::{Deserialize, Serialize};

/// Upper bound of every [`MetaStats`] component.
const MAX_COMPONENT: f64 = 100.0;

/// Five normalized typing-style scores, each in `[0, 100]`.
///
/// The client never computes these; it stores whatever the server reports so
/// the current session can be displayed against the owner baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetaStats {
    /// Average message length.
    pub length: f64,
    /// Frequency of laughter tokens.
    pub giggles: f64,
    /// Frequency of elongated characters.
    pub elongation: f64,
    /// Punctuation usage.
    pub punctuation: f64,
    /// Whitespace habits.
    pub spacing: f64,
}

impl MetaStats {
    /// All-zero vector, used for `currentMeta` before the server reports one.
    pub const ZERO: Self =
        Self { length: 0.0, giggles: 0.0, elongation: 0.0, punctuation: 0.0, spacing: 0.0 };

    /// Reference behavior of the verified owner until the server provides one.
    pub const OWNER_BASELINE: Self =
        Self { length: 80.0, giggles: 60.0, elongation: 70.0, punctuation: 50.0, spacing: 40.0 };

    /// Copy with every component clamped into `[0, 100]`. NaN becomes 0.
    #[must_use]
    pub fn clamped(self) -> Self {
        let clamp = |v: f64| if v.is_nan() { 0.0 } else { v.clamp(0.0, MAX_COMPONENT) };
        Self {
            length: clamp(self.length),
            giggles: clamp(self.giggles),
            elongation: clamp(self.elongation),
            punctuation: clamp(self.punctuation),
            spacing: clamp(self.spacing),
        }
    }
}

impl Default for MetaStats {
    fn default() -> Self {
        Self::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamped_bounds_components() {
        let raw = MetaStats {
            length: -3.0,
            giggles: 250.0,
            elongation: f64::NAN,
            punctuation: 42.5,
            spacing: 100.0,
        };
        let clamped = raw.clamped();
        assert_eq!(clamped.length, 0.0);
        assert_eq!(clamped.giggles, 100.0);
        assert_eq!(clamped.elongation, 0.0);
        assert_eq!(clamped.punctuation, 42.5);
        assert_eq!(clamped.spacing, 100.0);
    }
}
