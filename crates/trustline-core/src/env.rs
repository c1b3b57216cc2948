//! Environment abstraction for deterministic testing.
//!
//! Decouples session logic from system clocks. Production uses the real
//! monotonic and wall clocks; tests substitute fixed or manually advanced
//! time so every state transition is reproducible.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Abstract environment providing time.
///
/// # Invariants
///
/// Implementations MUST guarantee that `now()` never goes backwards.
/// `wall_clock()` carries no such guarantee; it is display metadata only and
/// never used for ordering.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Monotonic instant type.
    ///
    /// Production environments use `std::time::Instant`; tests may use any
    /// ordered type with duration subtraction.
    type Instant: Copy + Ord + Send + Sync + 'static + std::ops::Sub<Output = Duration>;

    /// Current monotonic time. Drives connection timeouts.
    fn now(&self) -> Self::Instant;

    /// Current wall-clock time. Stamped on locally created messages and on
    /// inbound messages that arrive without a usable timestamp.
    fn wall_clock(&self) -> DateTime<Utc>;
}
