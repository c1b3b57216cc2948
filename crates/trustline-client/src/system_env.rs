//! Production Environment implementation using system clocks.
//!
//! `SystemEnv` reads `std::time::Instant` for timeouts and the system wall
//! clock for message timestamps. Behavior is therefore not reproducible; tests
//! use their own environment with manually advanced time.

use chrono::{DateTime, Utc};
use trustline_core::env::Environment;

/// Production environment using system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    #[allow(clippy::disallowed_methods)]
    fn wall_clock(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
