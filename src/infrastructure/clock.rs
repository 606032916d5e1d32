//! Clock adapters for time operations.
//!
//! Throttling intervals are measured on the monotonic clock, so wall-clock
//! adjustments never unlock or extend a throttled key. Tests use `MockClock`
//! (in `crate::infrastructure::mocks`, available with the `test-helpers`
//! feature).

use crate::application::ports::Clock;
use std::time::Instant;

/// System clock implementation using `Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
