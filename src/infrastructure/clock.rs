//! Clock adapters.
//!
//! `SystemClock` is the production clock behind every registry unless a
//! builder overrides it. Window policies compare the instants it returns, so
//! it must be monotonic; `Instant` guarantees that.
//!
//! For deterministic tests see `MockClock` in `crate::infrastructure::mocks`
//! (test builds or the `test-helpers` feature).

use crate::application::ports::Clock;
use std::time::Instant;

/// Monotonic wall clock backed by `Instant::now()`.
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
