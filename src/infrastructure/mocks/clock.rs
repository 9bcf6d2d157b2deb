//! Mock clock for testing.

use crate::application::ports::Clock;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Manually advanced clock.
///
/// Lets tests walk a count-per-window policy across window boundaries
/// without sleeping.
///
/// # Examples
///
/// ```
/// use call_throttle::infrastructure::mocks::MockClock;
/// use call_throttle::{Policy, ThrottleRegistry, WorkItemId};
/// use std::sync::Arc;
/// use std::time::{Duration, Instant};
///
/// let clock = MockClock::new(Instant::now());
/// let registry = ThrottleRegistry::builder()
///     .with_clock(Arc::new(clock.clone()))
///     .build()
///     .unwrap();
///
/// let id = WorkItemId::named("heartbeat");
/// let policy = || Policy::count_per_window(1, Duration::from_secs(60)).unwrap();
///
/// assert!(registry.throttle(id, policy(), || {}).is_fired());
/// assert!(!registry.throttle(id, policy(), || {}).is_fired());
///
/// clock.advance(Duration::from_secs(61));
/// assert!(registry.throttle(id, policy(), || {}).is_fired());
/// ```
///
/// All clones share the same underlying time value, so advancing one clone
/// advances every clone.
#[derive(Debug, Clone)]
pub struct MockClock {
    current_time: Arc<Mutex<Instant>>,
}

impl MockClock {
    /// Create a mock clock starting at a specific instant.
    pub fn new(start: Instant) -> Self {
        Self {
            current_time: Arc::new(Mutex::new(start)),
        }
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, duration: Duration) {
        let mut time = self
            .current_time
            .lock()
            .expect("MockClock mutex poisoned - a test thread panicked while holding the lock");
        *time += duration;
    }

    /// Set the clock to a specific instant.
    pub fn set(&self, instant: Instant) {
        let mut time = self
            .current_time
            .lock()
            .expect("MockClock mutex poisoned - a test thread panicked while holding the lock");
        *time = instant;
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self
            .current_time
            .lock()
            .expect("MockClock mutex poisoned - a test thread panicked while holding the lock")
    }
}
