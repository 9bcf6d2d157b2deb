//! Scripted random source for testing.

use crate::application::ports::RandomSource;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Random source that replays a fixed script of draws.
///
/// Each draw pops the next scripted value and reduces it modulo the
/// requested bound. Once the script runs out, every draw returns 0, which
/// never fires a probabilistic policy with more than one side.
///
/// ```
/// use call_throttle::infrastructure::mocks::ScriptedRandom;
/// use call_throttle::RandomSource;
///
/// let random = ScriptedRandom::new([2, 0]);
/// assert_eq!(random.below(3), 2);
/// assert_eq!(random.below(3), 0);
/// assert_eq!(random.below(3), 0);
/// assert_eq!(random.draws(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    inner: Arc<Mutex<Script>>,
}

#[derive(Debug)]
struct Script {
    values: VecDeque<u64>,
    draws: usize,
}

impl ScriptedRandom {
    /// Create a source that replays `values` in order.
    pub fn new(values: impl IntoIterator<Item = u64>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Script {
                values: values.into_iter().collect(),
                draws: 0,
            })),
        }
    }

    /// Append more values to the script.
    pub fn push(&self, value: u64) {
        self.lock().values.push_back(value);
    }

    /// How many draws have been made so far.
    pub fn draws(&self) -> usize {
        self.lock().draws
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.inner
            .lock()
            .expect("ScriptedRandom mutex poisoned - a test thread panicked while holding the lock")
    }
}

impl RandomSource for ScriptedRandom {
    fn below(&self, bound: u64) -> u64 {
        let mut script = self.lock();
        script.draws += 1;
        script.values.pop_front().unwrap_or(0) % bound.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replays_then_defaults_to_zero() {
        let random = ScriptedRandom::new([5, 1]);

        assert_eq!(random.below(3), 2);
        assert_eq!(random.below(3), 1);
        assert_eq!(random.below(3), 0);

        random.push(2);
        assert_eq!(random.below(3), 2);
        assert_eq!(random.draws(), 4);
    }
}
