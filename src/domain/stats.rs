//! Per-work-item call statistics.

use std::time::Instant;

/// How often a work item was presented and how often it actually ran.
///
/// Updated under the same per-key lock as the policy, so the fields are plain
/// integers rather than atomics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStats {
    registered_at: Instant,
    calls: u64,
    fired: u64,
    last_fired: Option<Instant>,
}

impl EntryStats {
    /// Create empty statistics for an entry registered at `registered_at`.
    pub fn new(registered_at: Instant) -> Self {
        Self {
            registered_at,
            calls: 0,
            fired: 0,
            last_fired: None,
        }
    }

    /// Record one decision.
    pub fn record(&mut self, now: Instant, fired: bool) {
        self.calls += 1;
        if fired {
            self.fired += 1;
            self.last_fired = Some(now);
        }
    }

    /// When the work item was first registered.
    pub fn registered_at(&self) -> Instant {
        self.registered_at
    }

    /// Total decisions made.
    pub fn calls(&self) -> u64 {
        self.calls
    }

    /// Decisions that let the work run.
    pub fn fired(&self) -> u64 {
        self.fired
    }

    /// Decisions that skipped the work.
    pub fn suppressed(&self) -> u64 {
        self.calls - self.fired
    }

    /// When the work last ran, if ever.
    pub fn last_fired(&self) -> Option<Instant> {
        self.last_fired
    }
}
