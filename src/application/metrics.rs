//! Observability metrics for throttling.
//!
//! Process-level counters summed across every work item of one registry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking throttling statistics.
///
/// All metrics use atomic operations for thread-safe updates and reads.
/// Clones share the same counters.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    /// Calls whose action ran
    calls_fired: AtomicU64,
    /// Calls whose action was skipped by a policy
    calls_suppressed: AtomicU64,
    /// Malformed calls ignored without consulting a policy
    calls_rejected: AtomicU64,
    /// Work items registered for the first time
    work_items_registered: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::default()),
        }
    }

    pub(crate) fn record_fired(&self) {
        self.inner.calls_fired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_suppressed(&self) {
        self.inner.calls_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.inner.calls_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_registration(&self) {
        self.inner
            .work_items_registered
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Get the total number of calls whose action ran.
    pub fn calls_fired(&self) -> u64 {
        self.inner.calls_fired.load(Ordering::Relaxed)
    }

    /// Get the total number of calls suppressed by a policy.
    pub fn calls_suppressed(&self) -> u64 {
        self.inner.calls_suppressed.load(Ordering::Relaxed)
    }

    /// Get the total number of malformed calls ignored.
    pub fn calls_rejected(&self) -> u64 {
        self.inner.calls_rejected.load(Ordering::Relaxed)
    }

    /// Get the total number of work items registered.
    pub fn work_items_registered(&self) -> u64 {
        self.inner.work_items_registered.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            calls_fired: self.calls_fired(),
            calls_suppressed: self.calls_suppressed(),
            calls_rejected: self.calls_rejected(),
            work_items_registered: self.work_items_registered(),
        }
    }

    /// Reset all metrics to zero.
    ///
    /// Throttle state is untouched; only the counters start over.
    pub fn reset(&self) {
        self.inner.calls_fired.store(0, Ordering::Relaxed);
        self.inner.calls_suppressed.store(0, Ordering::Relaxed);
        self.inner.calls_rejected.store(0, Ordering::Relaxed);
        self.inner.work_items_registered.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Calls whose action ran
    pub calls_fired: u64,
    /// Calls suppressed by a policy
    pub calls_suppressed: u64,
    /// Malformed calls ignored
    pub calls_rejected: u64,
    /// Work items registered
    pub work_items_registered: u64,
}

impl MetricsSnapshot {
    /// Calls that reached a policy (fired plus suppressed).
    pub fn total_calls(&self) -> u64 {
        self.calls_fired.saturating_add(self.calls_suppressed)
    }

    /// Fraction of policy-checked calls that fired (0.0 to 1.0).
    ///
    /// Returns 0.0 if no calls have been checked.
    pub fn fire_rate(&self) -> f64 {
        let total = self.total_calls();
        if total == 0 {
            0.0
        } else {
            self.calls_fired as f64 / total as f64
        }
    }
}
