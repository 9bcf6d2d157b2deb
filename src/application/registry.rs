//! Central registry of per-work-item throttle state.
//!
//! The registry maps each work-item identity to the policy adopted on its
//! first presentation, together with call statistics. Entries are never
//! removed.

use crate::application::ports::{Clock, Storage};
use crate::domain::{policy::Policy, stats::EntryStats, work_item::WorkItemId};
use std::sync::Arc;
use std::time::Instant;

/// State tracked for each work item.
#[derive(Debug, Clone)]
pub struct ThrottleState {
    /// Policy adopted on first registration
    pub policy: Policy,
    /// Calls and firings seen so far
    pub stats: EntryStats,
}

impl ThrottleState {
    /// Create new state with a policy.
    pub fn new(policy: Policy, registered_at: Instant) -> Self {
        Self {
            policy,
            stats: EntryStats::new(registered_at),
        }
    }
}

/// Registry managing all throttle state.
///
/// Generic over the storage implementation; in production this is
/// `Arc<ShardedStorage>`, so clones of the registry share one store.
#[derive(Clone)]
pub struct PolicyRegistry<S>
where
    S: Storage<WorkItemId, ThrottleState> + Clone,
{
    storage: S,
    clock: Arc<dyn Clock>,
}

impl<S> PolicyRegistry<S>
where
    S: Storage<WorkItemId, ThrottleState> + Clone,
{
    /// Create a new registry over a storage backend and clock.
    pub fn new(storage: S, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Access the state for a work item, registering it first if needed.
    ///
    /// `policy` is only called when the work item is unseen; concurrent first
    /// callers race inside the storage's entry lock and exactly one policy is
    /// stored. The callback receives the stored state and the current time.
    pub fn with_state<P, F, R>(&self, work_item: WorkItemId, policy: P, f: F) -> R
    where
        P: FnOnce() -> Policy,
        F: FnOnce(&mut ThrottleState, Instant) -> R,
    {
        let now = self.clock.now();
        self.storage.with_entry_mut(
            work_item,
            || ThrottleState::new(policy(), now),
            |state| f(state, now),
        )
    }

    /// Access the state for an already registered work item.
    ///
    /// Returns `None` and registers nothing if the work item is unseen.
    pub fn with_existing_state<F, R>(&self, work_item: WorkItemId, f: F) -> Option<R>
    where
        F: FnOnce(&mut ThrottleState, Instant) -> R,
    {
        let now = self.clock.now();
        self.storage
            .with_existing_mut(&work_item, |state| f(state, now))
    }

    /// Snapshot of a work item's state.
    pub fn state(&self, work_item: WorkItemId) -> Option<ThrottleState> {
        self.storage
            .with_existing_mut(&work_item, |state| state.clone())
    }

    /// Check whether a work item has been registered.
    pub fn contains(&self, work_item: WorkItemId) -> bool {
        self.storage.contains_key(&work_item)
    }

    /// Get the number of registered work items.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::policy::{PolicyKind, ThrottlePolicy};
    use crate::infrastructure::clock::SystemClock;
    use crate::infrastructure::mocks::MockClock;
    use crate::infrastructure::storage::ShardedStorage;
    use std::thread;
    use std::time::Duration;

    fn registry() -> PolicyRegistry<Arc<ShardedStorage<WorkItemId, ThrottleState>>> {
        PolicyRegistry::new(Arc::new(ShardedStorage::new()), Arc::new(SystemClock::new()))
    }

    #[test]
    fn test_registry_creation() {
        let registry = registry();

        assert_eq!(registry.len(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_first_registration_wins() {
        let registry = registry();
        let id = WorkItemId::named("job");

        registry.with_state(id, || Policy::modulo(3).unwrap(), |_, _| ());
        let kind = registry.with_state(id, || Policy::quota(1), |state, _| state.policy.kind());

        assert_eq!(kind, PolicyKind::Modulo);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_policy_factory_not_called_for_registered_item() {
        let registry = registry();
        let id = WorkItemId::named("job");

        registry.with_state(id, || Policy::quota(1), |_, _| ());
        registry.with_state(
            id,
            || panic!("factory must not run for a registered work item"),
            |_, _| (),
        );
    }

    #[test]
    fn test_with_existing_state_does_not_register() {
        let registry = registry();
        let id = WorkItemId::named("never-seen");

        assert_eq!(registry.with_existing_state(id, |_, _| ()), None);
        assert!(!registry.contains(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_state_mutations_persist() {
        let registry = registry();
        let id = WorkItemId::named("quota");
        let mut roll = |_: u64| 0u64;

        for _ in 0..4 {
            registry.with_state(id, || Policy::quota(2), |state, now| {
                let fired = state.policy.decide(now, &mut roll).is_allow();
                state.stats.record(now, fired);
            });
        }

        let state = registry.state(id).unwrap();
        match state.policy {
            Policy::Quota(quota) => assert_eq!(quota.consumed(), 2),
            other => panic!("unexpected policy {:?}", other),
        }
        assert_eq!(state.stats.calls(), 4);
        assert_eq!(state.stats.fired(), 2);
    }

    #[test]
    fn test_callback_receives_clock_time() {
        let start = Instant::now();
        let clock = MockClock::new(start);
        let registry = PolicyRegistry::new(
            Arc::new(ShardedStorage::new()),
            Arc::new(clock.clone()),
        );
        let id = WorkItemId::named("timed");

        registry.with_state(id, || Policy::quota(1), |_, now| assert_eq!(now, start));
        clock.advance(Duration::from_secs(5));
        registry.with_state(id, || Policy::quota(1), |state, now| {
            assert_eq!(now, start + Duration::from_secs(5));
            assert_eq!(state.stats.registered_at(), start);
        });
    }

    #[test]
    fn test_concurrent_access() {
        let registry = Arc::new(registry());
        let mut handles = vec![];

        for i in 0..10 {
            let registry_clone = Arc::clone(&registry);
            let handle = thread::spawn(move || {
                for j in 0..100 {
                    let id = WorkItemId::of(&(i, j));
                    registry_clone.with_state(id, || Policy::quota(1), |_, _| ());
                }
            });
            handles.push(handle);
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 1000);
    }
}
