//! Throttling coordination logic.
//!
//! The throttler resolves the policy for a work item, asks it for a decision
//! and runs the work when the policy allows it. Malformed calls are logged
//! and ignored so that throttling never disturbs the caller's path.

use crate::application::metrics::Metrics;
use crate::application::ports::{RandomSource, Storage};
use crate::application::registry::{PolicyRegistry, ThrottleState};
use crate::domain::{
    policy::{Policy, PolicyDecision, ThrottlePolicy},
    work_item::WorkItemId,
};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Why a call was ignored without consulting a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Misuse {
    /// No action was supplied
    MissingAction,
    /// No policy was supplied for a work item that has none yet
    MissingPolicy,
}

impl Misuse {
    /// Stable name used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Misuse::MissingAction => "missing_action",
            Misuse::MissingPolicy => "missing_policy",
        }
    }
}

impl fmt::Display for Misuse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one throttled call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitOutcome {
    /// The policy allowed the call and the action ran
    Fired,
    /// The policy suppressed the call
    Suppressed,
    /// The call was malformed and ignored
    Rejected(Misuse),
}

impl LimitOutcome {
    /// Check if the action ran.
    pub fn is_fired(&self) -> bool {
        matches!(self, LimitOutcome::Fired)
    }

    /// Check if a policy suppressed the action.
    pub fn is_suppressed(&self) -> bool {
        matches!(self, LimitOutcome::Suppressed)
    }

    /// Check if the call was ignored as malformed.
    pub fn is_rejected(&self) -> bool {
        matches!(self, LimitOutcome::Rejected(_))
    }
}

/// Coordinates throttling decisions.
#[derive(Clone)]
pub struct Throttler<S>
where
    S: Storage<WorkItemId, ThrottleState> + Clone,
{
    registry: PolicyRegistry<S>,
    random: Arc<dyn RandomSource>,
    metrics: Metrics,
}

impl<S> Throttler<S>
where
    S: Storage<WorkItemId, ThrottleState> + Clone,
{
    /// Create a new throttler.
    ///
    /// # Arguments
    /// * `registry` - The policy registry (which contains the clock)
    /// * `random` - Source of draws for probabilistic policies
    /// * `metrics` - Metrics tracker
    pub fn new(
        registry: PolicyRegistry<S>,
        random: Arc<dyn RandomSource>,
        metrics: Metrics,
    ) -> Self {
        Self {
            registry,
            random,
            metrics,
        }
    }

    /// Run `action` if the policy governing `work_item` allows it.
    ///
    /// The first call for a work item adopts `policy` permanently; later
    /// calls reuse the stored policy and drop whatever policy they pass. An
    /// absent action, or an absent policy for an unseen work item, is logged
    /// at WARN and ignored.
    ///
    /// The decision and counter updates happen under the work item's lock.
    /// The action runs after that lock is released, so it may call back into
    /// the throttler, even for the same work item.
    pub fn limit<F>(
        &self,
        work_item: WorkItemId,
        action: Option<F>,
        policy: Option<Policy>,
    ) -> LimitOutcome
    where
        F: FnOnce(),
    {
        let Some(action) = action else {
            return self.reject(work_item, Misuse::MissingAction);
        };

        let decision = match policy {
            Some(policy) => self.decide_or_register(work_item, policy),
            None => match self
                .registry
                .with_existing_state(work_item, |state, now| self.decide(state, now))
            {
                Some(decision) => decision,
                None => return self.reject(work_item, Misuse::MissingPolicy),
            },
        };

        tracing::trace!(work_item = %work_item, fired = decision.is_allow(), "throttle decision");

        match decision {
            PolicyDecision::Allow => {
                self.metrics.record_fired();
                action();
                LimitOutcome::Fired
            }
            PolicyDecision::Suppress => {
                self.metrics.record_suppressed();
                LimitOutcome::Suppressed
            }
        }
    }

    fn decide_or_register(&self, work_item: WorkItemId, policy: Policy) -> PolicyDecision {
        let kind = policy.kind();
        let mut registered = false;

        let decision = self.registry.with_state(
            work_item,
            || {
                registered = true;
                policy
            },
            |state, now| self.decide(state, now),
        );

        if registered {
            self.metrics.record_registration();
            tracing::debug!(work_item = %work_item, policy = %kind, "registered throttle policy");
        } else {
            tracing::trace!(
                work_item = %work_item,
                offered = %kind,
                "work item already registered, keeping its stored policy"
            );
        }

        decision
    }

    fn decide(&self, state: &mut ThrottleState, now: Instant) -> PolicyDecision {
        let random = &self.random;
        let decision = state
            .policy
            .decide(now, &mut |bound: u64| random.below(bound));
        state.stats.record(now, decision.is_allow());
        decision
    }

    fn reject(&self, work_item: WorkItemId, misuse: Misuse) -> LimitOutcome {
        match misuse {
            Misuse::MissingAction => tracing::warn!(
                work_item = %work_item,
                reason = misuse.as_str(),
                "no action given, ignoring throttle call"
            ),
            Misuse::MissingPolicy => tracing::warn!(
                work_item = %work_item,
                reason = misuse.as_str(),
                "no policy given for unregistered work item, ignoring throttle call"
            ),
        }
        self.metrics.record_rejected();
        LimitOutcome::Rejected(misuse)
    }

    /// Get a reference to the registry.
    pub fn registry(&self) -> &PolicyRegistry<S> {
        &self.registry
    }

    /// Get a reference to the metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::Clock;
    use crate::infrastructure::clock::SystemClock;
    use crate::infrastructure::mocks::{MockCaptureLayer, MockClock, ScriptedRandom};
    use crate::infrastructure::random::ThreadRandom;
    use crate::infrastructure::storage::ShardedStorage;
    use std::cell::Cell;
    use std::time::Duration;
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;

    type TestThrottler = Throttler<Arc<ShardedStorage<WorkItemId, ThrottleState>>>;

    fn throttler_with(clock: Arc<dyn Clock>, random: Arc<dyn RandomSource>) -> TestThrottler {
        let registry = PolicyRegistry::new(Arc::new(ShardedStorage::new()), clock);
        Throttler::new(registry, random, Metrics::new())
    }

    fn throttler() -> TestThrottler {
        throttler_with(Arc::new(SystemClock::new()), Arc::new(ThreadRandom::new()))
    }

    /// Call `limit` `calls` times and return which calls (1-based) fired.
    fn fire_pattern(
        throttler: &TestThrottler,
        id: WorkItemId,
        policy: &Policy,
        calls: usize,
    ) -> Vec<usize> {
        let fired = Cell::new(Vec::new());
        for call in 1..=calls {
            throttler.limit(
                id,
                Some(|| {
                    let mut seen = fired.take();
                    seen.push(call);
                    fired.set(seen);
                }),
                Some(policy.clone()),
            );
        }
        fired.take()
    }

    #[test]
    fn test_modulo_fires_on_first_and_every_third() {
        let throttler = throttler();
        let policy = Policy::modulo(3).unwrap();

        let fired = fire_pattern(&throttler, WorkItemId::named("modulo"), &policy, 7);
        assert_eq!(fired, vec![1, 4, 7]);
    }

    #[test]
    fn test_count_per_window_with_mock_clock() {
        let clock = MockClock::new(Instant::now());
        let throttler = throttler_with(Arc::new(clock.clone()), Arc::new(ThreadRandom::new()));
        let id = WorkItemId::named("window");
        let policy = Policy::count_per_window(5, Duration::from_secs(1)).unwrap();

        assert_eq!(fire_pattern(&throttler, id, &policy, 10).len(), 5);

        clock.advance(Duration::from_secs(2));
        assert_eq!(fire_pattern(&throttler, id, &policy, 10).len(), 5);
    }

    #[test]
    fn test_quota_never_recovers() {
        let clock = MockClock::new(Instant::now());
        let throttler = throttler_with(Arc::new(clock.clone()), Arc::new(ThreadRandom::new()));
        let id = WorkItemId::named("quota");
        let policy = Policy::quota(3);

        assert_eq!(fire_pattern(&throttler, id, &policy, 6), vec![1, 2, 3]);

        clock.advance(Duration::from_secs(60 * 60 * 24 * 365));
        assert!(fire_pattern(&throttler, id, &policy, 10).is_empty());
    }

    #[test]
    fn test_probabilistic_uses_random_source() {
        let random = ScriptedRandom::new([0, 2, 1, 2]);
        let throttler = throttler_with(Arc::new(SystemClock::new()), Arc::new(random.clone()));
        let policy = Policy::probabilistic(3).unwrap();

        let fired = fire_pattern(&throttler, WorkItemId::named("dice"), &policy, 4);

        assert_eq!(fired, vec![2, 4]);
        assert_eq!(random.draws(), 4);
    }

    #[test]
    fn test_first_registration_wins() {
        let throttler = throttler();
        let id = WorkItemId::named("first-wins");

        // Registered as quota(1): fires once
        assert_eq!(
            throttler.limit(id, Some(|| {}), Some(Policy::quota(1))),
            LimitOutcome::Fired
        );

        // A modulo(1) policy would always fire, but it is ignored
        let fired = fire_pattern(&throttler, id, &Policy::modulo(1).unwrap(), 5);
        assert!(fired.is_empty());

        let state = throttler.registry().state(id).unwrap();
        assert_eq!(state.policy, {
            let mut expected = Policy::quota(1);
            expected.decide(Instant::now(), &mut |_: u64| 0u64);
            expected
        });
        assert_eq!(throttler.metrics().work_items_registered(), 1);
    }

    #[test]
    fn test_registered_item_runs_without_policy() {
        let throttler = throttler();
        let id = WorkItemId::named("reuse");

        throttler.limit(id, Some(|| {}), Some(Policy::modulo(2).unwrap()));

        let outcomes: Vec<LimitOutcome> = (0..3)
            .map(|_| throttler.limit(id, Some(|| {}), None))
            .collect();

        assert_eq!(
            outcomes,
            vec![
                LimitOutcome::Suppressed,
                LimitOutcome::Fired,
                LimitOutcome::Suppressed
            ]
        );
    }

    #[test]
    fn test_missing_action_is_ignored_and_logged() {
        let capture = MockCaptureLayer::new();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let throttler = throttler();
        let id = WorkItemId::named("no-action");

        let outcome = tracing::subscriber::with_default(subscriber, || {
            throttler.limit(id, None::<fn()>, Some(Policy::quota(1)))
        });

        assert_eq!(outcome, LimitOutcome::Rejected(Misuse::MissingAction));
        assert!(!throttler.registry().contains(id));

        let warnings = capture.at_level(Level::WARN);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field("reason"), Some("missing_action"));
        assert_eq!(warnings[0].field("work_item"), Some(id.to_string().as_str()));
    }

    #[test]
    fn test_missing_policy_on_first_use_is_ignored_and_logged() {
        let capture = MockCaptureLayer::new();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let throttler = throttler();
        let id = WorkItemId::named("no-policy");
        let ran = Cell::new(false);

        let outcome = tracing::subscriber::with_default(subscriber, || {
            throttler.limit(id, Some(|| ran.set(true)), None)
        });

        assert_eq!(outcome, LimitOutcome::Rejected(Misuse::MissingPolicy));
        assert!(!ran.get());
        assert!(throttler.registry().is_empty());

        let warnings = capture.at_level(Level::WARN);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field("reason"), Some("missing_policy"));
        assert_eq!(throttler.metrics().calls_rejected(), 1);
    }

    #[test]
    fn test_registration_logged_at_debug() {
        let capture = MockCaptureLayer::new();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let throttler = throttler();
        let id = WorkItemId::named("debug-log");

        tracing::subscriber::with_default(subscriber, || {
            throttler.limit(id, Some(|| {}), Some(Policy::quota(2)));
            throttler.limit(id, Some(|| {}), Some(Policy::quota(2)));
        });

        let debug = capture.at_level(Level::DEBUG);
        assert_eq!(debug.len(), 1);
        assert_eq!(debug[0].field("policy"), Some("quota"));
    }

    #[test]
    fn test_metrics_match_outcomes() {
        let throttler = throttler();
        let id = WorkItemId::named("metrics");

        fire_pattern(&throttler, id, &Policy::quota(3), 10);
        throttler.limit(id, None::<fn()>, None);

        let snapshot = throttler.metrics().snapshot();
        assert_eq!(snapshot.calls_fired, 3);
        assert_eq!(snapshot.calls_suppressed, 7);
        assert_eq!(snapshot.calls_rejected, 1);
        assert_eq!(snapshot.work_items_registered, 1);

        let stats = throttler.registry().state(id).unwrap().stats;
        assert_eq!(stats.calls(), 10);
        assert_eq!(stats.fired(), 3);
    }

    #[test]
    fn test_action_may_reenter_same_work_item() {
        let throttler = throttler();
        let id = WorkItemId::named("reentrant");
        let inner = Cell::new(None);

        let outer = throttler.limit(
            id,
            Some(|| inner.set(Some(throttler.limit(id, Some(|| {}), None)))),
            Some(Policy::modulo(2).unwrap()),
        );

        assert_eq!(outer, LimitOutcome::Fired);
        assert_eq!(inner.get(), Some(LimitOutcome::Suppressed));
    }

    #[test]
    fn test_concurrent_quota_is_exact() {
        use std::thread;

        let throttler = Arc::new(throttler());
        let id = WorkItemId::named("contended");
        let mut handles = vec![];

        for _ in 0..10 {
            let throttler = Arc::clone(&throttler);
            handles.push(thread::spawn(move || {
                let mut fired = 0usize;
                for _ in 0..20 {
                    throttler.limit(id, Some(|| fired += 1), Some(Policy::quota(50)));
                }
                fired
            }));
        }

        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 50);
        assert_eq!(throttler.metrics().calls_suppressed(), 150);
    }
}
