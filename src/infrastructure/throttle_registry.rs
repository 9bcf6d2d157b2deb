//! Public throttling service.
//!
//! Wires the system clock, a random source and sharded storage into a
//! ready-to-use [`ThrottleRegistry`], and owns the process-wide instance.

use crate::application::{
    limiter::{LimitOutcome, Throttler},
    metrics::Metrics,
    ports::{Clock, RandomSource},
    registry::{PolicyRegistry, ThrottleState},
};
use crate::domain::{policy::Policy, stats::EntryStats, work_item::WorkItemId};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::random::{SeededRandom, ThreadRandom};
use crate::infrastructure::storage::ShardedStorage;

use std::sync::{Arc, OnceLock};

type SharedStorage = Arc<ShardedStorage<WorkItemId, ThrottleState>>;

static GLOBAL: OnceLock<ThrottleRegistry> = OnceLock::new();

/// Error returned when building a `ThrottleRegistry` fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// Shard amount must be a power of two greater than 1
    #[error("shard amount must be a power of two greater than 1, got {0}")]
    InvalidShardAmount(usize),
}

/// Builder for constructing a `ThrottleRegistry`.
#[derive(Default)]
pub struct ThrottleRegistryBuilder {
    clock: Option<Arc<dyn Clock>>,
    random: Option<Arc<dyn RandomSource>>,
    shard_amount: Option<usize>,
    capacity: usize,
}

impl ThrottleRegistryBuilder {
    /// Set a custom clock (mainly for testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the random source used by probabilistic policies.
    pub fn with_random_source(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = Some(random);
        self
    }

    /// Use a deterministic random source seeded with `seed`.
    ///
    /// Shorthand for `with_random_source(Arc::new(SeededRandom::new(seed)))`.
    pub fn with_seed(self, seed: u64) -> Self {
        self.with_random_source(Arc::new(SeededRandom::new(seed)))
    }

    /// Set how many independently locked shards the store uses.
    ///
    /// Must be a power of two greater than 1. Defaults to DashMap's choice,
    /// which scales with the number of CPUs.
    pub fn with_shard_amount(mut self, shard_amount: usize) -> Self {
        self.shard_amount = Some(shard_amount);
        self
    }

    /// Pre-allocate room for `capacity` work items.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Build the registry.
    ///
    /// # Errors
    /// Returns `BuildError` if the configuration is invalid.
    pub fn build(self) -> Result<ThrottleRegistry, BuildError> {
        let storage = match self.shard_amount {
            Some(shards) if shards <= 1 || !shards.is_power_of_two() => {
                return Err(BuildError::InvalidShardAmount(shards));
            }
            Some(shards) => ShardedStorage::with_capacity_and_shard_amount(self.capacity, shards),
            None if self.capacity > 0 => {
                ShardedStorage::with_capacity_and_shard_amount(self.capacity, default_shard_amount())
            }
            None => ShardedStorage::new(),
        };

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));
        let random = self.random.unwrap_or_else(|| Arc::new(ThreadRandom::new()));

        let registry = PolicyRegistry::new(Arc::new(storage), clock);
        let throttler = Throttler::new(registry, random, Metrics::new());

        Ok(ThrottleRegistry { throttler })
    }
}

fn default_shard_amount() -> usize {
    let cpus = std::thread::available_parallelism().map_or(1, usize::from);
    (cpus * 4).next_power_of_two().max(2)
}

/// Keyed store of throttling policies with the `limit` operation on top.
///
/// Cloning is cheap and every clone shares the same store, so one registry
/// built at startup can be handed to every component that throttles work.
/// [`ThrottleRegistry::global`] offers a lazily built process-wide instance
/// for code that cannot have one injected.
///
/// # Example
///
/// ```
/// use call_throttle::{Policy, ThrottleRegistry, WorkItemId};
///
/// let registry = ThrottleRegistry::new();
/// let id = WorkItemId::named("cache-miss-report");
/// let mut reports = 0;
///
/// for _ in 0..7 {
///     registry.throttle(id, Policy::modulo(3).unwrap(), || reports += 1);
/// }
///
/// // Calls #1, #4 and #7 ran
/// assert_eq!(reports, 3);
/// ```
#[derive(Clone)]
pub struct ThrottleRegistry {
    throttler: Throttler<SharedStorage>,
}

impl ThrottleRegistry {
    /// Create a registry with default settings.
    pub fn new() -> Self {
        Self::builder()
            .build()
            .unwrap_or_else(|_| unreachable!("default configuration is always valid"))
    }

    /// Start configuring a registry.
    pub fn builder() -> ThrottleRegistryBuilder {
        ThrottleRegistryBuilder::default()
    }

    /// The process-wide registry, built with defaults on first use.
    ///
    /// Every call returns the same instance for the life of the process.
    pub fn global() -> &'static ThrottleRegistry {
        GLOBAL.get_or_init(ThrottleRegistry::new)
    }

    /// Run `action` if the policy governing `work_item` allows it.
    ///
    /// The first call for `work_item` adopts `policy` for the rest of the
    /// process; later calls keep using the stored policy and ignore the one
    /// they pass. A missing `action`, or a missing `policy` for a work item
    /// seen for the first time, is logged at WARN and ignored. The returned
    /// outcome is informational.
    pub fn limit<F>(
        &self,
        work_item: WorkItemId,
        action: Option<F>,
        policy: Option<Policy>,
    ) -> LimitOutcome
    where
        F: FnOnce(),
    {
        self.throttler.limit(work_item, action, policy)
    }

    /// Run `action` under `policy`; the non-optional form of [`limit`](Self::limit).
    pub fn throttle<F>(&self, work_item: WorkItemId, policy: Policy, action: F) -> LimitOutcome
    where
        F: FnOnce(),
    {
        self.throttler.limit(work_item, Some(action), Some(policy))
    }

    /// Throttle keyed by the calling source location.
    ///
    /// ```
    /// use call_throttle::{Policy, ThrottleRegistry};
    ///
    /// let registry = ThrottleRegistry::new();
    /// let mut warnings = 0;
    /// for _ in 0..10 {
    ///     registry.throttle_here(Policy::quota(2), || warnings += 1);
    /// }
    /// assert_eq!(warnings, 2);
    /// ```
    #[track_caller]
    pub fn throttle_here<F>(&self, policy: Policy, action: F) -> LimitOutcome
    where
        F: FnOnce(),
    {
        let work_item = WorkItemId::caller();
        self.throttler.limit(work_item, Some(action), Some(policy))
    }

    /// Snapshot of the policy stored for `work_item`, counters included.
    pub fn policy(&self, work_item: WorkItemId) -> Option<Policy> {
        self.throttler
            .registry()
            .state(work_item)
            .map(|state| state.policy)
    }

    /// Call statistics for `work_item`.
    pub fn stats(&self, work_item: WorkItemId) -> Option<EntryStats> {
        self.throttler
            .registry()
            .state(work_item)
            .map(|state| state.stats)
    }

    /// Check whether `work_item` has a stored policy.
    pub fn is_registered(&self, work_item: WorkItemId) -> bool {
        self.throttler.registry().contains(work_item)
    }

    /// Get the number of registered work items.
    pub fn len(&self) -> usize {
        self.throttler.registry().len()
    }

    /// Check if no work item has been registered.
    pub fn is_empty(&self) -> bool {
        self.throttler.registry().is_empty()
    }

    /// Get the registry's metrics.
    pub fn metrics(&self) -> &Metrics {
        self.throttler.metrics()
    }
}

impl Default for ThrottleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ThrottleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThrottleRegistry")
            .field("work_items", &self.len())
            .field("metrics", &self.metrics().snapshot())
            .finish()
    }
}

/// The process-wide registry; see [`ThrottleRegistry::global`].
pub fn global() -> &'static ThrottleRegistry {
    ThrottleRegistry::global()
}
