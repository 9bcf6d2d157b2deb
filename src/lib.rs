//! # call-throttle
//!
//! Per-call-site throttling of arbitrary units of work.
//!
//! A [`ThrottleRegistry`] maps each work-item identity to a throttling
//! [`Policy`]. Every time code presents that work item, the policy decides
//! whether the accompanying action runs now or is silently skipped. Typical
//! uses are rate-limiting diagnostics in hot paths, sampling expensive
//! instrumentation, or capping how often a warning can ever appear.
//!
//! ## Quick Start
//!
//! ```rust
//! use call_throttle::{Policy, ThrottleRegistry, WorkItemId};
//! use std::time::Duration;
//!
//! let registry = ThrottleRegistry::new();
//! let slow_query = WorkItemId::named("db.slow-query");
//!
//! for _ in 0..100 {
//!     // At most 5 reports per minute, however hot the loop is
//!     registry.throttle(
//!         slow_query,
//!         Policy::count_per_window(5, Duration::from_secs(60)).unwrap(),
//!         || eprintln!("query took too long"),
//!     );
//! }
//!
//! assert_eq!(registry.stats(slow_query).unwrap().fired(), 5);
//! ```
//!
//! Code that cannot be handed a registry can use the process-wide one:
//!
//! ```rust
//! use call_throttle::Policy;
//!
//! call_throttle::global().throttle_here(Policy::quota(1), || {
//!     eprintln!("deprecated option used; this is printed once");
//! });
//! ```
//!
//! ## Policies
//!
//! - **Modulo(N)**: run the 1st, (N+1)th, (2N+1)th ... call
//! - **Count per window(K, D)**: run at most K calls per window of length D;
//!   the window opens on the first call after the previous one expired
//! - **Probabilistic(N)**: run each call with probability 1/N
//! - **Quota(N)**: run the first N calls ever, then never again
//!
//! Policy constructors validate their parameters and return [`PolicyError`]
//! for values that would make a policy meaningless (zero modulus, zero
//! window, ...). `Policy::quota(0)` is allowed and never fires.
//!
//! ## Registration Semantics
//!
//! The first call for a work item adopts the supplied policy. Later calls
//! for the same work item use the stored policy and its counters; the policy
//! they pass is ignored, even if its parameters differ.
//!
//! ## Work-Item Identity
//!
//! [`WorkItemId`] is an opaque 64-bit key. Build one from a name
//! ([`WorkItemId::named`]), any hashable value ([`WorkItemId::of`]), or the
//! calling source location ([`WorkItemId::caller`], used by
//! [`ThrottleRegistry::throttle_here`]).
//!
//! ## Misuse
//!
//! [`ThrottleRegistry::limit`] takes the action and policy as `Option`s. A
//! missing action, or a missing policy for a work item seen for the first
//! time, is logged with `tracing::warn!` and ignored; the call returns
//! [`LimitOutcome::Rejected`] and nothing is registered.
//!
//! ## Thread Safety
//!
//! All state lives in a sharded concurrent map. Decisions for one work item
//! are serialized, so a quota of N fires exactly N times under any amount of
//! contention. The action itself runs after the work item's lock is released
//! and may call back into the registry.
//!
//! ## Observability
//!
//! ```rust
//! use call_throttle::{Policy, ThrottleRegistry, WorkItemId};
//!
//! let registry = ThrottleRegistry::new();
//! for _ in 0..4 {
//!     registry.throttle(WorkItemId::named("x"), Policy::modulo(2).unwrap(), || {});
//! }
//!
//! let snapshot = registry.metrics().snapshot();
//! assert_eq!(snapshot.calls_fired, 2);
//! assert_eq!(snapshot.calls_suppressed, 2);
//! assert_eq!(snapshot.fire_rate(), 0.5);
//! ```

// Domain layer - pure business logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Re-export commonly used types
pub use domain::{
    policy::{
        CountPerWindowPolicy, ModuloPolicy, Policy, PolicyDecision, PolicyError, PolicyKind,
        ProbabilisticPolicy, QuotaPolicy, ThrottlePolicy,
    },
    stats::EntryStats,
    work_item::WorkItemId,
};

pub use application::{
    limiter::{LimitOutcome, Misuse, Throttler},
    metrics::{Metrics, MetricsSnapshot},
    ports::{Clock, RandomSource, Storage},
    registry::{PolicyRegistry, ThrottleState},
};

pub use infrastructure::{
    clock::SystemClock,
    random::{SeededRandom, ThreadRandom},
    storage::ShardedStorage,
    throttle_registry::{global, BuildError, ThrottleRegistry, ThrottleRegistryBuilder},
};
