//! Throttling policies.
//!
//! This module defines the core trait for throttling policies and the four
//! built-in strategies. Every policy owns its counters; they are mutated only
//! while the policy is being consulted for a decision.

use std::fmt;
use std::time::{Duration, Instant};

/// Decision made by a throttling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    /// Run the work now
    Allow,
    /// Skip the work
    Suppress,
}

impl PolicyDecision {
    /// Check if this decision is Allow.
    pub fn is_allow(&self) -> bool {
        matches!(self, PolicyDecision::Allow)
    }

    /// Check if this decision is Suppress.
    pub fn is_suppress(&self) -> bool {
        matches!(self, PolicyDecision::Suppress)
    }
}

/// Error returned when a policy is constructed with unusable parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// Modulo policies need a modulus of at least 1
    #[error("modulus must be greater than 0")]
    ZeroModulus,
    /// Window policies need to allow at least one call per window
    #[error("max_calls must be greater than 0")]
    ZeroMaxCalls,
    /// Window policies need a non-empty window
    #[error("window duration must be greater than 0")]
    ZeroWindow,
    /// Probabilistic policies need at least one side to roll
    #[error("sides must be greater than 0")]
    ZeroSides,
}

/// Trait for implementing throttling policies.
///
/// A policy decides whether one call should run and updates its own counters
/// as a side effect, whatever the outcome.
pub trait ThrottlePolicy: Send + Sync {
    /// Register a call and decide whether to allow or suppress it.
    ///
    /// # Arguments
    /// * `now` - When the call was made
    /// * `roll` - Draws a uniform integer in `[0, n)` for a given `n`
    fn decide(&mut self, now: Instant, roll: &mut dyn FnMut(u64) -> u64) -> PolicyDecision;
}

/// Fires on the first call and on every `modulus`-th call after it.
///
/// # Example
/// ```
/// use call_throttle::{ModuloPolicy, ThrottlePolicy};
/// use std::time::Instant;
///
/// let mut policy = ModuloPolicy::new(3).unwrap();
/// let now = Instant::now();
/// let mut roll = |_: u64| 0u64;
///
/// assert!(policy.decide(now, &mut roll).is_allow()); // 1st
/// assert!(policy.decide(now, &mut roll).is_suppress());
/// assert!(policy.decide(now, &mut roll).is_suppress());
/// assert!(policy.decide(now, &mut roll).is_allow()); // 4th
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuloPolicy {
    modulus: u64,
    counter: u64,
}

impl ModuloPolicy {
    /// Create a new modulo policy.
    ///
    /// # Errors
    /// Returns `PolicyError::ZeroModulus` if `modulus` is 0.
    pub fn new(modulus: u64) -> Result<Self, PolicyError> {
        if modulus == 0 {
            return Err(PolicyError::ZeroModulus);
        }
        Ok(Self {
            modulus,
            counter: 0,
        })
    }

    /// The configured modulus.
    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    /// Position of the last call within the current cycle (1-based, 0 before any call).
    pub fn counter(&self) -> u64 {
        self.counter
    }
}

impl ThrottlePolicy for ModuloPolicy {
    fn decide(&mut self, _now: Instant, _roll: &mut dyn FnMut(u64) -> u64) -> PolicyDecision {
        self.counter += 1;
        if self.counter > self.modulus {
            self.counter -= self.modulus;
        }

        if self.counter == 1 {
            PolicyDecision::Allow
        } else {
            PolicyDecision::Suppress
        }
    }
}

/// Allows the first `max_calls` calls of each window.
///
/// A window opens at the first call made after the previous window has
/// fully elapsed, so windows are anchored to calls rather than to a fixed
/// grid.
///
/// # Example
/// ```
/// use call_throttle::{CountPerWindowPolicy, ThrottlePolicy};
/// use std::time::{Duration, Instant};
///
/// let mut policy = CountPerWindowPolicy::new(2, Duration::from_secs(60)).unwrap();
/// let now = Instant::now();
/// let mut roll = |_: u64| 0u64;
///
/// assert!(policy.decide(now, &mut roll).is_allow());
/// assert!(policy.decide(now, &mut roll).is_allow());
/// assert!(policy.decide(now, &mut roll).is_suppress());
///
/// let later = now + Duration::from_secs(61);
/// assert!(policy.decide(later, &mut roll).is_allow());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountPerWindowPolicy {
    max_calls: u64,
    window: Duration,
    window_start: Option<Instant>,
    count_in_window: u64,
}

impl CountPerWindowPolicy {
    /// Create a new count-per-window policy.
    ///
    /// # Arguments
    /// * `max_calls` - Calls allowed in each window
    /// * `window` - How long a window lasts before the count resets
    ///
    /// # Errors
    /// Returns `PolicyError::ZeroMaxCalls` or `PolicyError::ZeroWindow` for
    /// zero parameters.
    pub fn new(max_calls: u64, window: Duration) -> Result<Self, PolicyError> {
        if max_calls == 0 {
            return Err(PolicyError::ZeroMaxCalls);
        }
        if window.is_zero() {
            return Err(PolicyError::ZeroWindow);
        }
        Ok(Self {
            max_calls,
            window,
            window_start: None,
            count_in_window: 0,
        })
    }

    /// Calls allowed per window.
    pub fn max_calls(&self) -> u64 {
        self.max_calls
    }

    /// Window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Start of the current window, if one has been opened.
    pub fn window_start(&self) -> Option<Instant> {
        self.window_start
    }

    /// Calls allowed so far in the current window.
    pub fn count_in_window(&self) -> u64 {
        self.count_in_window
    }

    fn window_expired(&self, now: Instant) -> bool {
        match self.window_start {
            None => true,
            Some(start) => match start.checked_add(self.window) {
                Some(end) => end < now,
                None => false,
            },
        }
    }
}

impl ThrottlePolicy for CountPerWindowPolicy {
    fn decide(&mut self, now: Instant, _roll: &mut dyn FnMut(u64) -> u64) -> PolicyDecision {
        if self.window_expired(now) {
            self.window_start = Some(now);
            self.count_in_window = 0;
        }

        if self.count_in_window < self.max_calls {
            self.count_in_window += 1;
            PolicyDecision::Allow
        } else {
            PolicyDecision::Suppress
        }
    }
}

/// Allows each call independently with probability `1 / sides`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbabilisticPolicy {
    sides: u64,
}

impl ProbabilisticPolicy {
    /// Create a new probabilistic policy.
    ///
    /// # Errors
    /// Returns `PolicyError::ZeroSides` if `sides` is 0.
    pub fn new(sides: u64) -> Result<Self, PolicyError> {
        if sides == 0 {
            return Err(PolicyError::ZeroSides);
        }
        Ok(Self { sides })
    }

    /// Number of sides rolled per call.
    pub fn sides(&self) -> u64 {
        self.sides
    }
}

impl ThrottlePolicy for ProbabilisticPolicy {
    fn decide(&mut self, _now: Instant, roll: &mut dyn FnMut(u64) -> u64) -> PolicyDecision {
        if roll(self.sides) == self.sides - 1 {
            PolicyDecision::Allow
        } else {
            PolicyDecision::Suppress
        }
    }
}

/// Allows the first `quota` calls ever, then suppresses everything.
///
/// # Example
/// ```
/// use call_throttle::{QuotaPolicy, ThrottlePolicy};
/// use std::time::Instant;
///
/// let mut policy = QuotaPolicy::new(2);
/// let now = Instant::now();
/// let mut roll = |_: u64| 0u64;
///
/// assert!(policy.decide(now, &mut roll).is_allow());
/// assert!(policy.decide(now, &mut roll).is_allow());
/// assert!(policy.decide(now, &mut roll).is_suppress());
/// assert_eq!(policy.remaining(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaPolicy {
    quota: u64,
    consumed: u64,
}

impl QuotaPolicy {
    /// Create a new quota policy. A quota of 0 never fires.
    pub fn new(quota: u64) -> Self {
        Self { quota, consumed: 0 }
    }

    /// Lifetime budget of allowed calls.
    pub fn quota(&self) -> u64 {
        self.quota
    }

    /// Calls allowed so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Calls still allowed.
    pub fn remaining(&self) -> u64 {
        self.quota - self.consumed
    }
}

impl ThrottlePolicy for QuotaPolicy {
    fn decide(&mut self, _now: Instant, _roll: &mut dyn FnMut(u64) -> u64) -> PolicyDecision {
        if self.consumed < self.quota {
            self.consumed += 1;
            PolicyDecision::Allow
        } else {
            PolicyDecision::Suppress
        }
    }
}

/// Tag naming a policy variant, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    /// See [`ModuloPolicy`]
    Modulo,
    /// See [`CountPerWindowPolicy`]
    CountPerWindow,
    /// See [`ProbabilisticPolicy`]
    Probabilistic,
    /// See [`QuotaPolicy`]
    Quota,
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PolicyKind::Modulo => "modulo",
            PolicyKind::CountPerWindow => "count_per_window",
            PolicyKind::Probabilistic => "probabilistic",
            PolicyKind::Quota => "quota",
        };
        f.write_str(name)
    }
}

/// The closed set of throttling policies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Policy {
    /// One out of every N calls, starting with the first
    Modulo(ModuloPolicy),
    /// N calls per window
    CountPerWindow(CountPerWindowPolicy),
    /// Each call with probability 1/N
    Probabilistic(ProbabilisticPolicy),
    /// N calls, ever
    Quota(QuotaPolicy),
}

impl Policy {
    /// Create a modulo policy.
    pub fn modulo(modulus: u64) -> Result<Self, PolicyError> {
        ModuloPolicy::new(modulus).map(Policy::Modulo)
    }

    /// Create a count-per-window policy.
    pub fn count_per_window(max_calls: u64, window: Duration) -> Result<Self, PolicyError> {
        CountPerWindowPolicy::new(max_calls, window).map(Policy::CountPerWindow)
    }

    /// Create a probabilistic policy.
    pub fn probabilistic(sides: u64) -> Result<Self, PolicyError> {
        ProbabilisticPolicy::new(sides).map(Policy::Probabilistic)
    }

    /// Create a quota policy.
    pub fn quota(quota: u64) -> Self {
        Policy::Quota(QuotaPolicy::new(quota))
    }

    /// Which variant this is.
    pub fn kind(&self) -> PolicyKind {
        match self {
            Policy::Modulo(_) => PolicyKind::Modulo,
            Policy::CountPerWindow(_) => PolicyKind::CountPerWindow,
            Policy::Probabilistic(_) => PolicyKind::Probabilistic,
            Policy::Quota(_) => PolicyKind::Quota,
        }
    }
}

impl ThrottlePolicy for Policy {
    fn decide(&mut self, now: Instant, roll: &mut dyn FnMut(u64) -> u64) -> PolicyDecision {
        match self {
            Policy::Modulo(p) => p.decide(now, roll),
            Policy::CountPerWindow(p) => p.decide(now, roll),
            Policy::Probabilistic(p) => p.decide(now, roll),
            Policy::Quota(p) => p.decide(now, roll),
        }
    }
}
