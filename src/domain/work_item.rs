//! Work-item identity.
//!
//! A `WorkItemId` names one throttled unit of work. The engine never looks
//! inside the work itself; two calls share throttling state exactly when they
//! present equal ids.

use ahash::AHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::Location;

/// Opaque identity of a throttled unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkItemId(u64);

impl WorkItemId {
    /// Identity derived from a caller-chosen name.
    ///
    /// ```
    /// use call_throttle::WorkItemId;
    ///
    /// assert_eq!(WorkItemId::named("flush"), WorkItemId::named("flush"));
    /// assert_ne!(WorkItemId::named("flush"), WorkItemId::named("sync"));
    /// ```
    pub fn named(name: &str) -> Self {
        Self::of(&name)
    }

    /// Identity derived from any hashable value.
    ///
    /// Useful for per-entity throttling, e.g. keying on `(endpoint, user_id)`.
    pub fn of<T: Hash + ?Sized>(value: &T) -> Self {
        let mut hasher = AHasher::default();
        value.hash(&mut hasher);
        WorkItemId(hasher.finish())
    }

    /// Identity of the source location that called this function.
    ///
    /// Every call made from the same file, line and column yields the same id,
    /// which makes a call site behave like a single unit of work.
    #[track_caller]
    pub fn caller() -> Self {
        Self::from_location(Location::caller())
    }

    /// Identity of a specific source location.
    pub fn from_location(location: &Location<'_>) -> Self {
        Self::of(&(location.file(), location.line(), location.column()))
    }

    /// Wrap a raw token chosen by the caller.
    pub fn from_raw(raw: u64) -> Self {
        WorkItemId(raw)
    }

    /// Get the raw token.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for WorkItemId {
    fn from(raw: u64) -> Self {
        WorkItemId(raw)
    }
}

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_name_produces_same_id() {
        assert_eq!(WorkItemId::named("job"), WorkItemId::named("job"));
    }

    #[test]
    fn test_different_names_produce_different_ids() {
        assert_ne!(WorkItemId::named("job-a"), WorkItemId::named("job-b"));
    }

    #[test]
    fn test_tuple_keys() {
        let a = WorkItemId::of(&("GET /users", 42u32));
        let b = WorkItemId::of(&("GET /users", 42u32));
        let c = WorkItemId::of(&("GET /users", 43u32));

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_caller_is_stable_per_call_site() {
        let ids: Vec<WorkItemId> = (0..3).map(|_| WorkItemId::caller()).collect();
        assert!(ids.windows(2).all(|pair| pair[0] == pair[1]));

        let elsewhere = WorkItemId::caller();
        assert_ne!(ids[0], elsewhere);
    }

    #[test]
    fn test_caller_propagates_through_track_caller() {
        #[track_caller]
        fn site() -> WorkItemId {
            WorkItemId::caller()
        }

        let first = site();
        let second = site();
        assert_ne!(first, second);
    }

    #[test]
    fn test_raw_round_trip() {
        let id = WorkItemId::from_raw(0xdead_beef);
        assert_eq!(id.as_u64(), 0xdead_beef);
        assert_eq!(WorkItemId::from(7), WorkItemId::from_raw(7));
    }

    #[test]
    fn test_display_format() {
        let display = WorkItemId::from_raw(0xff).to_string();
        assert_eq!(display, "00000000000000ff");
    }
}
