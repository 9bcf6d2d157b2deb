//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.

use std::fmt::Debug;
use std::hash::Hash;
use std::time::Instant;

/// Port for obtaining current time.
///
/// Infrastructure provides concrete implementations (SystemClock, MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> Instant;
}

/// Port for drawing random numbers.
///
/// Infrastructure provides concrete implementations (ThreadRandom,
/// SeededRandom, ScriptedRandom).
pub trait RandomSource: Send + Sync + Debug {
    /// Draw a uniformly distributed integer in `[0, bound)`.
    ///
    /// `bound` is always at least 1.
    fn below(&self, bound: u64) -> u64;
}

/// Port for concurrent key-value storage.
///
/// Implementations must make `with_entry_mut` atomic per key: when several
/// callers race on a missing key, exactly one factory result is stored and
/// every caller's accessor sees that value.
pub trait Storage<K, V>: Send + Sync + Debug
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Send + Sync,
{
    /// Access an entry with mutable access, creating it if necessary.
    ///
    /// # Arguments
    /// * `key` - The key to look up
    /// * `factory` - Function to create a new value if the key doesn't exist
    /// * `accessor` - Function that gets mutable access to the value
    ///
    /// # Returns
    /// The result from the accessor function
    fn with_entry_mut<F, R>(&self, key: K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R;

    /// Access an existing entry with mutable access.
    ///
    /// Returns `None` without inserting anything when the key is absent.
    fn with_existing_mut<F, R>(&self, key: &K, accessor: F) -> Option<R>
    where
        F: FnOnce(&mut V) -> R;

    /// Check whether a key is present.
    fn contains_key(&self, key: &K) -> bool;

    /// Get the number of entries in the storage.
    fn len(&self) -> usize;

    /// Check if the storage is empty.
    fn is_empty(&self) -> bool;
}
