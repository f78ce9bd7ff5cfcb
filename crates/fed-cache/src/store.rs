//! Single-use key/value store.
//!
//! Entries are written once and consumed at most once. `take` is the atomic
//! read-and-remove; under concurrent access exactly one caller receives the
//! value and every other caller observes `None`.

use dashmap::DashMap;

/// A concurrent map with take-once semantics.
///
/// Backs both the authorization-code store and the pending-flow correlation
/// store. No expiry is enforced; entries live until consumed or until the
/// process exits.
#[derive(Debug)]
pub struct SingleUseStore<V> {
    entries: DashMap<String, V>,
}

impl<V> SingleUseStore<V> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Stores a value under the given key.
    ///
    /// A duplicate key overwrites the previous entry; callers generate keys
    /// with enough entropy that this never happens in practice.
    pub fn put(&self, key: impl Into<String>, value: V) {
        self.entries.insert(key.into(), value);
    }

    /// Atomically removes and returns the value for the key.
    ///
    /// The removal is the linearization point: once some caller has received
    /// the value, every subsequent or concurrently racing call returns
    /// `None`.
    #[must_use]
    pub fn take(&self, key: &str) -> Option<V> {
        self.entries.remove(key).map(|(_, v)| v)
    }

    /// Returns the number of pending entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the store has no pending entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for SingleUseStore<V> {
    fn default() -> Self {
        Self::new()
    }
}
