//! Key-Value State Store
//!
//! The ledger keeps all records in an ordered byte-keyed store. Handlers
//! run against a [`CacheStore`] overlay so a failed operation leaves the
//! underlying store untouched.

use std::collections::BTreeMap;

use super::hash::{Hash256, StateHasher};

/// Ordered key-value storage capability.
pub trait StateStore {
    /// Read a value.
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Write a value.
    fn set(&mut self, key: &[u8], value: Vec<u8>);

    /// Whether a key is present.
    fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// All entries whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)>;

    /// Apply a batch of writes.
    fn write_batch(&mut self, batch: BTreeMap<Vec<u8>, Vec<u8>>) {
        for (key, value) in batch {
            self.set(&key, value);
        }
    }
}

/// In-memory store backed by a `BTreeMap`.
#[derive(Clone, Debug, Default)]
pub struct MemStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fingerprint of every entry in key order.
    pub fn state_hash(&self) -> Hash256 {
        let mut hasher = StateHasher::for_store_state();
        hasher.update_u64(self.entries.len() as u64);
        for (key, value) in &self.entries {
            hasher.update_len_prefixed(key);
            hasher.update_len_prefixed(value);
        }
        hasher.finalize()
    }
}

impl StateStore for MemStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.entries.insert(key.to_vec(), value);
    }

    fn has(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.entries
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// Write-buffering overlay over a parent store.
///
/// Reads fall through to the parent; writes stay pending until the
/// caller takes them with [`CacheStore::into_writes`]. Dropping the
/// overlay discards them.
pub struct CacheStore<'a> {
    parent: &'a dyn StateStore,
    pending: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl<'a> CacheStore<'a> {
    /// Create an overlay over `parent`.
    pub fn new(parent: &'a dyn StateStore) -> Self {
        Self {
            parent,
            pending: BTreeMap::new(),
        }
    }

    /// Consume the overlay and return its pending writes.
    pub fn into_writes(self) -> BTreeMap<Vec<u8>, Vec<u8>> {
        self.pending
    }
}

impl StateStore for CacheStore<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.pending.get(key) {
            Some(value) => Some(value.clone()),
            None => self.parent.get(key),
        }
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.pending.insert(key.to_vec(), value);
    }

    fn has(&self, key: &[u8]) -> bool {
        self.pending.contains_key(key) || self.parent.has(key)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.parent.scan_prefix(prefix).into_iter().collect();
        for (key, value) in self
            .pending
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
        {
            merged.insert(key.clone(), value.clone());
        }
        merged.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mem_store_prefix_scan() {
        let mut store = MemStore::new();
        store.set(b"a::1", vec![1]);
        store.set(b"a::2", vec![2]);
        store.set(b"b::1", vec![3]);
        store.set(b"a", vec![4]);

        let entries = store.scan_prefix(b"a::");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], (b"a::1".to_vec(), vec![1]));
        assert_eq!(entries[1], (b"a::2".to_vec(), vec![2]));
    }

    #[test]
    fn test_cache_reads_through_and_overrides() {
        let mut parent = MemStore::new();
        parent.set(b"k1", vec![1]);
        parent.set(b"k2", vec![2]);

        let mut cache = CacheStore::new(&parent);
        cache.set(b"k2", vec![20]);
        cache.set(b"k3", vec![30]);

        assert_eq!(cache.get(b"k1"), Some(vec![1]));
        assert_eq!(cache.get(b"k2"), Some(vec![20]));
        assert!(cache.has(b"k3"));
        assert_eq!(cache.scan_prefix(b"k").len(), 3);

        // parent untouched until writes are applied
        assert_eq!(parent.get(b"k2"), Some(vec![2]));
        assert!(!parent.has(b"k3"));
    }

    #[test]
    fn test_cache_commit_and_discard() {
        let mut parent = MemStore::new();
        let before = parent.state_hash();

        {
            let mut cache = CacheStore::new(&parent);
            cache.set(b"dropped", vec![0]);
        }
        assert_eq!(parent.state_hash(), before);

        let mut cache = CacheStore::new(&parent);
        cache.set(b"kept", vec![1]);
        let writes = cache.into_writes();
        parent.write_batch(writes);

        assert_eq!(parent.get(b"kept"), Some(vec![1]));
        assert_ne!(parent.state_hash(), before);
    }

    #[test]
    fn test_state_hash_order_independent_of_insertion() {
        let mut a = MemStore::new();
        a.set(b"x", vec![1]);
        a.set(b"y", vec![2]);

        let mut b = MemStore::new();
        b.set(b"y", vec![2]);
        b.set(b"x", vec![1]);

        assert_eq!(a.state_hash(), b.state_hash());
    }
}
