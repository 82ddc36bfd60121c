//! Cache Store Module
//!
//! Sharded concurrent key -> entry map with a hard capacity ceiling.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::cache::{CacheEntry, MAX_VALUE_SIZE};
use crate::error::{CacheError, Result};

// == Set Outcome ==
/// What a successful [`CacheStore::set`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// The key was new and has been admitted
    Inserted,
    /// The resident entry was swapped for the new one
    Replaced,
    /// The resident entry expires later than the new one and was kept
    Superseded,
}

// == Cache Store ==
/// Concurrent entry storage.
///
/// Entries live behind `Arc` so readers clone a pointer and never observe a
/// partially written value. Unrelated keys land on different shards.
#[derive(Debug)]
pub struct CacheStore {
    /// Key -> entry storage
    entries: DashMap<String, Arc<CacheEntry>>,
    /// Admitted slots; reserved before insert, released after remove
    resident: AtomicUsize,
    /// Maximum number of entries allowed
    capacity: usize,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            resident: AtomicUsize::new(0),
            capacity,
        }
    }

    // == Get ==
    /// Returns the value for `key` if resident and not yet expired.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let entry = self.entries.get(key).map(|e| Arc::clone(e.value()))?;
        if entry.is_expired() {
            return None;
        }
        Some(entry.value.clone())
    }

    // == Get Stale ==
    /// Returns the resident entry regardless of expiry.
    pub fn get_stale(&self, key: &str) -> Option<Arc<CacheEntry>> {
        self.entries.get(key).map(|e| Arc::clone(e.value()))
    }

    // == Set ==
    /// Inserts or atomically replaces the entry for `entry.key`.
    ///
    /// A new key is refused with [`CacheError::CapacityExceeded`] when the store
    /// is full; nothing resident is evicted to make room. A replacement that
    /// would move `expires_at` backwards is dropped.
    pub fn set(&self, entry: CacheEntry) -> Result<SetOutcome> {
        if entry.value.len() > MAX_VALUE_SIZE {
            return Err(CacheError::InvalidRequest(format!(
                "Value exceeds maximum size of {} bytes",
                MAX_VALUE_SIZE
            )));
        }

        match self.entries.entry(entry.key.as_str().to_owned()) {
            Entry::Occupied(mut occupied) => {
                if entry.expires_at < occupied.get().expires_at {
                    debug!(key = %entry.key, "Dropping write with older expiry");
                    return Ok(SetOutcome::Superseded);
                }
                occupied.insert(Arc::new(entry));
                Ok(SetOutcome::Replaced)
            }
            Entry::Vacant(vacant) => {
                let capacity = self.capacity;
                let reserved = self
                    .resident
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                        (n < capacity).then_some(n + 1)
                    });
                if reserved.is_err() {
                    return Err(CacheError::CapacityExceeded(entry.key.to_string()));
                }
                vacant.insert(Arc::new(entry));
                Ok(SetOutcome::Inserted)
            }
        }
    }

    // == Replace ==
    /// Swaps in `entry` only if its key is still resident.
    ///
    /// Returns `None` when the key is absent (e.g. invalidated while a refresh
    /// was running), so a refresh never re-admits a dropped key.
    pub fn replace(&self, entry: CacheEntry) -> Option<SetOutcome> {
        let mut slot = self.entries.get_mut(entry.key.as_str())?;
        if entry.expires_at < slot.expires_at {
            return Some(SetOutcome::Superseded);
        }
        *slot = Arc::new(entry);
        Some(SetOutcome::Replaced)
    }

    // == Remove ==
    /// Removes an entry by key. Returns whether anything was removed.
    pub fn remove(&self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.resident.fetch_sub(1, Ordering::AcqRel);
            true
        } else {
            false
        }
    }

    // == Clear ==
    /// Removes every entry. Returns the number of entries removed.
    pub fn clear(&self) -> usize {
        let keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.iter().filter(|key| self.remove(key)).count()
    }

    // == Snapshot ==
    /// Copies out the resident entries. No shard lock is held once this returns.
    pub fn snapshot(&self) -> Vec<Arc<CacheEntry>> {
        self.entries.iter().map(|e| Arc::clone(e.value())).collect()
    }

    // == Count ==
    /// Returns the current number of entries in the store.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheKey, ProducerRecipe};
    use std::time::Duration;

    fn entry(key: &str, value: &'static [u8], interval: Duration) -> CacheEntry {
        let key = CacheKey::parse(key).unwrap();
        let recipe = ProducerRecipe::for_key(&key);
        CacheEntry::new(key, Bytes::from_static(value), recipe, interval)
    }

    const LONG: Duration = Duration::from_secs(300);

    #[test]
    fn test_store_new() {
        let store = CacheStore::new(100);
        assert_eq!(store.count(), 0);
        assert!(store.is_empty());
        assert_eq!(store.capacity(), 100);
    }

    #[tokio::test]
    async fn test_store_set_and_get() {
        let store = CacheStore::new(100);

        let outcome = store.set(entry("home_fi_0", b"value1", LONG)).unwrap();
        assert_eq!(outcome, SetOutcome::Inserted);
        assert_eq!(store.get("home_fi_0").unwrap(), Bytes::from_static(b"value1"));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let store = CacheStore::new(100);
        assert!(store.get("nonexistent").is_none());
    }

    #[tokio::test]
    async fn test_store_remove() {
        let store = CacheStore::new(100);

        store.set(entry("key1", b"value1", LONG)).unwrap();
        assert!(store.remove("key1"));
        assert!(store.is_empty());
        assert!(store.get("key1").is_none());
        // Removing again is a no-op
        assert!(!store.remove("key1"));
    }

    #[tokio::test]
    async fn test_store_overwrite() {
        let store = CacheStore::new(100);

        store.set(entry("key1", b"value1", LONG)).unwrap();
        let outcome = store.set(entry("key1", b"value2", LONG)).unwrap();

        assert_eq!(outcome, SetOutcome::Replaced);
        assert_eq!(store.get("key1").unwrap(), Bytes::from_static(b"value2"));
        assert_eq!(store.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_expired_entry_not_served() {
        let store = CacheStore::new(100);
        store.set(entry("key1", b"value1", Duration::from_secs(1))).unwrap();
        assert!(store.get("key1").is_some());

        tokio::time::advance(Duration::from_millis(1100)).await;

        // Not served, but still resident for stale fallback
        assert!(store.get("key1").is_none());
        assert!(store.get_stale("key1").is_some());
        assert_eq!(store.count(), 1);
    }

    #[tokio::test]
    async fn test_store_never_moves_expiry_backwards() {
        let store = CacheStore::new(100);

        store.set(entry("key1", b"long", LONG)).unwrap();
        let outcome = store
            .set(entry("key1", b"short", Duration::from_secs(1)))
            .unwrap();

        assert_eq!(outcome, SetOutcome::Superseded);
        assert_eq!(store.get("key1").unwrap(), Bytes::from_static(b"long"));
    }

    #[tokio::test]
    async fn test_store_capacity_rejects_new_keys() {
        let store = CacheStore::new(1);

        store.set(entry("a", b"A", LONG)).unwrap();
        let result = store.set(entry("b", b"B", LONG));

        assert!(matches!(result, Err(CacheError::CapacityExceeded(_))));
        assert_eq!(store.count(), 1);
        // Resident key untouched, and still replaceable when full
        assert_eq!(store.get("a").unwrap(), Bytes::from_static(b"A"));
        assert_eq!(
            store.set(entry("a", b"A2", LONG)).unwrap(),
            SetOutcome::Replaced
        );
    }

    #[tokio::test]
    async fn test_store_replace_only_resident_keys() {
        let store = CacheStore::new(10);

        assert_eq!(store.replace(entry("a", b"A", LONG)), None);
        assert!(store.is_empty());

        store.set(entry("a", b"A", LONG)).unwrap();
        assert_eq!(
            store.replace(entry("a", b"A2", LONG)),
            Some(SetOutcome::Replaced)
        );
        assert_eq!(store.get("a").unwrap(), Bytes::from_static(b"A2"));
    }

    #[tokio::test]
    async fn test_store_remove_frees_capacity() {
        let store = CacheStore::new(1);

        store.set(entry("a", b"A", LONG)).unwrap();
        store.remove("a");
        assert_eq!(
            store.set(entry("b", b"B", LONG)).unwrap(),
            SetOutcome::Inserted
        );
    }

    #[tokio::test]
    async fn test_store_clear_and_snapshot() {
        let store = CacheStore::new(10);
        store.set(entry("a", b"A", LONG)).unwrap();
        store.set(entry("b", b"B", LONG)).unwrap();

        let mut keys: Vec<String> = store
            .snapshot()
            .iter()
            .map(|e| e.key.to_string())
            .collect();
        keys.sort();
        assert_eq!(keys, vec!["a", "b"]);

        assert_eq!(store.clear(), 2);
        assert!(store.is_empty());
        store.set(entry("c", b"C", LONG)).unwrap();
        assert_eq!(store.count(), 1);
    }

    #[tokio::test]
    async fn test_store_value_too_large() {
        let store = CacheStore::new(10);
        let key = CacheKey::parse("big").unwrap();
        let recipe = ProducerRecipe::for_key(&key);
        let value = Bytes::from(vec![0u8; MAX_VALUE_SIZE + 1]);

        let result = store.set(CacheEntry::new(key, value, recipe, LONG));
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_store_concurrent_inserts_respect_capacity() {
        let store = Arc::new(CacheStore::new(16));
        let mut handles = Vec::new();

        for i in 0..64 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let key = CacheKey::new("home", "fi", None, i);
                let recipe = ProducerRecipe::for_key(&key);
                let _ = store.set(CacheEntry::new(key, Bytes::from_static(b"x"), recipe, LONG));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.count(), 16);
    }
}
