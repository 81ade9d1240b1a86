//! In-memory token store.

use crate::traits::TokenStore;
use lru::LruCache;
use palisade_log::trace;
use parking_lot::Mutex;

/// In-process [`TokenStore`].
///
/// Entries live in an unbounded [`LruCache`] used purely as an ordered map:
/// reads go through `peek` and overwrites through `peek_mut`, so the
/// recency order is exactly the insertion order. Bounding is the guard's
/// job, not the store's.
///
/// Every operation takes a single lock, which makes [`take`](TokenStore::take)
/// atomic for concurrent requests sharing the store.
pub struct MemoryTokenStore {
    entries: Mutex<LruCache<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(LruCache::unbounded()),
        }
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for MemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Values are secrets; only the shape is printed.
        f.debug_struct("MemoryTokenStore")
            .field("count", &self.count())
            .finish()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().peek(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.peek_mut(key) {
            *existing = value;
        } else {
            entries.put(key.to_string(), value);
        }
    }

    fn delete(&self, key: &str) -> Option<String> {
        self.entries.lock().pop(key)
    }

    fn count(&self) -> usize {
        self.entries.lock().len()
    }

    fn keys(&self) -> Vec<String> {
        // The cache iterates newest first
        self.entries
            .lock()
            .iter()
            .rev()
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn evict_oldest(&self) -> Option<(String, String)> {
        let evicted = self.entries.lock().pop_lru();
        if let Some((key, _)) = &evicted {
            trace!("Evicted oldest token entry {}", key);
        }
        evicted
    }

    fn take(&self, key: &str) -> Option<String> {
        self.entries.lock().pop(key)
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains(key)
    }

    fn set_if_absent(&self, key: &str, value: String) -> bool {
        let mut entries = self.entries.lock();
        if entries.contains(key) {
            return false;
        }
        entries.put(key.to_string(), value);
        true
    }
}
