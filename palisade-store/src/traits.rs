//! Token store trait definition.

use std::sync::Arc;

/// Insertion-ordered key-value storage for outstanding token pairs.
///
/// Implementations use interior mutability so one store can be shared by
/// every request of a session. Operations are expected to be fast and
/// in-memory; the guard calls them on the request path.
///
/// # Atomicity
///
/// A token may be validated at most once. That guarantee holds only if
/// [`take`](TokenStore::take) reads and removes an entry as one atomic step.
/// The default implementation composes `get` and `delete` and is therefore
/// only suitable for stores that are never accessed concurrently; shared
/// stores should override it.
pub trait TokenStore: Send + Sync {
    /// Look up the value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`.
    ///
    /// A new key is appended as the newest entry. Overwriting an existing key
    /// keeps its position in the insertion order.
    fn set(&self, key: &str, value: String);

    /// Remove `key`, returning its value if it was present.
    fn delete(&self, key: &str) -> Option<String>;

    /// Number of stored entries.
    fn count(&self) -> usize;

    /// All keys, oldest first.
    fn keys(&self) -> Vec<String>;

    /// Remove and return the oldest entry.
    fn evict_oldest(&self) -> Option<(String, String)>;

    // ========== Convenience Methods ==========

    /// Remove `key` and return its value in one step.
    fn take(&self, key: &str) -> Option<String> {
        let value = self.get(key);
        self.delete(key);
        value
    }

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Store `value` under `key` only if `key` is not present yet.
    ///
    /// Returns `false` and leaves the existing entry untouched otherwise. Like
    /// [`take`](TokenStore::take), the default composes two calls and shared
    /// stores should override it with a single atomic step.
    fn set_if_absent(&self, key: &str, value: String) -> bool {
        if self.contains(key) {
            return false;
        }
        self.set(key, value);
        true
    }

    fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

impl<T: TokenStore + ?Sized> TokenStore for Arc<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: String) {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> Option<String> {
        (**self).delete(key)
    }

    fn count(&self) -> usize {
        (**self).count()
    }

    fn keys(&self) -> Vec<String> {
        (**self).keys()
    }

    fn evict_oldest(&self) -> Option<(String, String)> {
        (**self).evict_oldest()
    }

    fn take(&self, key: &str) -> Option<String> {
        (**self).take(key)
    }

    fn contains(&self, key: &str) -> bool {
        (**self).contains(key)
    }

    fn set_if_absent(&self, key: &str, value: String) -> bool {
        (**self).set_if_absent(key, value)
    }
}
