//! In-process cache implementation.
//!
//! [`MemoryCache`] keeps entries in a map guarded by a lock. Expired entries
//! are dropped lazily when they are read or swept by a pattern delete.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use glob::Pattern;

use crate::{Cache, CacheError};

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory [`Cache`] with per-entry expiry.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.read_entries()
            .values()
            .filter(|e| !e.is_expired(now))
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let mut keys: Vec<_> = self
            .read_entries()
            .iter()
            .filter(|(_, e)| !e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    // A poisoned lock only means another thread panicked mid-insert; the map is still usable.
    fn read_entries(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Entry>> {
        self.entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_entries(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Entry>> {
        self.entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entries", &self.len())
            .finish()
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = Instant::now();
        {
            let entries = self.read_entries();
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        self.write_entries().remove(key);
        Ok(None)
    }

    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), CacheError> {
        let entry = Entry {
            value: value.to_vec(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.write_entries().insert(key.to_owned(), entry);
        Ok(())
    }

    fn delete(&self, keys: &[&str]) -> Result<(), CacheError> {
        let mut entries = self.write_entries();
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }

    fn delete_matching(&self, pattern: &str) -> Result<usize, CacheError> {
        let pattern = Pattern::new(pattern)?;
        let now = Instant::now();
        let mut removed = 0;
        self.write_entries().retain(|key, entry| {
            if entry.is_expired(now) {
                return false;
            }
            let matched = pattern.matches(key);
            removed += usize::from(matched);
            !matched
        });
        tracing::debug!(pattern = %pattern, removed, "Deleted matching cache keys");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_set_and_get() {
        let cache = MemoryCache::new();

        cache.set("page:a", b"hello", None).unwrap();

        assert_eq!(cache.get("page:a").unwrap(), Some(b"hello".to_vec()));
        assert_eq!(cache.get("page:b").unwrap(), None);
    }

    #[test]
    fn test_overwrite() {
        let cache = MemoryCache::new();

        cache.set("k", b"first", None).unwrap();
        cache.set("k", b"second", None).unwrap();

        assert_eq!(cache.get("k").unwrap(), Some(b"second".to_vec()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expired_entry_misses() {
        let cache = MemoryCache::new();

        cache.set("k", b"v", Some(Duration::ZERO)).unwrap();

        assert_eq!(cache.get("k").unwrap(), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_delete_ignores_missing_keys() {
        let cache = MemoryCache::new();
        cache.set("a", b"1", None).unwrap();
        cache.set("b", b"2", None).unwrap();

        cache.delete(&["a", "missing"]).unwrap();

        assert_eq!(cache.keys(), vec!["b"]);
    }

    #[test]
    fn test_delete_matching_sweeps_namespace() {
        let cache = MemoryCache::new();
        for key in ["folder_pages:", "folder_pages:a", "folder_pages:a/b", "page:a/x", "pages:all"] {
            cache.set(key, b"", None).unwrap();
        }

        let removed = cache.delete_matching("folder_pages:*").unwrap();

        assert_eq!(removed, 3);
        assert_eq!(cache.keys(), vec!["page:a/x", "pages:all"]);
    }

    #[test]
    fn test_delete_matching_crosses_separators() {
        let cache = MemoryCache::new();
        cache.set("page:a/b/c", b"", None).unwrap();
        cache.set("page:ab", b"", None).unwrap();

        assert_eq!(cache.delete_matching("page:a/*").unwrap(), 1);
        assert_eq!(cache.keys(), vec!["page:ab"]);
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        let cache = MemoryCache::new();

        let err = cache.delete_matching("page:[").unwrap_err();
        assert!(matches!(err, CacheError::Pattern(_)));
    }
}
