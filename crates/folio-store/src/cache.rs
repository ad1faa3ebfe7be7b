//! Best-effort document cache.
//!
//! [`DocumentCache`] maps documents, document lists and folder lists onto the
//! key namespace of [`folio_cache::keys`]. Every operation swallows cache
//! failures: a failed read is a miss, a failed write or eviction is logged
//! and forgotten. Callers always fall back to the authoritative store.

use std::sync::Arc;
use std::time::Duration;

use folio_cache::{Cache, CacheExt, NullCache, keys};
use folio_storage::Document;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Typed cache over a shared [`Cache`].
#[derive(Clone)]
pub struct DocumentCache {
    cache: Arc<dyn Cache>,
    ttl: Option<Duration>,
}

impl DocumentCache {
    /// Cache entries in `cache`, expiring after `ttl` (`None` keeps them until evicted).
    #[must_use]
    pub fn new(cache: Arc<dyn Cache>, ttl: Option<Duration>) -> Self {
        Self { cache, ttl }
    }

    /// Disabled cache: every lookup misses and every write is a no-op.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Arc::new(NullCache), None)
    }

    /// False when running without a cache server.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.cache.is_enabled()
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get_json(key) {
            Ok(Some(value)) => {
                tracing::debug!(key, "Cache hit");
                Some(value)
            }
            Ok(None) => {
                tracing::debug!(key, "Cache miss");
                None
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache read failed");
                None
            }
        }
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        if let Err(e) = self.cache.set_json(key, value, self.ttl) {
            tracing::warn!(key, error = %e, "Cache write failed");
        }
    }

    fn evict(&self, keys: &[&str]) {
        if let Err(e) = self.cache.delete(keys) {
            tracing::warn!(?keys, error = %e, "Cache eviction failed");
        }
    }

    fn evict_matching(&self, pattern: &str) {
        if let Err(e) = self.cache.delete_matching(pattern) {
            tracing::warn!(pattern, error = %e, "Cache sweep failed");
        }
    }

    /// Cached document at a logical path.
    pub fn document(&self, path: &str) -> Option<Document> {
        self.read(&keys::page(path))
    }

    /// Cache one document under its own path.
    pub fn put_document(&self, doc: &Document) {
        self.write(&keys::page(&doc.path), doc);
    }

    /// Cached list of every document.
    pub fn all_documents(&self) -> Option<Vec<Document>> {
        self.read(keys::ALL_PAGES)
    }

    /// Cache the list of every document.
    pub fn put_all_documents(&self, docs: &[Document]) {
        self.write(keys::ALL_PAGES, docs);
    }

    /// Cached list of every folder path.
    pub fn all_folders(&self) -> Option<Vec<String>> {
        self.read(keys::ALL_FOLDERS)
    }

    /// Cache the list of every folder path.
    pub fn put_all_folders(&self, folders: &[String]) {
        self.write(keys::ALL_FOLDERS, folders);
    }

    /// Cached documents directly inside `folder`.
    pub fn folder_documents(&self, folder: &str) -> Option<Vec<Document>> {
        self.read(&keys::folder_pages(folder))
    }

    /// Cache the documents directly inside `folder`.
    pub fn put_folder_documents(&self, folder: &str, docs: &[Document]) {
        self.write(&keys::folder_pages(folder), docs);
    }

    /// Drop one document entry.
    pub fn evict_document(&self, path: &str) {
        self.evict(&[&keys::page(path)]);
    }

    /// Drop every derived listing: all documents, all folders and every
    /// documents-in-folder list.
    pub fn invalidate_lists(&self) {
        self.evict(&[keys::ALL_PAGES, keys::ALL_FOLDERS]);
        self.evict_matching(keys::FOLDER_PAGES_PATTERN);
    }

    /// Drop every document entry below `folder`.
    pub fn evict_folder(&self, folder: &str) {
        self.evict_matching(&keys::pages_below(folder));
    }
}

impl std::fmt::Debug for DocumentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentCache")
            .field("enabled", &self.is_enabled())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
