//! Read-through, write-through caching decorator.

use folio_storage::{Document, StorageError, Store, path};

use crate::cache::DocumentCache;

/// [`Store`] decorator serving reads from a [`DocumentCache`].
///
/// Reads check the cache first and populate it on a miss. Creates and
/// updates store the written document and drop the derived listings, which
/// cannot be patched in place. Deletes evict the document and the listings.
///
/// Cache failures never reach the caller; with a disabled cache every call
/// goes straight to the inner store.
pub struct CachedStore<S> {
    inner: S,
    cache: DocumentCache,
}

impl<S: Store> CachedStore<S> {
    /// Wrap `inner` with `cache`.
    pub fn new(inner: S, cache: DocumentCache) -> Self {
        Self { inner, cache }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// The cache in front of the wrapped store.
    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    fn remember(&self, doc: &Document) {
        self.cache.put_document(&doc.clone().with_preview());
        if let Some(old) = doc.rename_source() {
            self.cache.evict_document(old);
        }
        self.cache.invalidate_lists();
    }
}

impl<S: Store> Store for CachedStore<S> {
    fn list_documents(&self) -> Result<Vec<Document>, StorageError> {
        if let Some(docs) = self.cache.all_documents() {
            return Ok(docs);
        }
        let docs = self.inner.list_documents()?;
        self.cache.put_all_documents(&docs);
        Ok(docs)
    }

    fn get_document(&self, path: &str) -> Result<Document, StorageError> {
        let logical = path::strip_suffix(path.trim_matches('/'));
        if let Some(doc) = self.cache.document(logical) {
            return Ok(doc);
        }
        let doc = self.inner.get_document(path)?;
        self.cache.put_document(&doc);
        Ok(doc)
    }

    fn create_document(&self, doc: &Document) -> Result<(), StorageError> {
        self.inner.create_document(doc)?;
        self.remember(doc);
        Ok(())
    }

    fn update_document(&self, doc: &Document) -> Result<(), StorageError> {
        self.inner.update_document(doc)?;
        self.remember(doc);
        Ok(())
    }

    fn delete_document(&self, path: &str) -> Result<(), StorageError> {
        self.inner.delete_document(path)?;
        let logical = path::strip_suffix(path.trim_matches('/'));
        self.cache.evict_document(logical);
        self.cache.invalidate_lists();
        Ok(())
    }

    fn list_folders(&self) -> Result<Vec<String>, StorageError> {
        if let Some(folders) = self.cache.all_folders() {
            return Ok(folders);
        }
        let folders = self.inner.list_folders()?;
        self.cache.put_all_folders(&folders);
        Ok(folders)
    }

    fn create_folder(&self, path: &str) -> Result<(), StorageError> {
        self.inner.create_folder(path)?;
        self.cache.invalidate_lists();
        Ok(())
    }

    fn delete_folder(&self, folder: &str) -> Result<(), StorageError> {
        // A partial delete still removed some documents.
        let result = self.inner.delete_folder(folder);
        self.cache.evict_folder(path::normalize_folder(folder));
        self.cache.invalidate_lists();
        result
    }

    fn documents_in_folder(&self, path: &str) -> Result<Vec<Document>, StorageError> {
        let folder = path::normalize_folder(path);
        if let Some(docs) = self.cache.folder_documents(folder) {
            return Ok(docs);
        }
        let docs = self.inner.documents_in_folder(path)?;
        self.cache.put_folder_documents(folder, &docs);
        Ok(docs)
    }

    fn invalidate_cache(&self) -> Result<(), StorageError> {
        self.cache.invalidate_lists();
        self.inner.invalidate_cache()
    }

    fn sync(&self) -> Result<(), StorageError> {
        let result = self.inner.sync();
        self.cache.invalidate_lists();
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use folio_cache::{Cache, MemoryCache};
    use folio_storage::{MockOp, MockStore, StorageErrorKind};
    use pretty_assertions::assert_eq;

    use super::*;

    struct Fixture {
        mock: Arc<MockStore>,
        memory: Arc<MemoryCache>,
        store: CachedStore<Arc<MockStore>>,
    }

    fn fixture(mock: MockStore) -> Fixture {
        let mock = Arc::new(mock);
        let memory = Arc::new(MemoryCache::new());
        let cache = DocumentCache::new(Arc::clone(&memory) as Arc<dyn Cache>, None);
        let store = CachedStore::new(Arc::clone(&mock), cache);
        Fixture { mock, memory, store }
    }

    #[test]
    fn test_get_reads_through_once() {
        let f = fixture(MockStore::new().with_document("notes/todo", "buy milk"));

        let first = f.store.get_document("notes/todo").unwrap();
        let second = f.store.get_document("notes/todo").unwrap();

        assert_eq!(first.content(), "buy milk");
        assert_eq!(second, first);
        assert_eq!(f.mock.calls(MockOp::GetDocument), 1);
        assert_eq!(f.memory.keys(), vec!["page:notes/todo".to_owned()]);
    }

    #[test]
    fn test_get_with_suffix_uses_logical_key() {
        let f = fixture(MockStore::new().with_document("a", "1"));

        f.store.get_document("a").unwrap();
        f.store.get_document("a.txt").unwrap();

        assert_eq!(f.mock.calls(MockOp::GetDocument), 1);
    }

    #[test]
    fn test_get_missing_is_not_cached() {
        let f = fixture(MockStore::new());

        let err = f.store.get_document("missing").unwrap_err();

        assert!(err.is_not_found());
        assert!(f.memory.is_empty());
    }

    #[test]
    fn test_update_refreshes_cached_document() {
        let f = fixture(MockStore::new().with_document("a", "old"));
        f.store.get_document("a").unwrap();

        f.store.update_document(&Document::new("a", "new")).unwrap();

        let doc = f.store.get_document("a").unwrap();
        assert_eq!(doc.content(), "new");
        assert_eq!(doc.preview.as_deref(), Some("new"));
        assert_eq!(f.mock.calls(MockOp::GetDocument), 1);
    }

    #[test]
    fn test_create_invalidates_lists() {
        let f = fixture(MockStore::new().with_document("a", "1"));
        assert_eq!(f.store.list_documents().unwrap().len(), 1);
        assert_eq!(f.store.documents_in_folder("").unwrap().len(), 1);

        f.store.create_document(&Document::new("b", "2")).unwrap();

        assert_eq!(f.store.list_documents().unwrap().len(), 2);
        assert_eq!(f.store.documents_in_folder("").unwrap().len(), 2);
        assert_eq!(f.mock.calls(MockOp::ListDocuments), 2);
        assert_eq!(f.mock.calls(MockOp::DocumentsInFolder), 2);
    }

    #[test]
    fn test_failed_write_keeps_cache() {
        let f = fixture(MockStore::new().with_document("a", "old"));
        f.store.get_document("a").unwrap();
        f.mock.fail(MockOp::UpdateDocument);

        let err = f.store.update_document(&Document::new("a", "new")).unwrap_err();

        assert_eq!(err.kind, StorageErrorKind::Unavailable);
        assert_eq!(f.store.get_document("a").unwrap().content(), "old");
    }

    #[test]
    fn test_rename_evicts_old_key() {
        let f = fixture(MockStore::new().with_document("notes/old", "text"));
        let doc = f.store.get_document("notes/old").unwrap();

        f.store.update_document(&doc.renamed("notes/new")).unwrap();

        assert!(f.store.get_document("notes/old").unwrap_err().is_not_found());
        assert_eq!(f.store.get_document("notes/new").unwrap().content(), "text");
    }

    #[test]
    fn test_delete_evicts_document() {
        let f = fixture(MockStore::new().with_document("a", "1"));
        f.store.get_document("a").unwrap();

        f.store.delete_document("a").unwrap();

        assert!(f.store.get_document("a").unwrap_err().is_not_found());
    }

    #[test]
    fn test_folder_listing_cached_until_folder_created() {
        let f = fixture(MockStore::new().with_folder("notes"));
        assert_eq!(f.store.list_folders().unwrap(), vec!["notes"]);
        assert_eq!(f.store.list_folders().unwrap(), vec!["notes"]);
        assert_eq!(f.mock.calls(MockOp::ListFolders), 1);

        f.store.create_folder("archive").unwrap();

        assert_eq!(f.store.list_folders().unwrap(), vec!["archive", "notes"]);
        assert_eq!(f.mock.calls(MockOp::ListFolders), 2);
    }

    #[test]
    fn test_delete_folder_evicts_nested_documents() {
        let f = fixture(
            MockStore::new()
                .with_document("notes/a", "1")
                .with_document("notes/deep/b", "2")
                .with_document("other", "3"),
        );
        for path in ["notes/a", "notes/deep/b", "other"] {
            f.store.get_document(path).unwrap();
        }

        f.store.delete_folder("notes").unwrap();

        assert!(f.store.get_document("notes/deep/b").unwrap_err().is_not_found());
        assert_eq!(f.memory.keys(), vec!["page:other".to_owned()]);
    }

    #[test]
    fn test_delete_folder_failure_still_invalidates() {
        let f = fixture(MockStore::new().with_document("notes/a", "1"));
        f.store.list_folders().unwrap();
        f.mock.fail(MockOp::DeleteFolder);

        assert!(f.store.delete_folder("notes").is_err());
        assert!(f.memory.is_empty());
    }

    #[test]
    fn test_invalidate_cache_drops_lists() {
        let f = fixture(MockStore::new().with_document("a", "1").with_folder("notes"));
        f.store.list_documents().unwrap();
        f.store.list_folders().unwrap();
        f.store.documents_in_folder("notes").unwrap();

        f.store.invalidate_cache().unwrap();

        assert!(f.memory.is_empty());
    }

    #[test]
    fn test_disabled_cache_passes_through() {
        let mock = Arc::new(MockStore::new().with_document("a", "1"));
        let store = CachedStore::new(Arc::clone(&mock), DocumentCache::disabled());

        store.get_document("a").unwrap();
        store.get_document("a").unwrap();
        store.update_document(&Document::new("a", "2")).unwrap();

        assert_eq!(store.get_document("a").unwrap().content(), "2");
        assert_eq!(mock.calls(MockOp::GetDocument), 3);
        assert!(!store.cache().is_enabled());
    }
}
