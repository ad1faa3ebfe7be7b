//! Dual-write composition of a local and a remote store.
//!
//! # Write Ordering
//!
//! | Operation | Order | Remote failure |
//! |-----------|-------|----------------|
//! | create document / folder | local, remote | fails the call, local kept |
//! | update | remote, local | fails the call, local untouched |
//! | rename | remote delete + create, local delete + create | local failures only warn |
//! | delete document / folder | local, remote | fails the call, backends diverge |
//!
//! Nothing is rolled back. [`DualWriteStore::sync_with_report`] brings the
//! backends back into agreement.

use std::collections::{HashMap, HashSet};

use folio_storage::{Document, StorageError, Store};

/// Counts from one [`DualWriteStore::sync_with_report`] run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Remote documents written to local.
    pub pulled: usize,
    /// Local documents written to remote.
    pub pushed: usize,
    /// Documents already identical, or that the remote cannot hold.
    pub skipped: usize,
    /// Remote folders created locally.
    pub folders_pulled: usize,
    /// Local folders created remotely.
    pub folders_pushed: usize,
}

/// [`Store`] keeping a local backend and a remote backend in agreement.
///
/// Reads are served by `local` only. Writes go to both backends, see the
/// module docs for ordering.
pub struct DualWriteStore<L, R> {
    local: L,
    remote: R,
}

impl<L: Store, R: Store> DualWriteStore<L, R> {
    /// Compose a local and a remote store.
    pub fn new(local: L, remote: R) -> Self {
        Self { local, remote }
    }

    /// The store serving reads.
    pub fn local(&self) -> &L {
        &self.local
    }

    /// The mirrored store.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Pull every remote document into local, then push every local
    /// document to remote.
    ///
    /// Documents with identical bytes are left alone. Last writer wins: a
    /// document that differs on both sides takes the remote content. Folders
    /// are reconciled in both directions. Empty local documents are skipped
    /// because the remote rejects empty content.
    ///
    /// # Errors
    ///
    /// Stops at the first failing backend call. Work done before the failure
    /// is kept, so running sync again resumes.
    pub fn sync_with_report(&self) -> Result<SyncReport, StorageError> {
        let mut report = SyncReport::default();

        // Listings must come from the backends, not from a cache in front of them.
        if let Err(e) = self.local.invalidate_cache() {
            tracing::warn!(side = "local", error = %e, "Failed to invalidate cache before sync");
        }
        if let Err(e) = self.remote.invalidate_cache() {
            tracing::warn!(side = "remote", error = %e, "Failed to invalidate cache before sync");
        }

        // Pull
        let local_folders: HashSet<String> = self.local.list_folders()?.into_iter().collect();
        let remote_folders: HashSet<String> = self.remote.list_folders()?.into_iter().collect();
        for folder in remote_folders.difference(&local_folders) {
            self.local.create_folder(folder)?;
            report.folders_pulled += 1;
        }

        let local_docs: HashMap<String, Vec<u8>> = self
            .local
            .list_documents()?
            .into_iter()
            .map(|doc| (doc.path, doc.body))
            .collect();
        let remote_docs: HashMap<String, Vec<u8>> = self
            .remote
            .list_documents()?
            .into_iter()
            .map(|doc| (doc.path, doc.body))
            .collect();

        for (path, body) in &remote_docs {
            if local_docs.get(path) == Some(body) {
                continue;
            }
            tracing::debug!(path = %path, "Pulling document");
            self.local
                .update_document(&Document::new(path, body.clone()))?;
            report.pulled += 1;
        }

        // Push
        let local_docs = self.local.list_documents()?;
        for doc in &local_docs {
            if remote_docs.get(&doc.path) == Some(&doc.body) {
                report.skipped += 1;
                continue;
            }
            if doc.body.is_empty() {
                tracing::warn!(path = %doc.path, "Skipping empty document, remote requires content");
                report.skipped += 1;
                continue;
            }
            tracing::debug!(path = %doc.path, "Pushing document");
            self.remote
                .update_document(&Document::new(&doc.path, doc.body.clone()))?;
            report.pushed += 1;
        }

        let local_folders = self.local.list_folders()?;
        for folder in &local_folders {
            if remote_folders.contains(folder) {
                continue;
            }
            let prefix = format!("{folder}/");
            // Writing anything below a folder creates it on the remote.
            let has_content = local_docs.iter().any(|doc| doc.path.starts_with(&prefix))
                || local_folders.iter().any(|other| other.starts_with(&prefix));
            if has_content {
                continue;
            }
            tracing::debug!(folder = %folder, "Pushing folder");
            self.remote.create_folder(folder)?;
            report.folders_pushed += 1;
        }

        tracing::info!(
            pulled = report.pulled,
            pushed = report.pushed,
            skipped = report.skipped,
            folders_pulled = report.folders_pulled,
            folders_pushed = report.folders_pushed,
            "Sync completed"
        );
        Ok(report)
    }

    fn rename(&self, doc: &Document, old: &str) -> Result<(), StorageError> {
        let moved = Document::new(&doc.path, doc.body.clone());

        match self.remote.delete_document(old) {
            Ok(()) => {}
            Err(e) if e.is_not_found() => tracing::debug!(from = old, "Rename source missing on remote"),
            Err(e) => return Err(e),
        }
        self.remote.create_document(&moved)?;

        if let Err(e) = self.local.delete_document(old) {
            tracing::warn!(from = old, error = %e, "Local rename cleanup failed");
        }
        if let Err(e) = self.local.create_document(&moved) {
            tracing::warn!(path = %moved.path, error = %e, "Local rename write failed");
        }
        Ok(())
    }
}

impl<L: Store, R: Store> Store for DualWriteStore<L, R> {
    fn list_documents(&self) -> Result<Vec<Document>, StorageError> {
        self.local.list_documents()
    }

    fn get_document(&self, path: &str) -> Result<Document, StorageError> {
        self.local.get_document(path)
    }

    fn create_document(&self, doc: &Document) -> Result<(), StorageError> {
        self.local.create_document(doc)?;
        self.remote.create_document(doc)
    }

    fn update_document(&self, doc: &Document) -> Result<(), StorageError> {
        let source = doc.rename_source().unwrap_or(doc.path.as_str());
        match self.local.get_document(source) {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!(path = source, "Document missing locally, creating");
                return self.create_document(&Document::new(&doc.path, doc.body.clone()));
            }
            Err(e) => return Err(e),
        }

        if let Some(old) = doc.rename_source() {
            return self.rename(doc, old);
        }

        self.remote.update_document(doc)?;
        if let Err(e) = self.local.update_document(doc) {
            tracing::warn!(path = %doc.path, error = %e, "Local update failed after remote update");
        }
        Ok(())
    }

    fn delete_document(&self, path: &str) -> Result<(), StorageError> {
        self.local.delete_document(path)?;
        self.remote.delete_document(path)
    }

    fn list_folders(&self) -> Result<Vec<String>, StorageError> {
        self.local.list_folders()
    }

    fn create_folder(&self, path: &str) -> Result<(), StorageError> {
        self.local.create_folder(path)?;
        self.remote.create_folder(path)
    }

    fn delete_folder(&self, path: &str) -> Result<(), StorageError> {
        self.local.delete_folder(path)?;
        self.remote.delete_folder(path)
    }

    fn documents_in_folder(&self, path: &str) -> Result<Vec<Document>, StorageError> {
        self.local.documents_in_folder(path)
    }

    fn invalidate_cache(&self) -> Result<(), StorageError> {
        self.local.invalidate_cache()?;
        self.remote.invalidate_cache()
    }

    fn sync(&self) -> Result<(), StorageError> {
        self.sync_with_report().map(drop)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use folio_cache::MemoryCache;
    use folio_storage::{MockOp, MockStore, StorageErrorKind};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{CachedStore, DocumentCache};

    struct Fixture {
        local: Arc<MockStore>,
        remote: Arc<MockStore>,
        store: DualWriteStore<Arc<MockStore>, Arc<MockStore>>,
    }

    fn fixture(local: MockStore, remote: MockStore) -> Fixture {
        let local = Arc::new(local);
        let remote = Arc::new(remote);
        let store = DualWriteStore::new(Arc::clone(&local), Arc::clone(&remote));
        Fixture {
            local,
            remote,
            store,
        }
    }

    fn empty() -> Fixture {
        fixture(MockStore::new(), MockStore::new())
    }

    #[test]
    fn test_reads_come_from_local_only() {
        let f = fixture(
            MockStore::new().with_document("a", "local"),
            MockStore::new().with_document("a", "remote"),
        );

        assert_eq!(f.store.get_document("a").unwrap().content(), "local");
        f.store.list_documents().unwrap();
        f.store.list_folders().unwrap();
        f.store.documents_in_folder("").unwrap();

        assert_eq!(f.remote.calls(MockOp::GetDocument), 0);
        assert_eq!(f.remote.calls(MockOp::ListDocuments), 0);
        assert_eq!(f.remote.calls(MockOp::ListFolders), 0);
        assert_eq!(f.remote.calls(MockOp::DocumentsInFolder), 0);
    }

    #[test]
    fn test_create_writes_both() {
        let f = empty();

        f.store.create_document(&Document::new("notes/a", "1")).unwrap();

        assert_eq!(f.local.raw("notes/a"), Some(b"1".to_vec()));
        assert_eq!(f.remote.raw("notes/a"), Some(b"1".to_vec()));
    }

    #[test]
    fn test_create_remote_failure_keeps_local() {
        let f = empty();
        f.remote.fail(MockOp::CreateDocument);

        let err = f.store.create_document(&Document::new("a", "1")).unwrap_err();

        assert_eq!(err.kind, StorageErrorKind::Unavailable);
        assert_eq!(f.local.raw("a"), Some(b"1".to_vec()));
        assert_eq!(f.remote.raw("a"), None);
    }

    #[test]
    fn test_create_local_failure_skips_remote() {
        let f = empty();
        f.local.fail(MockOp::CreateDocument);

        assert!(f.store.create_document(&Document::new("a", "1")).is_err());
        assert_eq!(f.remote.calls(MockOp::CreateDocument), 0);
    }

    #[test]
    fn test_update_missing_locally_creates() {
        let f = empty();

        f.store.update_document(&Document::new("a", "1")).unwrap();

        assert_eq!(f.local.calls(MockOp::CreateDocument), 1);
        assert_eq!(f.remote.calls(MockOp::CreateDocument), 1);
        assert_eq!(f.remote.calls(MockOp::UpdateDocument), 0);
    }

    #[test]
    fn test_update_writes_remote_then_local() {
        let f = fixture(
            MockStore::new().with_document("a", "old"),
            MockStore::new().with_document("a", "old"),
        );

        f.store.update_document(&Document::new("a", "new")).unwrap();

        assert_eq!(f.local.raw("a"), Some(b"new".to_vec()));
        assert_eq!(f.remote.raw("a"), Some(b"new".to_vec()));
    }

    #[test]
    fn test_update_remote_failure_leaves_local() {
        let f = fixture(
            MockStore::new().with_document("a", "old"),
            MockStore::new().with_document("a", "old"),
        );
        f.remote.fail(MockOp::UpdateDocument);

        assert!(f.store.update_document(&Document::new("a", "new")).is_err());
        assert_eq!(f.local.raw("a"), Some(b"old".to_vec()));
    }

    #[test]
    fn test_update_tolerates_local_failure() {
        let f = fixture(
            MockStore::new().with_document("a", "old"),
            MockStore::new().with_document("a", "old"),
        );
        f.local.fail(MockOp::UpdateDocument);

        f.store.update_document(&Document::new("a", "new")).unwrap();

        assert_eq!(f.remote.raw("a"), Some(b"new".to_vec()));
    }

    #[test]
    fn test_rename_moves_on_both() {
        let f = fixture(
            MockStore::new().with_document("notes/old", "text"),
            MockStore::new().with_document("notes/old", "text"),
        );
        let doc = f.store.get_document("notes/old").unwrap().renamed("notes/new");

        f.store.update_document(&doc).unwrap();

        assert!(f.store.get_document("notes/old").unwrap_err().is_not_found());
        assert_eq!(f.store.get_document("notes/new").unwrap().content(), "text");
        assert_eq!(f.remote.raw("notes/old"), None);
        assert_eq!(f.remote.raw("notes/new"), Some(b"text".to_vec()));
    }

    #[test]
    fn test_rename_missing_on_remote_still_creates() {
        let f = fixture(MockStore::new().with_document("old", "text"), MockStore::new());
        let doc = Document::new("old", "text").renamed("new");

        f.store.update_document(&doc).unwrap();

        assert_eq!(f.remote.raw("new"), Some(b"text".to_vec()));
        assert_eq!(f.local.raw("old"), None);
    }

    #[test]
    fn test_rename_tolerates_local_failure() {
        let f = fixture(
            MockStore::new().with_document("old", "text"),
            MockStore::new().with_document("old", "text"),
        );
        f.local.fail(MockOp::DeleteDocument);

        let doc = Document::new("old", "text").renamed("new");
        f.store.update_document(&doc).unwrap();

        assert_eq!(f.remote.raw("old"), None);
        assert_eq!(f.local.raw("old"), Some(b"text".to_vec()));
        assert_eq!(f.local.raw("new"), Some(b"text".to_vec()));
    }

    #[test]
    fn test_delete_remote_failure_diverges() {
        let f = fixture(
            MockStore::new().with_document("a", "1"),
            MockStore::new().with_document("a", "1"),
        );
        f.remote.fail(MockOp::DeleteDocument);

        assert!(f.store.delete_document("a").is_err());
        assert_eq!(f.local.raw("a"), None);
        assert_eq!(f.remote.raw("a"), Some(b"1".to_vec()));
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let f = empty();

        assert!(f.store.delete_document("a").unwrap_err().is_not_found());
        assert_eq!(f.remote.calls(MockOp::DeleteDocument), 0);
    }

    #[test]
    fn test_folders_written_to_both() {
        let f = empty();

        f.store.create_folder("notes/deep").unwrap();
        assert_eq!(f.remote.list_folders().unwrap(), vec!["notes", "notes/deep"]);

        f.store.delete_folder("notes").unwrap();
        assert!(f.local.list_folders().unwrap().is_empty());
        assert!(f.remote.list_folders().unwrap().is_empty());
    }

    #[test]
    fn test_sync_pulls_and_pushes() {
        let f = fixture(
            MockStore::new()
                .with_document("local-only", "l")
                .with_document("same", "s")
                .with_document("both", "local"),
            MockStore::new()
                .with_document("remote-only", "r")
                .with_document("same", "s")
                .with_document("both", "remote"),
        );

        let report = f.store.sync_with_report().unwrap();

        assert_eq!(
            report,
            SyncReport {
                pulled: 2,
                pushed: 1,
                skipped: 3,
                folders_pulled: 0,
                folders_pushed: 0,
            }
        );
        for store in [&f.local, &f.remote] {
            assert_eq!(store.raw("local-only"), Some(b"l".to_vec()));
            assert_eq!(store.raw("remote-only"), Some(b"r".to_vec()));
            assert_eq!(store.raw("both"), Some(b"remote".to_vec()));
        }
    }

    #[test]
    fn test_sync_reconciles_empty_folders() {
        let f = fixture(
            MockStore::new().with_folder("drafts").with_document("notes/a", "1"),
            MockStore::new().with_folder("archive/2024"),
        );

        let report = f.store.sync_with_report().unwrap();

        assert_eq!(report.folders_pulled, 2);
        assert_eq!(report.folders_pushed, 1);
        assert_eq!(f.remote.calls(MockOp::CreateFolder), 1);
        assert_eq!(
            f.local.list_folders().unwrap(),
            vec!["archive", "archive/2024", "drafts", "notes"]
        );
        assert_eq!(
            f.remote.list_folders().unwrap(),
            vec!["archive", "archive/2024", "drafts", "notes"]
        );
    }

    #[test]
    fn test_sync_is_idempotent() {
        let f = fixture(
            MockStore::new().with_document("a", "1"),
            MockStore::new().with_document("b", "2"),
        );
        f.store.sync().unwrap();

        let report = f.store.sync_with_report().unwrap();

        assert_eq!(report.pulled, 0);
        assert_eq!(report.pushed, 0);
        assert_eq!(report.skipped, 2);
    }

    #[test]
    fn test_sync_skips_empty_local_document() {
        let f = fixture(MockStore::new().with_document("blank", ""), MockStore::new());

        let report = f.store.sync_with_report().unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(f.remote.raw("blank"), None);
    }

    #[test]
    fn test_sync_stops_at_first_failure() {
        let f = fixture(MockStore::new().with_document("a", "1"), MockStore::new());
        f.remote.fail(MockOp::UpdateDocument);

        let err = f.store.sync().unwrap_err();

        assert_eq!(err.kind, StorageErrorKind::Unavailable);
        f.remote.recover(MockOp::UpdateDocument);
        f.store.sync().unwrap();
        assert_eq!(f.remote.raw("a"), Some(b"1".to_vec()));
    }

    #[test]
    fn test_sync_restores_document_deleted_only_locally() {
        let f = fixture(
            MockStore::new().with_document("a", "1"),
            MockStore::new().with_document("a", "1"),
        );
        f.remote.fail(MockOp::DeleteDocument);
        assert!(f.store.delete_document("a").is_err());
        f.remote.recover(MockOp::DeleteDocument);

        f.store.sync().unwrap();

        assert_eq!(f.local.raw("a"), Some(b"1".to_vec()));
    }

    #[test]
    fn test_sync_pulls_remote_edit_hidden_by_cache() {
        let remote = Arc::new(MockStore::new().with_document("page", "v1"));
        let cache = DocumentCache::new(Arc::new(MemoryCache::new()), None);
        let store = DualWriteStore::new(
            MockStore::new(),
            CachedStore::new(Arc::clone(&remote), cache),
        );
        store.sync().unwrap();
        remote.update_document(&Document::new("page", "v2")).unwrap();

        let report = store.sync_with_report().unwrap();

        assert_eq!(report.pulled, 1);
        assert_eq!(store.get_document("page").unwrap().content(), "v2");
    }
}
