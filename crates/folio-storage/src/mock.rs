//! Mock store implementation for testing.
//!
//! Provides [`MockStore`] for unit testing without filesystem or network access.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::RwLock;

use crate::path;
use crate::storage::{
    Document, ErrorStatus, Store, StorageError, StorageErrorKind, validate_document,
};

/// Backend identifier for error messages.
const BACKEND: &str = "Mock";

/// Store operations, for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    /// [`Store::list_documents`]
    ListDocuments,
    /// [`Store::get_document`]
    GetDocument,
    /// [`Store::create_document`]
    CreateDocument,
    /// [`Store::update_document`]
    UpdateDocument,
    /// [`Store::delete_document`]
    DeleteDocument,
    /// [`Store::list_folders`]
    ListFolders,
    /// [`Store::create_folder`]
    CreateFolder,
    /// [`Store::delete_folder`]
    DeleteFolder,
    /// [`Store::documents_in_folder`]
    DocumentsInFolder,
}

/// In-memory store for testing.
///
/// Folders are structural: creating a document or folder creates its
/// ancestors. Use the builder methods to seed data, [`MockStore::fail`] to make
/// an operation return [`StorageErrorKind::Unavailable`], and
/// [`MockStore::calls`] to check how often the store was reached.
///
/// # Example
///
/// ```ignore
/// use folio_storage::{MockStore, Store};
///
/// let store = MockStore::new()
///     .with_document("notes/todo", "buy milk")
///     .with_folder("archive");
///
/// assert_eq!(store.get_document("notes/todo").unwrap().content(), "buy milk");
/// ```
#[derive(Debug, Default)]
pub struct MockStore {
    documents: RwLock<BTreeMap<String, Vec<u8>>>,
    folders: RwLock<BTreeSet<String>>,
    failing: RwLock<HashSet<MockOp>>,
    calls: RwLock<HashMap<MockOp, usize>>,
}

impl MockStore {
    /// Create a new empty mock store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document (and its ancestor folders).
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_document(self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        let doc = Document::new(path, content);
        self.insert_folders(doc.folder());
        self.documents.write().unwrap().insert(doc.path, doc.body);
        self
    }

    /// Add a folder (and its ancestors).
    #[must_use]
    pub fn with_folder(self, path: &str) -> Self {
        self.insert_folders(path);
        self
    }

    /// Make every later call of `op` fail with [`StorageErrorKind::Unavailable`].
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn fail(&self, op: MockOp) {
        self.failing.write().unwrap().insert(op);
    }

    /// Undo [`MockStore::fail`].
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn recover(&self, op: MockOp) {
        self.failing.write().unwrap().remove(&op);
    }

    /// Number of times `op` was called.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn calls(&self, op: MockOp) -> usize {
        self.calls.read().unwrap().get(&op).copied().unwrap_or(0)
    }

    /// Stored bytes for a path, bypassing counters and failures.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn raw(&self, path: &str) -> Option<Vec<u8>> {
        self.documents
            .read()
            .unwrap()
            .get(path::strip_suffix(path))
            .cloned()
    }

    fn enter(&self, op: MockOp) -> Result<(), StorageError> {
        *self.calls.write().unwrap().entry(op).or_default() += 1;
        if self.failing.read().unwrap().contains(&op) {
            return Err(StorageError::new(StorageErrorKind::Unavailable)
                .with_status(ErrorStatus::Temporary)
                .with_backend(BACKEND)
                .with_message(format!("injected failure for {op:?}")));
        }
        Ok(())
    }

    fn insert_folders(&self, folder: &str) {
        let mut folders = self.folders.write().unwrap();
        let mut current = path::normalize_folder(folder);
        while !current.is_empty() {
            folders.insert(current.to_owned());
            current = path::parent_of(current);
        }
    }

    fn write(&self, doc: &Document) {
        self.insert_folders(doc.folder());
        self.documents
            .write()
            .unwrap()
            .insert(doc.path.clone(), doc.body.clone());
    }

    fn read(&self, logical: &str) -> Option<Document> {
        self.documents
            .read()
            .unwrap()
            .get(logical)
            .map(|body| Document::new(logical, body.clone()).with_preview())
    }
}

impl Store for MockStore {
    fn list_documents(&self) -> Result<Vec<Document>, StorageError> {
        self.enter(MockOp::ListDocuments)?;
        Ok(self
            .documents
            .read()
            .unwrap()
            .iter()
            .map(|(p, body)| Document::new(p, body.clone()))
            .collect())
    }

    fn get_document(&self, path: &str) -> Result<Document, StorageError> {
        self.enter(MockOp::GetDocument)?;
        let logical = path::strip_suffix(path.trim_matches('/'));
        self.read(logical)
            .ok_or_else(|| StorageError::not_found(logical).with_backend(BACKEND))
    }

    fn create_document(&self, doc: &Document) -> Result<(), StorageError> {
        self.enter(MockOp::CreateDocument)?;
        validate_document(doc)?;
        self.write(doc);
        Ok(())
    }

    fn update_document(&self, doc: &Document) -> Result<(), StorageError> {
        self.enter(MockOp::UpdateDocument)?;
        validate_document(doc)?;
        if let Some(old) = doc.rename_source() {
            self.documents.write().unwrap().remove(old);
        }
        self.write(doc);
        Ok(())
    }

    fn delete_document(&self, path: &str) -> Result<(), StorageError> {
        self.enter(MockOp::DeleteDocument)?;
        let logical = path::strip_suffix(path.trim_matches('/'));
        match self.documents.write().unwrap().remove(logical) {
            Some(_) => Ok(()),
            None => Err(StorageError::not_found(logical).with_backend(BACKEND)),
        }
    }

    fn list_folders(&self) -> Result<Vec<String>, StorageError> {
        self.enter(MockOp::ListFolders)?;
        Ok(self.folders.read().unwrap().iter().cloned().collect())
    }

    fn create_folder(&self, path: &str) -> Result<(), StorageError> {
        self.enter(MockOp::CreateFolder)?;
        path::validate(path)?;
        self.insert_folders(path);
        Ok(())
    }

    fn delete_folder(&self, path: &str) -> Result<(), StorageError> {
        self.enter(MockOp::DeleteFolder)?;
        let folder = path::normalize_folder(path);
        if !self.folders.read().unwrap().contains(folder) {
            return Err(StorageError::not_found(folder).with_backend(BACKEND));
        }
        let prefix = format!("{folder}/");
        self.documents
            .write()
            .unwrap()
            .retain(|p, _| !p.starts_with(&prefix));
        self.folders
            .write()
            .unwrap()
            .retain(|f| f != folder && !f.starts_with(&prefix));
        Ok(())
    }

    fn documents_in_folder(&self, path: &str) -> Result<Vec<Document>, StorageError> {
        self.enter(MockOp::DocumentsInFolder)?;
        let folder = path::normalize_folder(path);
        let documents = self.documents.read().unwrap();
        Ok(documents
            .iter()
            .filter(|(p, _)| path::parent_of(p) == folder)
            .map(|(p, body)| Document::new(p, body.clone()).with_preview())
            .collect())
    }
}
